use assess_core::model::{Category, Question, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{category_from_str, options_from_json, options_to_json, ser, u8_from_i64};
use crate::repository::{QuestionRepository, StorageError};

fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let category: String = row.try_get("category").map_err(ser)?;
    let sub_category: String = row.try_get("sub_category").map_err(ser)?;
    let tier_level = u8_from_i64("tier_level", row.try_get::<i64, _>("tier_level").map_err(ser)?)?;
    let question_text: String = row.try_get("question_text").map_err(ser)?;
    let media_url: Option<String> = row.try_get("media_url").map_err(ser)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let is_production: i64 = row.try_get("is_production").map_err(ser)?;

    Ok(Question {
        id: QuestionId::new(id),
        category: category_from_str(&category)?,
        sub_category,
        tier_level,
        question_text,
        media_url,
        options: options_from_json(&options_json)?,
        is_production: is_production != 0,
    })
}

impl SqliteRepository {
    /// Insert or replace a question row. Used by seeding and admin tooling,
    /// not by the engine itself.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    pub async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO assessment_questions (
                    id, category, sub_category, tier_level,
                    question_text, media_url, options, is_production
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (id) DO UPDATE SET
                    category = excluded.category,
                    sub_category = excluded.sub_category,
                    tier_level = excluded.tier_level,
                    question_text = excluded.question_text,
                    media_url = excluded.media_url,
                    options = excluded.options,
                    is_production = excluded.is_production
            ",
        )
        .bind(question.id.as_str())
        .bind(question.category.as_str())
        .bind(&question.sub_category)
        .bind(i64::from(question.tier_level))
        .bind(&question.question_text)
        .bind(&question.media_url)
        .bind(options_to_json(&question.options)?)
        .bind(i64::from(question.is_production))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn fetch_questions(
        &self,
        category: Category,
        sub_category: &str,
        tier_level: u8,
        production_only: bool,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, category, sub_category, tier_level,
                       question_text, media_url, options, is_production
                FROM assessment_questions
                WHERE category = ?1
                  AND sub_category = ?2
                  AND tier_level = ?3
                  AND (?4 = 0 OR is_production = 1)
                ORDER BY id
            ",
        )
        .bind(category.as_str())
        .bind(sub_category)
        .bind(i64::from(tier_level))
        .bind(i64::from(production_only))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
