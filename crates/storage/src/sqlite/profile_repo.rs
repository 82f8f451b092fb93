use std::collections::HashMap;

use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn update_skill_tier(
        &self,
        user_id: &str,
        key: &str,
        tier_name: &str,
    ) -> Result<(), StorageError> {
        // Read-modify-write on the JSON map; last writer wins per key,
        // which is idempotent for the recorder's single update per pass.
        let mut tiers = self.skill_tiers(user_id).await?;
        tiers.insert(key.to_owned(), tier_name.to_owned());
        let json = serde_json::to_string(&tiers).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO profiles (user_id, skill_tiers)
                VALUES (?1, ?2)
                ON CONFLICT (user_id) DO UPDATE SET
                    skill_tiers = excluded.skill_tiers
            ",
        )
        .bind(user_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn skill_tiers(&self, user_id: &str) -> Result<HashMap<String, String>, StorageError> {
        let row = sqlx::query("SELECT skill_tiers FROM profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(HashMap::new());
        };
        let raw: String = row.try_get("skill_tiers").map_err(ser)?;
        serde_json::from_str(&raw).map_err(ser)
    }
}
