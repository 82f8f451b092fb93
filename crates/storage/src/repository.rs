use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use assess_core::model::{Category, PassThreshold, ProgressRecord, Question};

/// Errors surfaced by storage adapters.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Question repository contract.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Fetch questions for a (category, sub-category, tier level) triple.
    ///
    /// Returns an empty list rather than `NotFound` when no rows match.
    /// When `production_only` is set, draft questions are filtered out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn fetch_questions(
        &self,
        category: Category,
        sub_category: &str,
        tier_level: u8,
        production_only: bool,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Pass-threshold lookup contract.
#[async_trait]
pub trait ThresholdRepository: Send + Sync {
    /// Fetch the configured threshold, or `None` when unconfigured (the
    /// caller then applies the default percentage).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn fetch_threshold(
        &self,
        category: Category,
        sub_category: &str,
        instrument: &str,
    ) -> Result<Option<PassThreshold>, StorageError>;
}

/// Progress store contract. Records are upserted keyed by
/// (user, category, sub-category) and never deleted by the engine.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch all progress records for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn fetch_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert or update the record for its (user, category, sub-category)
    /// key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;
}

/// Best-effort projection of reached tiers into the user profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Set the skill-tier map entry `key` to `tier_name` for the user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be updated. Callers
    /// treat this as non-fatal.
    async fn update_skill_tier(
        &self,
        user_id: &str,
        key: &str,
        tier_name: &str,
    ) -> Result<(), StorageError>;

    /// Fetch the user's skill-tier map (key → tier name).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn skill_tiers(&self, user_id: &str) -> Result<HashMap<String, String>, StorageError>;
}

//
// ─── IN-MEMORY REPOSITORY ─────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    thresholds: Arc<Mutex<HashMap<(Category, String, String), PassThreshold>>>,
    progress: Arc<Mutex<HashMap<(String, String, String), ProgressRecord>>>,
    profiles: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a question into the repository.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backing lock is poisoned.
    pub fn add_question(&self, question: Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(question);
        Ok(())
    }

    /// Seeds a configured threshold.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backing lock is poisoned.
    pub fn set_threshold(
        &self,
        category: Category,
        sub_category: &str,
        instrument: &str,
        threshold: PassThreshold,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .thresholds
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (category, sub_category.to_owned(), instrument.to_owned()),
            threshold,
        );
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn fetch_questions(
        &self,
        category: Category,
        sub_category: &str,
        tier_level: u8,
        production_only: bool,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|q| {
                q.category == category
                    && q.sub_category == sub_category
                    && q.tier_level == tier_level
                    && (!production_only || q.is_production)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ThresholdRepository for InMemoryRepository {
    async fn fetch_threshold(
        &self,
        category: Category,
        sub_category: &str,
        instrument: &str,
    ) -> Result<Option<PassThreshold>, StorageError> {
        let guard = self
            .thresholds
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&(category, sub_category.to_owned(), instrument.to_owned()))
            .copied())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn fetch_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (
            record.user_id.clone(),
            record.category.clone(),
            record.sub_category.clone(),
        );
        guard.insert(key, record.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn update_skill_tier(
        &self,
        user_id: &str,
        key: &str,
        tier_name: &str,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .entry(user_id.to_owned())
            .or_default()
            .insert(key.to_owned(), tier_name.to_owned());
        Ok(())
    }

    async fn skill_tiers(&self, user_id: &str) -> Result<HashMap<String, String>, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user_id).cloned().unwrap_or_default())
    }
}

//
// ─── STORAGE AGGREGATE ────────────────────────────────────────────────────────
//

/// Aggregates the engine's repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub thresholds: Arc<dyn ThresholdRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_in_memory(repo)
    }

    /// Wraps an already-seeded in-memory repository.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        Self {
            questions: Arc::new(repo.clone()),
            thresholds: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            profiles: Arc::new(repo),
        }
    }
}
