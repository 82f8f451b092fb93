use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::category::CategoryKey;
use crate::model::tier::Tier;

/// Persisted progress for one (user, category, sub-category) ladder.
///
/// Upserted on every attempt; `completed_at` is set only when the attempt
/// passed. `highest_tier_reached` is a raw level because a failed basic
/// attempt floors it at 0, below any `Tier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub category: String,
    pub sub_category: String,
    pub instrument: String,
    pub current_tier: u8,
    pub highest_tier_reached: u8,
    pub total_score: u32,
    pub questions_answered: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Builds the record for an attempt that has not yet been resolved into
    /// pass or fail. `ProgressRecorder` in the services crate fills in the
    /// outcome-dependent fields.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        key: &CategoryKey,
        tier: Tier,
        total_score: u32,
        questions_answered: u32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category: key.category().to_string(),
            sub_category: key.storage_sub_category().to_owned(),
            instrument: key.instrument().to_owned(),
            current_tier: tier.level(),
            highest_tier_reached: tier.level().saturating_sub(1),
            total_score,
            questions_answered,
            completed_at: None,
        }
    }

    /// True when this record belongs to the given category key.
    #[must_use]
    pub fn matches_key(&self, key: &CategoryKey) -> bool {
        self.category == key.category().as_str()
            && self.sub_category == key.storage_sub_category()
    }

    /// True when the tier recorded here was passed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
