use chrono::{DateTime, Utc};

use assess_core::model::ProgressRecord;
use storage::repository::{ProfileRepository, ProgressRepository, StorageError};

use crate::session::SessionOutcome;

/// Translates a finished session into the two persisted projections: the
/// progress upsert and, on pass, the profile skill-tier entry.
///
/// Both sinks consume the same outcome value and are idempotent, so partial
/// failure of one does not corrupt the other's precondition.
pub struct ProgressRecorder;

impl ProgressRecorder {
    /// The progress row for this outcome: tier attempted, recomputed score,
    /// question count. `highest_tier_reached` is the attempted level on
    /// pass, one below it on fail (floored at 0); `completed_at` is set only
    /// on pass.
    #[must_use]
    pub fn build_record(
        user_id: &str,
        outcome: &SessionOutcome,
        now: DateTime<Utc>,
    ) -> ProgressRecord {
        let mut record = ProgressRecord::new(
            user_id,
            &outcome.key,
            outcome.tier,
            outcome.correct,
            outcome.total,
        );
        if outcome.passed {
            record.highest_tier_reached = outcome.tier.level();
            record.completed_at = Some(now);
        }
        record
    }

    /// The skill-tier map entry a pass projects into the profile, as the
    /// `(key, tier name)` pair the projection expects. `None` on fail.
    #[must_use]
    pub fn skill_tier_update(outcome: &SessionOutcome) -> Option<(String, &'static str)> {
        outcome
            .passed
            .then(|| (outcome.key.skill_tier_key(), outcome.tier.name()))
    }

    /// Persists the outcome.
    ///
    /// The profile projection is best-effort: its failure is logged and
    /// swallowed. The progress upsert failure is returned so the caller can
    /// surface it non-blockingly; the in-memory outcome stays valid and
    /// displayable either way.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the progress upsert fails.
    pub async fn record(
        user_id: &str,
        outcome: &SessionOutcome,
        now: DateTime<Utc>,
        progress: &dyn ProgressRepository,
        profiles: &dyn ProfileRepository,
    ) -> Result<(), StorageError> {
        let record = Self::build_record(user_id, outcome, now);
        progress.upsert_progress(&record).await?;

        if let Some((key, tier_name)) = Self::skill_tier_update(outcome)
            && let Err(err) = profiles.update_skill_tier(user_id, &key, tier_name).await
        {
            tracing::warn!(%key, error = %err, "skill-tier projection failed");
        }

        Ok(())
    }
}
