use serde::{Deserialize, Serialize};

use crate::model::category::CategoryKey;
use crate::model::progress::ProgressRecord;

//
// ─── TIER ─────────────────────────────────────────────────────────────────────
//

/// A proficiency rung on the assessment ladder.
///
/// Tiers form a fixed ordered sequence with numeric levels 1-4. There is no
/// level 0 or level 5; `highest_tier_reached` in persisted progress may be 0
/// for a learner who failed the basic tier, which is why that field is a raw
/// level rather than a `Tier`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Intermediate,
    Advanced,
    Master,
}

impl Tier {
    /// The full ladder, lowest rung first.
    #[must_use]
    pub fn all() -> [Tier; 4] {
        [Tier::Basic, Tier::Intermediate, Tier::Advanced, Tier::Master]
    }

    /// Numeric level in the range 1-4.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Tier::Basic => 1,
            Tier::Intermediate => 2,
            Tier::Advanced => 3,
            Tier::Master => 4,
        }
    }

    /// Stable lowercase name used in storage and the profile projection.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Intermediate => "intermediate",
            Tier::Advanced => "advanced",
            Tier::Master => "master",
        }
    }

    /// Maps a numeric level back to a tier.
    ///
    /// Out-of-range levels fall back to `Basic`; persisted data may be
    /// malformed and an unrecognized level must never abort a session.
    #[must_use]
    pub fn from_level(level: u8) -> Tier {
        match level {
            2 => Tier::Intermediate,
            3 => Tier::Advanced,
            4 => Tier::Master,
            _ => Tier::Basic,
        }
    }

    /// Maps a stored tier name back to a tier, falling back to `Basic` on
    /// anything unrecognized.
    #[must_use]
    pub fn from_name(name: &str) -> Tier {
        match name {
            "intermediate" => Tier::Intermediate,
            "advanced" => Tier::Advanced,
            "master" => Tier::Master,
            _ => Tier::Basic,
        }
    }

    /// The rung one step up, or `None` when the ladder is complete.
    #[must_use]
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Basic => Some(Tier::Intermediate),
            Tier::Intermediate => Some(Tier::Advanced),
            Tier::Advanced => Some(Tier::Master),
            Tier::Master => None,
        }
    }

    /// True when this is the last rung of the ladder.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.next().is_none()
    }
}

//
// ─── STARTING TIER ────────────────────────────────────────────────────────────
//

/// Computes the tier a learner should start at for `key` given their
/// persisted progress.
///
/// A learner with no completed record for the key starts at `Basic`. A record
/// without `completed_at` counts as not yet passed. Otherwise the learner
/// starts one rung past their highest reached tier, capped at `Master` once
/// the ladder is mastered.
#[must_use]
pub fn starting_tier(records: &[ProgressRecord], key: &CategoryKey) -> Tier {
    let Some(record) = records
        .iter()
        .find(|r| r.matches_key(key) && r.completed_at.is_some())
    else {
        return Tier::Basic;
    };

    let highest = record.highest_tier_reached;
    if highest >= Tier::Master.level() {
        return Tier::Master;
    }
    Tier::from_level(highest.saturating_add(1))
}
