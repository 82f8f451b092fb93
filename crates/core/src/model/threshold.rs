use serde::{Deserialize, Serialize};

/// Pass percentage applied when no threshold is configured for a
/// (category, sub-category, instrument) combination.
pub const DEFAULT_PASS_PERCENTAGE: u8 = 70;

/// Configured pass threshold for a (category, sub-category, instrument)
/// combination. Read-only to the assessment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThreshold {
    pub pass_percentage: u8,
}

impl PassThreshold {
    #[must_use]
    pub fn new(pass_percentage: u8) -> Self {
        Self { pass_percentage }
    }
}

impl Default for PassThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_PERCENTAGE)
    }
}
