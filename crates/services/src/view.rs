use rand::rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use assess_core::model::{Category, Question, QuestionOption, Tier};

use crate::session::MissedQuestion;

/// Presentation-facing snapshot of the assessment flow.
///
/// This is the engine's outcome signal; rendering it is entirely the
/// caller's concern. Serializes with a `state` tag so thin clients can
/// switch on it directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum AssessmentView {
    AwaitingCategory,
    AwaitingSubCategory {
        category: Category,
    },
    Running {
        question_index: usize,
        total_questions: usize,
        seconds_left: i64,
        score: u32,
    },
    Passed {
        tier: Tier,
        score: u32,
        total: u32,
        /// `None` means the ladder is complete.
        next_tier: Option<Tier>,
    },
    Failed {
        tier: Tier,
        score: u32,
        total: u32,
        /// Full question content plus the learner's submission, so the
        /// fail review can show each miss against the correct option.
        missed_questions: Vec<MissedQuestion>,
        can_retry_today: bool,
    },
}

/// Options in a randomized display order. The question itself is untouched;
/// correctness resolution works on the original order, so display shuffling
/// never affects scoring of id-encoded submissions.
#[must_use]
pub fn shuffled_options(question: &Question) -> Vec<QuestionOption> {
    let mut options = question.options.clone();
    let mut rng = rng();
    options.as_mut_slice().shuffle(&mut rng);
    options
}
