#![forbid(unsafe_code)]

//! Orchestration for the tier assessment engine: question-set loading, the
//! timed quiz session, scoring, progress recording, and retry gating.

pub mod error;
pub mod loader;
pub mod recorder;
pub mod session;
pub mod view;
pub mod workflow;

pub use assess_core::Clock;

pub use error::{LoadError, SessionError};
pub use loader::{MAX_QUESTIONS, MIN_QUESTIONS, QuestionSet, QuestionSetLoader};
pub use recorder::ProgressRecorder;
pub use session::{
    ADVANCE_SETTLE_MS, MissedQuestion, QUESTION_TIME_LIMIT_SECS, QuizSession, SessionOutcome,
    Submission,
};
pub use view::AssessmentView;
pub use workflow::{AssessmentFlow, RetryDecision, SelectOutcome, StepOutcome};
