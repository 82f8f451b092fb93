//! Shared error types for the services crate.
//!
//! Recoverable conditions such as too few questions, retry denial, or a
//! persistence failure after a finished attempt are modeled as outcome
//! values, not errors. The enums here cover only misuse of the flow and
//! genuine storage failures.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by `QuestionSetLoader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("only {found} questions available, {required} required")]
    InsufficientQuestions { found: usize, required: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the assessment flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a question set load or quiz is already in progress")]
    AlreadyRunning,
    #[error("no quiz is running")]
    NotRunning,
    #[error("no sub-category selection is pending")]
    NotAwaitingSubCategory,
    #[error("retry is only available from a failed result")]
    RetryUnavailable,
    #[error("next tier is only available from a passed result")]
    NextTierUnavailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
