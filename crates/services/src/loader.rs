use rand::rng;
use rand::seq::SliceRandom;

use assess_core::model::{CategoryKey, Question, Tier};
use storage::repository::QuestionRepository;

use crate::error::LoadError;

/// Fewer matching questions than this and no session starts.
pub const MIN_QUESTIONS: usize = 5;

/// Questions served per attempt, when enough are available.
pub const MAX_QUESTIONS: usize = 10;

/// The shuffled, size-capped list of questions served for one attempt.
///
/// Created once per attempt and discarded at session end; its size is the
/// session's total-question count for progress display and percentage math.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Builds a set directly from questions, bypassing the loader's shuffle
    /// and size policy. Intended for tests and tooling.
    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

/// Builds a playable `QuestionSet` from the question repository.
pub struct QuestionSetLoader;

impl QuestionSetLoader {
    /// Fetch, validate, shuffle, and cap the questions for
    /// (category, sub-category, tier).
    ///
    /// Only production-flagged questions are considered. The repository's
    /// collection is never mutated; shuffling happens on the fetched copy.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InsufficientQuestions` when fewer than
    /// `MIN_QUESTIONS` match; the caller returns to category selection and
    /// no partial session starts. Returns `LoadError::Storage` on repository
    /// failures.
    pub async fn load(
        repository: &dyn QuestionRepository,
        key: &CategoryKey,
        tier: Tier,
    ) -> Result<QuestionSet, LoadError> {
        let mut rows = repository
            .fetch_questions(
                key.category(),
                key.storage_sub_category(),
                tier.level(),
                true,
            )
            .await?;

        if rows.len() < MIN_QUESTIONS {
            return Err(LoadError::InsufficientQuestions {
                found: rows.len(),
                required: MIN_QUESTIONS,
            });
        }

        let mut rng = rng();
        rows.as_mut_slice().shuffle(&mut rng);
        rows.truncate(MAX_QUESTIONS);

        Ok(QuestionSet { questions: rows })
    }
}
