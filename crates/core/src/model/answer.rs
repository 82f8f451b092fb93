use std::collections::BTreeMap;

use crate::model::question::QuestionId;

/// Raw submitted answer for a timed-out question.
pub const TIMEOUT_ANSWER: &str = "";

/// Per-session map from question id to the raw submitted answer string.
///
/// The empty string denotes a timeout. A question is sealed once it has an
/// entry; later submissions for the same question are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: BTreeMap<QuestionId, String>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submitted answer. Returns false (and leaves the sheet
    /// untouched) when the question is already sealed.
    pub fn record(&mut self, question_id: QuestionId, answer: impl Into<String>) -> bool {
        if self.answers.contains_key(&question_id) {
            return false;
        }
        self.answers.insert(question_id, answer.into());
        true
    }

    /// Records a timeout for the question. Same sealing rule as `record`.
    pub fn record_timeout(&mut self, question_id: QuestionId) -> bool {
        self.record(question_id, TIMEOUT_ANSWER)
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    #[must_use]
    pub fn is_sealed(&self, question_id: &QuestionId) -> bool {
        self.answers.contains_key(question_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &str)> {
        self.answers.iter().map(|(id, answer)| (id, answer.as_str()))
    }
}
