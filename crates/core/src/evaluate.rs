//! Answer-correctness resolution and pass/fail threshold math.
//!
//! Submitted answers originate either from a positional UI selection (a
//! zero-based index such as `"0"`) or from a stored option identifier. The
//! correctness flag may be persisted under two historical field names and as
//! boolean or string. All of that tolerance is isolated here; the session
//! state machine only ever sees `bool`.

use crate::model::{AnswerSheet, Question, QuestionOption};

//
// ─── ANSWER EVALUATOR ─────────────────────────────────────────────────────────
//

/// Decides whether a submitted answer is correct for the question.
///
/// An empty submission (timeout) is always wrong. Malformed data, such as a
/// missing option list, an out-of-range index, or an unknown identifier,
/// evaluates to incorrect rather than erroring.
#[must_use]
pub fn is_correct(question: &Question, submitted: &str) -> bool {
    if submitted.is_empty() {
        return false;
    }

    // Positional selection: a zero-based index into the option list.
    if let Ok(index) = submitted.parse::<usize>()
        && let Some(option) = question.options.get(index)
        && option.is_correct()
    {
        return true;
    }

    // Identifier selection: an option whose id stringifies to the submission.
    question
        .options
        .iter()
        .filter(|opt| opt.id.as_deref() == Some(submitted))
        .any(QuestionOption::is_correct)
}

/// Recomputes the authoritative correct count over a finalized answer sheet.
///
/// Questions without a recorded answer count as wrong. This recomputation,
/// not any incrementally tracked score, is what pass/fail and persistence
/// use.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSheet) -> u32 {
    let count = questions
        .iter()
        .filter(|q| answers.get(q.id()).is_some_and(|a| is_correct(q, a)))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Returns the questions whose recorded answer does not evaluate as correct,
/// in question order. Exposed for post-fail review.
#[must_use]
pub fn wrong_questions<'a>(
    questions: &'a [Question],
    answers: &AnswerSheet,
) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|q| !answers.get(q.id()).is_some_and(|a| is_correct(q, a)))
        .collect()
}

//
// ─── THRESHOLD EVALUATOR ──────────────────────────────────────────────────────
//

/// Minimum correct count required to pass: `ceil(total * pct / 100)`.
#[must_use]
pub fn required_correct(total_questions: u32, pass_percentage: u8) -> u32 {
    let product = u64::from(total_questions) * u64::from(pass_percentage);
    u32::try_from(product.div_ceil(100)).unwrap_or(u32::MAX)
}

/// Pass/fail decision for a finished attempt.
#[must_use]
pub fn decide(correct_count: u32, total_questions: u32, pass_percentage: u8) -> bool {
    correct_count >= required_correct(total_questions, pass_percentage)
}
