use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use assess_core::evaluate;
use assess_core::model::{AnswerSheet, CategoryKey, Question, QuestionId, Tier};

use crate::loader::QuestionSet;

/// Countdown per question, in seconds.
pub const QUESTION_TIME_LIMIT_SECS: i64 = 10;

/// Delay between a manual answer and the advance to the next question, so a
/// visual acknowledgment can render. Carries no semantic ordering
/// obligation; non-interactive drivers may use zero. Timeouts advance
/// immediately, without this delay.
pub const ADVANCE_SETTLE_MS: u64 = 300;

fn question_time_limit() -> Duration {
    Duration::seconds(QUESTION_TIME_LIMIT_SECS)
}

//
// ─── SUBMISSION RESULT ────────────────────────────────────────────────────────
//

/// Result of submitting an answer to the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The answer was recorded and the session advanced.
    Recorded { correct: bool },
    /// The submission targeted a sealed or non-current question, or the
    /// session is finished. Nothing changed.
    Ignored,
}

//
// ─── SESSION OUTCOME ──────────────────────────────────────────────────────────
//

/// Finalized result of one tier attempt.
///
/// `next_tier` is meaningful only when `passed`: `Some` names the rung the
/// learner may advance to, `None` means the ladder is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub key: CategoryKey,
    pub tier: Tier,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    pub next_tier: Option<Tier>,
}

impl SessionOutcome {
    /// True when the attempt passed the last rung of the ladder.
    #[must_use]
    pub fn is_ladder_complete(&self) -> bool {
        self.passed && self.next_tier.is_none()
    }
}

/// A question the learner got wrong, with the answer they gave.
///
/// Carries the full question so a post-fail review can render the text,
/// the options, and the learner's choice against the correct one. An empty
/// `submitted` marks a timeout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissedQuestion {
    pub question: Question,
    pub submitted: String,
}

//
// ─── QUIZ SESSION ─────────────────────────────────────────────────────────────
//

/// In-memory quiz loop for one tier attempt.
///
/// Steps sequentially through a loaded `QuestionSet`, owning the one live
/// countdown: entering a question arms a deadline, and the first of
/// {manual answer, timeout, navigate-away} disarms it. A question is sealed
/// once an answer (or timeout) is recorded; later submissions for it are
/// no-ops. By the time scoring runs, exactly one answer record exists per
/// question, with the empty string marking timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    key: CategoryKey,
    tier: Tier,
    questions: QuestionSet,
    index: usize,
    answers: AnswerSheet,
    live_score: u32,
    deadline: DateTime<Utc>,
    finished: bool,
}

impl QuizSession {
    /// Starts the session at question 0 with a fresh countdown.
    ///
    /// `now` should come from the services layer clock to keep time
    /// deterministic.
    #[must_use]
    pub fn new(key: CategoryKey, tier: Tier, questions: QuestionSet, now: DateTime<Utc>) -> Self {
        Self {
            key,
            tier,
            questions,
            index: 0,
            answers: AnswerSheet::new(),
            live_score: 0,
            deadline: now + question_time_limit(),
            finished: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> &CategoryKey {
        &self.key
    }

    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Zero-based index of the question currently on screen.
    #[must_use]
    pub fn question_index(&self) -> usize {
        self.index
    }

    /// Incrementally tracked score for live display. The recomputed value
    /// from `finalize` is authoritative; this one may only be trusted for
    /// rendering.
    #[must_use]
    pub fn live_score(&self) -> u32 {
        self.live_score
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.index)
    }

    /// Seconds remaining on the current question's countdown, floored at 0.
    #[must_use]
    pub fn seconds_left(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_seconds().max(0)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Re-arms the countdown for the current question.
    ///
    /// Drivers that insert the settle delay between questions call this when
    /// the next question actually appears, so waiting out the delay does not
    /// eat into the learner's ten seconds.
    pub fn begin_question(&mut self, now: DateTime<Utc>) {
        if !self.finished {
            self.deadline = now + question_time_limit();
        }
    }

    /// Records a manual answer for the current question and advances.
    ///
    /// Submissions for a sealed or non-current question, or after the
    /// session finished, are ignored; answer and timeout are mutually
    /// exclusive outcomes and only the first one counts.
    pub fn submit_answer(
        &mut self,
        question_id: &QuestionId,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Submission {
        let Some(question) = self.current_question() else {
            return Submission::Ignored;
        };
        if question.id() != question_id || self.answers.is_sealed(question_id) {
            return Submission::Ignored;
        }

        let correct = evaluate::is_correct(question, answer);
        let question_id = question.id().clone();
        self.answers.record(question_id, answer);
        if correct {
            self.live_score += 1;
        }
        self.advance(now);
        Submission::Recorded { correct }
    }

    /// Fires the timeout when the countdown has expired: records an empty
    /// answer for the current question and advances immediately.
    ///
    /// Returns false when the deadline has not passed or the session is
    /// finished.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.finished || now < self.deadline {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };
        let question_id = question.id().clone();
        self.answers.record_timeout(question_id);
        self.advance(now);
        true
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        self.index += 1;
        if self.index >= self.questions.len() {
            self.finished = true;
        } else {
            self.deadline = now + question_time_limit();
        }
    }

    /// Recomputes the correct count from the recorded answers. Idempotent;
    /// this, not `live_score`, feeds pass/fail and persistence.
    #[must_use]
    pub fn recompute_score(&self) -> u32 {
        evaluate::score(self.questions.questions(), &self.answers)
    }

    /// Ids of the questions whose recorded answer does not evaluate as
    /// correct, in question order.
    #[must_use]
    pub fn wrong_question_ids(&self) -> Vec<QuestionId> {
        evaluate::wrong_questions(self.questions.questions(), &self.answers)
            .into_iter()
            .map(|q| q.id().clone())
            .collect()
    }

    /// The questions whose recorded answer does not evaluate as correct,
    /// each paired with the learner's submission, in question order.
    /// Outlives the session so the fail review can render after the
    /// session itself is discarded.
    #[must_use]
    pub fn missed_questions(&self) -> Vec<MissedQuestion> {
        evaluate::wrong_questions(self.questions.questions(), &self.answers)
            .into_iter()
            .map(|q| MissedQuestion {
                submitted: self.answers.get(q.id()).unwrap_or_default().to_owned(),
                question: q.clone(),
            })
            .collect()
    }

    /// Resolves the finished session into an outcome using the given pass
    /// percentage. Returns `None` while questions remain.
    #[must_use]
    pub fn finalize(&self, pass_percentage: u8) -> Option<SessionOutcome> {
        if !self.finished {
            return None;
        }
        let correct = self.recompute_score();
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let passed = evaluate::decide(correct, total, pass_percentage);
        Some(SessionOutcome {
            key: self.key.clone(),
            tier: self.tier,
            correct,
            total,
            passed,
            next_tier: if passed { self.tier.next() } else { None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{Category, QuestionOption};
    use assess_core::time::fixed_now;

    fn build_question(id: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            category: Category::Theory,
            sub_category: "theory".to_owned(),
            tier_level: 1,
            question_text: format!("Question {id}"),
            media_url: None,
            options: vec![
                QuestionOption::correct("a", "Right"),
                QuestionOption::incorrect("b", "Wrong"),
            ],
            is_production: true,
        }
    }

    fn build_session(question_count: usize) -> QuizSession {
        let questions: Vec<Question> = (0..question_count)
            .map(|i| build_question(&format!("q{i}")))
            .collect();
        QuizSession::new(
            CategoryKey::new(Category::Theory, None),
            Tier::Basic,
            QuestionSet::from_questions(questions),
            fixed_now(),
        )
    }

    #[test]
    fn manual_answer_records_and_advances() {
        let mut session = build_session(2);
        let now = fixed_now();

        let first_id = session.current_question().unwrap().id().clone();
        let result = session.submit_answer(&first_id, "a", now);
        assert_eq!(result, Submission::Recorded { correct: true });
        assert_eq!(session.question_index(), 1);
        assert_eq!(session.live_score(), 1);
        assert!(!session.is_finished());
    }

    #[test]
    fn second_submission_for_the_same_question_is_a_no_op() {
        let mut session = build_session(2);
        let now = fixed_now();

        let first_id = session.current_question().unwrap().id().clone();
        session.submit_answer(&first_id, "b", now);
        // The session has moved on; re-answering q0 must not change anything.
        let result = session.submit_answer(&first_id, "a", now);
        assert_eq!(result, Submission::Ignored);
        assert_eq!(session.live_score(), 0);
        assert_eq!(session.question_index(), 1);
    }

    #[test]
    fn timeout_records_empty_and_advances_without_delay() {
        let mut session = build_session(2);
        let now = fixed_now();

        assert!(!session.expire_if_due(now), "countdown still running");

        let after = now + Duration::seconds(QUESTION_TIME_LIMIT_SECS);
        assert!(session.expire_if_due(after));
        assert_eq!(session.question_index(), 1);
        assert_eq!(session.live_score(), 0);

        // The timed-out question is sealed.
        let first = build_question("q0");
        assert_eq!(session.submit_answer(first.id(), "a", after), Submission::Ignored);
    }

    #[test]
    fn deadline_rearms_per_question() {
        let mut session = build_session(3);
        let now = fixed_now();
        assert_eq!(session.seconds_left(now), QUESTION_TIME_LIMIT_SECS);

        let first_id = session.current_question().unwrap().id().clone();
        let later = now + Duration::seconds(4);
        session.submit_answer(&first_id, "a", later);
        assert_eq!(session.seconds_left(later), QUESTION_TIME_LIMIT_SECS);

        // A driver re-arming after the settle delay extends the window.
        let settled = later + Duration::seconds(2);
        session.begin_question(settled);
        assert_eq!(session.seconds_left(settled), QUESTION_TIME_LIMIT_SECS);
    }

    #[test]
    fn every_question_has_exactly_one_record_at_scoring() {
        let mut session = build_session(3);
        let mut now = fixed_now();

        let id0 = session.current_question().unwrap().id().clone();
        session.submit_answer(&id0, "a", now);

        now += Duration::seconds(QUESTION_TIME_LIMIT_SECS);
        session.expire_if_due(now);

        let id2 = session.current_question().unwrap().id().clone();
        session.submit_answer(&id2, "b", now);

        assert!(session.is_finished());
        assert_eq!(session.recompute_score(), 1);
        assert_eq!(session.live_score(), 1);

        let wrong = session.wrong_question_ids();
        assert_eq!(wrong.len(), 2);
        assert_eq!(wrong[0].as_str(), "q1");
        assert_eq!(wrong[1].as_str(), "q2");
    }

    #[test]
    fn missed_questions_carry_content_and_the_submission() {
        let mut session = build_session(2);
        let mut now = fixed_now();

        let id0 = session.current_question().unwrap().id().clone();
        session.submit_answer(&id0, "b", now);
        now += Duration::seconds(QUESTION_TIME_LIMIT_SECS);
        session.expire_if_due(now);

        let missed = session.missed_questions();
        assert_eq!(missed.len(), 2);
        assert_eq!(missed[0].question.question_text, "Question q0");
        assert_eq!(missed[0].question.options.len(), 2);
        assert_eq!(missed[0].submitted, "b");
        // The timed-out question shows an empty submission.
        assert_eq!(missed[1].submitted, "");
    }

    #[test]
    fn finalize_is_none_while_running_and_stable_when_finished() {
        let mut session = build_session(2);
        let now = fixed_now();
        assert!(session.finalize(70).is_none());

        let id0 = session.current_question().unwrap().id().clone();
        session.submit_answer(&id0, "a", now);
        let id1 = session.current_question().unwrap().id().clone();
        session.submit_answer(&id1, "a", now);

        let first = session.finalize(70).unwrap();
        let second = session.finalize(70).unwrap();
        assert_eq!(first, second);
        assert!(first.passed);
        assert_eq!(first.correct, 2);
        assert_eq!(first.next_tier, Some(Tier::Intermediate));
    }

    #[test]
    fn passing_the_last_rung_completes_the_ladder() {
        let questions: Vec<Question> = (0..5).map(|i| build_question(&format!("q{i}"))).collect();
        let mut session = QuizSession::new(
            CategoryKey::new(Category::Theory, None),
            Tier::Master,
            QuestionSet::from_questions(questions),
            fixed_now(),
        );

        let now = fixed_now();
        for _ in 0..5 {
            let id = session.current_question().unwrap().id().clone();
            session.submit_answer(&id, "a", now);
        }

        let outcome = session.finalize(70).unwrap();
        assert!(outcome.passed);
        assert!(outcome.is_ladder_complete());
        assert_eq!(outcome.next_tier, None);
    }

    #[test]
    fn failed_outcome_has_no_next_tier() {
        let mut session = build_session(5);
        let mut now = fixed_now();
        for _ in 0..5 {
            now += Duration::seconds(QUESTION_TIME_LIMIT_SECS);
            session.expire_if_due(now);
        }

        let outcome = session.finalize(70).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.next_tier, None);
        assert!(!outcome.is_ladder_complete());
    }
}
