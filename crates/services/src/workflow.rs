use std::sync::Arc;

use assess_core::Clock;
use assess_core::model::{
    Category, CategoryKey, DEFAULT_PASS_PERCENTAGE, ProgressRecord, QuestionId, starting_tier,
};
use assess_core::retry::{RetryRecord, can_retry_today, record_retry};
use storage::repository::{
    ProfileRepository, ProgressRepository, QuestionRepository, Storage, StorageError,
    ThresholdRepository,
};

use crate::error::{LoadError, SessionError};
use crate::loader::QuestionSetLoader;
use crate::recorder::ProgressRecorder;
use crate::session::{MissedQuestion, QuizSession, SessionOutcome, Submission};
use crate::view::AssessmentView;

//
// ─── STEP RESULTS ─────────────────────────────────────────────────────────────
//

/// Result of a category or sub-category selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// A quiz is now running.
    Started,
    /// The category needs a sub-category before a quiz can start.
    AwaitingSubCategory,
    /// Retake mode: this ladder was already completed; nothing started.
    AlreadyCompleted,
    /// Too few questions exist for the tier; the flow is back at category
    /// selection.
    InsufficientQuestions { found: usize, required: usize },
}

/// Result of an answer submission or timer tick.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Nothing changed (sealed question, stale submission, countdown still
    /// running).
    Ignored,
    /// The answer or timeout was recorded and the quiz moved on.
    Advanced { correct: bool },
    /// The last question was recorded; the attempt is resolved.
    ///
    /// `persistence_error` carries a failed progress write. The outcome is
    /// valid and displayable regardless; the caller decides how loudly to
    /// surface the storage failure.
    Finished {
        outcome: SessionOutcome,
        persistence_error: Option<StorageError>,
    },
}

/// Result of a retry request from a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// A fresh quiz is running at the same tier.
    Restarted,
    /// Today's retry budget is spent; try again tomorrow.
    DeniedToday,
    /// The question pool shrank below the minimum since the failed attempt;
    /// the flow is back at category selection.
    InsufficientQuestions { found: usize, required: usize },
}

enum Phase {
    SelectingCategory,
    SelectingSubCategory {
        category: Category,
    },
    Running(QuizSession),
    Finished {
        outcome: SessionOutcome,
        missed_questions: Vec<MissedQuestion>,
    },
}

//
// ─── ASSESSMENT FLOW ──────────────────────────────────────────────────────────
//

/// Drives one learner's assessment: selection, the timed quiz loop, scoring,
/// persistence, and retry gating.
///
/// The flow is a single cooperative session instance. One countdown is ever
/// live, owned by the running `QuizSession`; `tick` fires it, answering or
/// navigating away cancels it. Start is guarded against re-entry so a
/// double-invoked selection can never run two question-set loads.
pub struct AssessmentFlow {
    clock: Clock,
    user_id: String,
    questions: Arc<dyn QuestionRepository>,
    thresholds: Arc<dyn ThresholdRepository>,
    progress: Arc<dyn ProgressRepository>,
    profiles: Arc<dyn ProfileRepository>,
    phase: Phase,
    loading: bool,
    allow_retake: bool,
    retry_record: Option<RetryRecord>,
}

impl AssessmentFlow {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, user_id: impl Into<String>) -> Self {
        Self {
            clock,
            user_id: user_id.into(),
            questions: Arc::clone(&storage.questions),
            thresholds: Arc::clone(&storage.thresholds),
            progress: Arc::clone(&storage.progress),
            profiles: Arc::clone(&storage.profiles),
            phase: Phase::SelectingCategory,
            loading: false,
            allow_retake: false,
            retry_record: None,
        }
    }

    /// Retake mode: completed ladders are reported as `AlreadyCompleted`
    /// instead of starting a session.
    #[must_use]
    pub fn with_allow_retake(mut self, allow_retake: bool) -> Self {
        self.allow_retake = allow_retake;
        self
    }

    /// Seeds the device-local retry record, typically loaded from local
    /// storage by the caller.
    #[must_use]
    pub fn with_retry_record(mut self, record: Option<RetryRecord>) -> Self {
        self.retry_record = record;
        self
    }

    /// Current retry record, for the caller to persist device-locally.
    #[must_use]
    pub fn retry_record(&self) -> Option<&RetryRecord> {
        self.retry_record.as_ref()
    }

    /// Mutable access to the flow's clock, for advancing fixed clocks in
    /// deterministic tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Snapshot of the flow for the presentation layer.
    #[must_use]
    pub fn view(&self) -> AssessmentView {
        match &self.phase {
            Phase::SelectingCategory => AssessmentView::AwaitingCategory,
            Phase::SelectingSubCategory { category } => AssessmentView::AwaitingSubCategory {
                category: *category,
            },
            Phase::Running(session) => AssessmentView::Running {
                question_index: session.question_index(),
                total_questions: session.total_questions(),
                seconds_left: session.seconds_left(self.clock.now()),
                score: session.live_score(),
            },
            Phase::Finished {
                outcome,
                missed_questions,
            } => {
                if outcome.passed {
                    AssessmentView::Passed {
                        tier: outcome.tier,
                        score: outcome.correct,
                        total: outcome.total,
                        next_tier: outcome.next_tier,
                    }
                } else {
                    AssessmentView::Failed {
                        tier: outcome.tier,
                        score: outcome.correct,
                        total: outcome.total,
                        missed_questions: missed_questions.clone(),
                        can_retry_today: can_retry_today(
                            self.retry_record.as_ref(),
                            self.clock.today(),
                        ),
                    }
                }
            }
        }
    }

    /// The running session, for drivers that need question content or the
    /// current deadline.
    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        match &self.phase {
            Phase::Running(session) => Some(session),
            _ => None,
        }
    }

    /// Re-arms the current question's countdown; called by drivers after the
    /// settle delay, when the question actually appears.
    pub fn begin_question(&mut self) {
        let now = self.clock.now();
        if let Phase::Running(session) = &mut self.phase {
            session.begin_question(now);
        }
    }

    /// The user's completed ladders, for welcome and retake surfaces.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the repository fails.
    pub async fn completed_ladders(&self) -> Result<Vec<ProgressRecord>, SessionError> {
        let records = self.progress.fetch_progress(&self.user_id).await?;
        Ok(records.into_iter().filter(|r| r.is_completed()).collect())
    }

    /// Selects a category. Plain categories start the quiz directly; the
    /// instrument category transitions to sub-category selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyRunning` when a quiz or load is in
    /// progress, or `SessionError::Storage` when the repository fails (the
    /// flow falls back to category selection).
    pub async fn select_category(
        &mut self,
        category: Category,
    ) -> Result<SelectOutcome, SessionError> {
        self.ensure_idle()?;
        if category.requires_sub_category() {
            self.phase = Phase::SelectingSubCategory { category };
            return Ok(SelectOutcome::AwaitingSubCategory);
        }
        self.start(CategoryKey::new(category, None)).await
    }

    /// Selects the instrument after an instrument-category selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAwaitingSubCategory` outside sub-category
    /// selection, `SessionError::AlreadyRunning` during a load, or
    /// `SessionError::Storage` on repository failure.
    pub async fn select_sub_category(
        &mut self,
        instrument: impl Into<String>,
    ) -> Result<SelectOutcome, SessionError> {
        let Phase::SelectingSubCategory { category } = &self.phase else {
            return Err(SessionError::NotAwaitingSubCategory);
        };
        let category = *category;
        let outcome = self
            .start(CategoryKey::new(category, Some(instrument.into())))
            .await;
        // An insufficient pool sends the learner back to instrument
        // selection, not all the way out.
        if matches!(outcome, Ok(SelectOutcome::InsufficientQuestions { .. })) {
            self.phase = Phase::SelectingSubCategory { category };
        }
        outcome
    }

    /// Submits a manual answer for the given question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` outside the quiz loop.
    pub async fn submit_answer(
        &mut self,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<StepOutcome, SessionError> {
        let now = self.clock.now();
        let Phase::Running(session) = &mut self.phase else {
            return Err(SessionError::NotRunning);
        };
        match session.submit_answer(question_id, answer, now) {
            Submission::Ignored => Ok(StepOutcome::Ignored),
            Submission::Recorded { correct } => {
                if session.is_finished() {
                    self.finish().await
                } else {
                    Ok(StepOutcome::Advanced { correct })
                }
            }
        }
    }

    /// Fires the countdown if it has expired, recording a timeout for the
    /// current question. Safe to call on every driver tick while the quiz
    /// is running.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` outside the quiz loop.
    pub async fn tick(&mut self) -> Result<StepOutcome, SessionError> {
        let now = self.clock.now();
        let Phase::Running(session) = &mut self.phase else {
            return Err(SessionError::NotRunning);
        };
        if !session.expire_if_due(now) {
            return Ok(StepOutcome::Ignored);
        }
        if session.is_finished() {
            self.finish().await
        } else {
            Ok(StepOutcome::Advanced { correct: false })
        }
    }

    /// Retries the failed tier with a freshly loaded question set, gated by
    /// the one-per-day retry budget.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RetryUnavailable` unless the flow is at a
    /// failed result, or `SessionError::Storage` on repository failure.
    pub async fn retry(&mut self) -> Result<RetryDecision, SessionError> {
        let Phase::Finished { outcome, .. } = &self.phase else {
            return Err(SessionError::RetryUnavailable);
        };
        if outcome.passed {
            return Err(SessionError::RetryUnavailable);
        }

        let today = self.clock.today();
        if !can_retry_today(self.retry_record.as_ref(), today) {
            return Ok(RetryDecision::DeniedToday);
        }

        let key = outcome.key.clone();
        let tier = outcome.tier;
        self.retry_record = Some(record_retry(today));
        match self.load_and_run(key, tier).await? {
            SelectOutcome::Started => Ok(RetryDecision::Restarted),
            SelectOutcome::InsufficientQuestions { found, required } => {
                Ok(RetryDecision::InsufficientQuestions { found, required })
            }
            _ => Err(SessionError::NotRunning),
        }
    }

    /// From a passed result, starts the quiz for the next rung of the same
    /// ladder.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NextTierUnavailable` unless the flow is at a
    /// passed result with a rung remaining, or `SessionError::Storage` on
    /// repository failure.
    pub async fn advance_to_next_tier(&mut self) -> Result<SelectOutcome, SessionError> {
        let Phase::Finished { outcome, .. } = &self.phase else {
            return Err(SessionError::NextTierUnavailable);
        };
        if !outcome.passed {
            return Err(SessionError::NextTierUnavailable);
        }
        let Some(next) = outcome.next_tier else {
            return Err(SessionError::NextTierUnavailable);
        };
        let key = outcome.key.clone();
        self.load_and_run(key, next).await
    }

    /// Navigates back one step, discarding any in-progress answers and
    /// score. From the quiz this cancels the pending countdown and returns
    /// to the prior selection state; nothing is persisted.
    pub fn back(&mut self) {
        match &self.phase {
            Phase::Running(session) => {
                self.phase = if session.key().category().requires_sub_category() {
                    Phase::SelectingSubCategory {
                        category: session.key().category(),
                    }
                } else {
                    Phase::SelectingCategory
                };
            }
            Phase::SelectingSubCategory { .. } | Phase::Finished { .. } => {
                self.phase = Phase::SelectingCategory;
            }
            Phase::SelectingCategory => {}
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.loading || matches!(self.phase, Phase::Running(_)) {
            return Err(SessionError::AlreadyRunning);
        }
        Ok(())
    }

    async fn start(&mut self, key: CategoryKey) -> Result<SelectOutcome, SessionError> {
        self.ensure_idle()?;

        let records = match self.progress.fetch_progress(&self.user_id).await {
            Ok(records) => records,
            Err(err) => {
                self.phase = Phase::SelectingCategory;
                return Err(err.into());
            }
        };

        if self.allow_retake
            && records
                .iter()
                .any(|r| r.matches_key(&key) && r.is_completed())
        {
            return Ok(SelectOutcome::AlreadyCompleted);
        }

        let tier = starting_tier(&records, &key);
        self.load_and_run(key, tier).await
    }

    async fn load_and_run(
        &mut self,
        key: CategoryKey,
        tier: assess_core::model::Tier,
    ) -> Result<SelectOutcome, SessionError> {
        if self.loading {
            return Err(SessionError::AlreadyRunning);
        }
        self.loading = true;
        let loaded = QuestionSetLoader::load(self.questions.as_ref(), &key, tier).await;
        self.loading = false;

        match loaded {
            Ok(set) => {
                self.phase = Phase::Running(QuizSession::new(key, tier, set, self.clock.now()));
                Ok(SelectOutcome::Started)
            }
            Err(LoadError::InsufficientQuestions { found, required }) => {
                self.phase = Phase::SelectingCategory;
                Ok(SelectOutcome::InsufficientQuestions { found, required })
            }
            Err(LoadError::Storage(err)) => {
                // A lost repository connection is the one fatal condition:
                // abort the session and return to category selection.
                self.phase = Phase::SelectingCategory;
                Err(err.into())
            }
        }
    }

    async fn finish(&mut self) -> Result<StepOutcome, SessionError> {
        let Phase::Running(session) =
            std::mem::replace(&mut self.phase, Phase::SelectingCategory)
        else {
            return Err(SessionError::NotRunning);
        };

        let key = session.key();
        let threshold = self
            .thresholds
            .fetch_threshold(key.category(), key.storage_sub_category(), key.instrument())
            .await;
        // An unreadable or unconfigured threshold falls back to the default
        // percentage; the finished attempt must still resolve.
        let pass_percentage = match threshold {
            Ok(Some(t)) => t.pass_percentage,
            Ok(None) => DEFAULT_PASS_PERCENTAGE,
            Err(err) => {
                tracing::warn!(error = %err, "threshold lookup failed, using default");
                DEFAULT_PASS_PERCENTAGE
            }
        };

        let outcome = session
            .finalize(pass_percentage)
            .ok_or(SessionError::NotRunning)?;
        let missed_questions = session.missed_questions();
        self.phase = Phase::Finished {
            outcome: outcome.clone(),
            missed_questions,
        };

        let persistence_error = ProgressRecorder::record(
            &self.user_id,
            &outcome,
            self.clock.now(),
            self.progress.as_ref(),
            self.profiles.as_ref(),
        )
        .await
        .err();

        Ok(StepOutcome::Finished {
            outcome,
            persistence_error,
        })
    }
}
