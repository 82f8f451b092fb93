mod answer;
mod category;
mod progress;
mod question;
mod threshold;
mod tier;

pub use answer::{AnswerSheet, TIMEOUT_ANSWER};
pub use category::{Category, CategoryKey, ParseCategoryError};
pub use progress::ProgressRecord;
pub use question::{CorrectFlag, Question, QuestionId, QuestionOption};
pub use threshold::{DEFAULT_PASS_PERCENTAGE, PassThreshold};
pub use tier::{Tier, starting_tier};
