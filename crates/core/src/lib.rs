#![forbid(unsafe_code)]

//! Domain types and pure logic for the tier assessment engine: the tier
//! ladder, categories, questions with legacy-tolerant options, answer
//! evaluation, threshold math, and retry limiting.

pub mod evaluate;
pub mod model;
pub mod retry;
pub mod time;

pub use time::Clock;
