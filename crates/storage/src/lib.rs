#![forbid(unsafe_code)]

//! Storage adapters for the assessment engine: repository traits, an
//! in-memory implementation for tests, and a `SQLite` backend.

pub mod repository;
pub mod sqlite;
