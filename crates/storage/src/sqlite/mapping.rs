use assess_core::model::{Category, QuestionOption};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn category_from_str(raw: &str) -> Result<Category, StorageError> {
    raw.parse::<Category>().map_err(ser)
}

/// Options live in a single JSON column; legacy flag spellings are handled
/// by the domain type's deserializer, not here.
pub(crate) fn options_from_json(raw: &str) -> Result<Vec<QuestionOption>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn options_to_json(options: &[QuestionOption]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}
