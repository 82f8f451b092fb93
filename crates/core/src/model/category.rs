use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for category identifiers that match no known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(String);

//
// ─── CATEGORY ─────────────────────────────────────────────────────────────────
//

/// Subject area of an assessment.
///
/// `Instrument` is the only category that requires a sub-category (the
/// specific instrument, e.g. "guitar").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Instrument,
    Theory,
    Production,
    Songwriting,
}

impl Category {
    /// Stable lowercase identifier used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Instrument => "instrument",
            Category::Theory => "theory",
            Category::Production => "production",
            Category::Songwriting => "songwriting",
        }
    }

    /// True when selecting this category requires choosing a sub-category.
    #[must_use]
    pub fn requires_sub_category(self) -> bool {
        matches!(self, Category::Instrument)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "instrument" => Ok(Category::Instrument),
            "theory" => Ok(Category::Theory),
            "production" => Ok(Category::Production),
            "songwriting" => Ok(Category::Songwriting),
            _ => Err(ParseCategoryError(value.to_owned())),
        }
    }
}

//
// ─── CATEGORY KEY ─────────────────────────────────────────────────────────────
//

/// The addressable unit for progress: a category plus its optional
/// sub-category.
///
/// Plain categories store the category name as their own sub-category, so a
/// key always resolves to a concrete `(category, sub_category)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    category: Category,
    sub_category: Option<String>,
}

impl CategoryKey {
    #[must_use]
    pub fn new(category: Category, sub_category: Option<String>) -> Self {
        Self {
            category,
            sub_category,
        }
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn sub_category(&self) -> Option<&str> {
        self.sub_category.as_deref()
    }

    /// Sub-category value used for storage. Plain categories reuse the
    /// category name.
    #[must_use]
    pub fn storage_sub_category(&self) -> &str {
        self.sub_category
            .as_deref()
            .unwrap_or_else(|| self.category.as_str())
    }

    /// Instrument value used for threshold lookup; "general" when the key
    /// has no sub-category.
    #[must_use]
    pub fn instrument(&self) -> &str {
        self.sub_category.as_deref().unwrap_or("general")
    }

    /// Key of this ladder's entry in the per-user skill-tier map:
    /// `category` alone, or `category_subCategory` when a sub-category
    /// exists.
    #[must_use]
    pub fn skill_tier_key(&self) -> String {
        match self.sub_category.as_deref() {
            Some(sub) => format!("{}_{sub}", self.category),
            None => self.category.to_string(),
        }
    }
}
