use serde::{Deserialize, Serialize};
use std::fmt;

/// One page of a larger ordered collection, as returned to API clients.
///
/// An all-zero page means the collection is empty or the query failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page {
    pub current_page: u64,
    pub per_page: u64,
    pub total_page: u64,
    pub total_count: u64,
    pub next_page_url: String,
    pub prev_page_url: String,
}

/// A page together with the rows fetched for it.
#[derive(Clone, Debug, Serialize)]
pub struct Paginated<T> {
    pub page: Page,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn empty() -> Self {
        Self {
            page: Page::default(),
            items: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive `asc` / `desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice a data source is asked to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageWindow {
    /// Caller-validated column name
    pub sort: String,
    pub order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}
