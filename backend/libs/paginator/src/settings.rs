use crate::SortOrder;
use agora_common::{env_or, env_string_or};
use anyhow::{anyhow, bail, Result};
use std::time::Duration;

/// Pagination defaults and query parameter names.
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    /// Items per page when neither the request nor the caller picks one
    pub per_page: u64,
    pub query_page: String,
    pub query_per_page: String,
    pub query_sort: String,
    pub query_order: String,
    pub default_sort: String,
    pub default_order: SortOrder,
    /// Upper bound for each of the count and fetch queries
    pub query_timeout: Duration,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            per_page: 10,
            query_page: "page".to_string(),
            query_per_page: "per_page".to_string(),
            query_sort: "sort".to_string(),
            query_order: "order".to_string(),
            default_sort: "id".to_string(),
            default_order: SortOrder::Asc,
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl PaginationSettings {
    pub fn from_env() -> Result<Self> {
        let per_page: u64 = env_or("PAGINATION_PER_PAGE", 10)?;
        if per_page == 0 {
            bail!("PAGINATION_PER_PAGE must be positive");
        }

        let order_raw = env_string_or("PAGINATION_DEFAULT_ORDER", "asc");
        let default_order = SortOrder::parse(&order_raw)
            .ok_or_else(|| anyhow!("Invalid PAGINATION_DEFAULT_ORDER: {:?}", order_raw))?;

        Ok(Self {
            per_page,
            query_page: env_string_or("PAGINATION_QUERY_PAGE", "page"),
            query_per_page: env_string_or("PAGINATION_QUERY_PER_PAGE", "per_page"),
            query_sort: env_string_or("PAGINATION_QUERY_SORT", "sort"),
            query_order: env_string_or("PAGINATION_QUERY_ORDER", "order"),
            default_sort: env_string_or("PAGINATION_DEFAULT_SORT", "id"),
            default_order,
            query_timeout: Duration::from_millis(env_or("PAGINATION_QUERY_TIMEOUT_MS", 5000u64)?),
        })
    }
}
