use crate::{Page, PageSource, PageWindow, Paginated, PaginationSettings, QuerySource, SortOrder};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error};

/// Per-request pagination state. Built for one call, then dropped.
#[derive(Debug, Clone)]
pub struct Paginator<'s> {
    settings: &'s PaginationSettings,
    /// Base URL with the page parameter appended, ready for a page number
    base_url: String,
    requested_page: u64,
    deadline: Option<Instant>,
    pub per_page: u64,
    pub current_page: u64,
    pub offset: u64,
    pub total_count: u64,
    pub total_page: u64,
    pub sort: String,
    pub order: SortOrder,
}

/// Positive integer value of a query parameter. Anything else reads as absent.
fn positive(raw: Option<String>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
}

impl<'s> Paginator<'s> {
    /// Resolve request parameters. `default_per_page` of 0 defers to the
    /// configured default.
    pub fn new<Q: QuerySource + ?Sized>(
        settings: &'s PaginationSettings,
        query: &Q,
        base_url: &str,
        default_per_page: u64,
    ) -> Self {
        let per_page = positive(query.query_value(&settings.query_per_page))
            .or(Some(default_per_page).filter(|p| *p > 0))
            .unwrap_or_else(|| settings.per_page.max(1));

        // Sort fields are validated by the caller
        let sort = query
            .query_value(&settings.query_sort)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| settings.default_sort.clone());

        let order = query
            .query_value(&settings.query_order)
            .and_then(|o| SortOrder::parse(&o))
            .unwrap_or(settings.default_order);

        let requested_page = positive(query.query_value(&settings.query_page)).unwrap_or(1);

        Self {
            settings,
            base_url: format_base_url(base_url, &settings.query_page),
            requested_page,
            deadline: None,
            per_page,
            current_page: 0,
            offset: 0,
            total_count: 0,
            total_page: 0,
            sort,
            order,
        }
    }

    /// Also stop the count and fetch queries at `deadline`, typically the
    /// deadline of the request being served.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time left for the next query.
    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(self.settings.query_timeout),
            None => self.settings.query_timeout,
        }
    }

    /// Derive page count, current page and offset from the row count.
    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
        self.total_page = total_pages(total_count, self.per_page);

        self.current_page = if total_count == 0 {
            0
        } else {
            self.requested_page.min(self.total_page)
        };

        self.offset = self.current_page.saturating_sub(1) * self.per_page;
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            sort: self.sort.clone(),
            order: self.order,
            limit: self.per_page,
            offset: self.offset,
        }
    }

    fn page_link(&self, page: u64) -> String {
        format!(
            "{}{}&{}={}&{}={}&{}={}",
            self.base_url,
            page,
            self.settings.query_sort,
            urlencoding::encode(&self.sort),
            self.settings.query_order,
            self.order,
            self.settings.query_per_page,
            self.per_page,
        )
    }

    pub fn next_page_url(&self) -> String {
        if self.current_page < self.total_page {
            self.page_link(self.current_page + 1)
        } else {
            String::new()
        }
    }

    pub fn prev_page_url(&self) -> String {
        if self.current_page > 1 && self.current_page <= self.total_page {
            self.page_link(self.current_page - 1)
        } else {
            String::new()
        }
    }

    pub fn page(&self) -> Page {
        Page {
            current_page: self.current_page,
            per_page: self.per_page,
            total_page: self.total_page,
            total_count: self.total_count,
            next_page_url: self.next_page_url(),
            prev_page_url: self.prev_page_url(),
        }
    }

    /// Count, then fetch the current window. Any failure is logged and
    /// yields an empty result.
    pub async fn run<S: PageSource + ?Sized>(mut self, source: &S) -> Paginated<S::Item> {
        let limit = self.budget();
        let total_count = match timeout(limit, source.count()).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                error!(base_url = %self.base_url, error = %e, "Pagination count query failed");
                return Paginated::empty();
            }
            Err(_) => {
                error!(base_url = %self.base_url, timeout = ?limit, "Pagination count query timed out");
                return Paginated::empty();
            }
        };

        self.set_total_count(total_count);

        let items = if self.total_count == 0 {
            Vec::new()
        } else {
            let window = self.window();
            let limit = self.budget();
            match timeout(limit, source.fetch(&window)).await {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    error!(base_url = %self.base_url, error = %e, "Pagination fetch query failed");
                    return Paginated::empty();
                }
                Err(_) => {
                    error!(base_url = %self.base_url, timeout = ?limit, "Pagination fetch query timed out");
                    return Paginated::empty();
                }
            }
        };

        debug!(
            total_count = self.total_count,
            current_page = self.current_page,
            per_page = self.per_page,
            "Page resolved"
        );

        Paginated {
            page: self.page(),
            items,
        }
    }
}

/// `ceil(total / per_page)`, at least 1 for a non-empty collection.
pub fn total_pages(total_count: u64, per_page: u64) -> u64 {
    if total_count == 0 {
        return 0;
    }
    let per_page = per_page.max(1);
    let pages = total_count / per_page + u64::from(total_count % per_page != 0);
    pages.max(1)
}

/// Append the page parameter with `?` or `&`, depending on whether the URL
/// already carries a query string.
fn format_base_url(base_url: &str, page_param: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}=", base_url, separator, page_param)
}
