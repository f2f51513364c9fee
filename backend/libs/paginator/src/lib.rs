//! Offset/limit pagination
//!
//! Reads the page, page size, sort column and sort order from a request's
//! query string, counts the filtered collection, fetches one window of it
//! and returns the rows with navigation metadata.
//!
//! # Example
//!
//! ```no_run
//! use paginator::{paginate, PaginationSettings, PgPageQuery, PgPageSource, QueryParams};
//! use sqlx::PgPool;
//!
//! #[derive(sqlx::FromRow, serde::Serialize)]
//! struct Topic {
//!     id: i64,
//!     title: String,
//! }
//!
//! # async fn example(pool: PgPool) {
//! let settings = PaginationSettings::default();
//! let query = QueryParams::from_query_string("page=2&order=desc");
//! let source = PgPageSource::<Topic>::new(&pool, PgPageQuery::new("topics"));
//!
//! let result = paginate(&settings, &query, &source, "/v1/topics", 0).await;
//! println!("{} of {} pages", result.page.current_page, result.page.total_page);
//! # }
//! ```

mod page;
mod paginator;
mod pg;
mod query;
mod settings;
mod source;

pub use page::{Page, PageWindow, Paginated, SortOrder};
pub use paginator::{total_pages, Paginator};
pub use pg::{quote_ident, PgPageQuery, PgPageSource};
pub use query::{QueryParams, QuerySource};
pub use settings::PaginationSettings;
pub use source::PageSource;

/// Paginate `source` for one request.
///
/// `base_url` is the listing URL without the page parameter; it may already
/// carry a query string. `default_per_page` of 0 uses `settings.per_page`.
/// Failed or timed-out queries produce [`Paginated::empty`].
pub async fn paginate<Q, S>(
    settings: &PaginationSettings,
    query: &Q,
    source: &S,
    base_url: &str,
    default_per_page: u64,
) -> Paginated<S::Item>
where
    Q: QuerySource + ?Sized,
    S: PageSource + ?Sized,
{
    Paginator::new(settings, query, base_url, default_per_page)
        .run(source)
        .await
}
