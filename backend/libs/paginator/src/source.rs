use crate::PageWindow;
use async_trait::async_trait;
use std::fmt::Display;

/// A filtered, ordered collection that can be counted and sliced.
///
/// The filter is applied by the source itself; the paginator only decides
/// which window to fetch. Sources that need related rows should load them in
/// [`PageSource::fetch`].
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Error: Display + Send;

    /// Number of rows matching the source's filter.
    async fn count(&self) -> Result<u64, Self::Error>;

    /// Rows of `window`, in the window's order.
    async fn fetch(&self, window: &PageWindow) -> Result<Vec<Self::Item>, Self::Error>;
}
