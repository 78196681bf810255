//! Parallel fetching of paginated listings.
//!
//! Uses the total count from the first page to fetch the rest with a
//! bounded number of requests in flight.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

use crate::error::ApiResult;

/// Type alias for boxed futures used in parallel fetching
type PageFuture<T> = Pin<Box<dyn Future<Output = (usize, ApiResult<Vec<T>>)> + Send>>;

/// Fetch all remaining pages in parallel after the first page.
///
/// Spawns requests for `remaining_pages` (from
/// `PagedResponse::remaining_pages()`), keeping at most `max_concurrent`
/// in flight. Returns all items from all remaining pages, in arrival order.
pub async fn fetch_remaining_pages<T, F, Fut>(
    remaining_pages: Vec<usize>,
    fetch_page: F,
    max_concurrent: usize,
) -> ApiResult<Vec<T>>
where
    T: Send + 'static,
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Vec<T>>> + Send + 'static,
{
    if remaining_pages.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "Fetching {} remaining pages with max {} concurrent",
        remaining_pages.len(),
        max_concurrent
    );

    let mut all_items = Vec::new();
    let mut futures: FuturesUnordered<PageFuture<T>> = FuturesUnordered::new();
    let mut pending_pages = remaining_pages.into_iter();

    let make_future = |page: usize, f: &F| -> PageFuture<T> {
        let fut = f(page);
        Box::pin(async move {
            let result = fut.await;
            (page, result)
        })
    };

    // Seed initial batch up to max_concurrent
    for page in pending_pages.by_ref().take(max_concurrent) {
        futures.push(make_future(page, &fetch_page));
    }

    // Process results and spawn new requests to maintain concurrency
    while let Some((page, result)) = futures.next().await {
        let items = result?;
        debug!("Page {} returned {} items", page, items.len());
        all_items.extend(items);

        if let Some(next_page) = pending_pages.next() {
            futures.push(make_future(next_page, &fetch_page));
        }
    }

    Ok(all_items)
}
