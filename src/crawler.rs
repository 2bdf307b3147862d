//! Recursive crawler over the distribution point's directory tree.
//!
//! Each directory is one unit of work: fetch the listing page under a
//! limiter permit, classify its rows, append the file URLs to the shared
//! result set, then fan out into the subdirectories. The permit is held
//! for the fetch+parse only and dropped before children run, so a parent
//! waiting on its children never starves them of capacity — with a pool of
//! one the crawl still terminates.
//!
//! Completion is structural: every directory task awaits the child tasks
//! it spawned, so when the root tasks return, every transitively
//! discovered node has reached a terminal state. The result set is owned
//! by [`crawl_file_urls`] and returned by value; there is no global
//! accumulation state and the crawler is re-entrant.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::fetch::HttpClient;
use crate::limiter::FetchLimiter;
use crate::listing::{self, ListingPage};

/// Shared, append-only collection of discovered file URLs.
type DiscoveredUrls = Arc<Mutex<Vec<String>>>;

/// Crawls a set of root directories and returns every file URL found.
///
/// Fetch failures anywhere in the tree are logged and treated as leaves
/// with zero children; a partial tree is acceptable output. No ordering is
/// guaranteed between sibling branches.
pub async fn crawl_file_urls(
    client: HttpClient,
    limiter: FetchLimiter,
    root_urls: Vec<String>,
    progress: ProgressBar,
) -> Vec<String> {
    let discovered: DiscoveredUrls = Arc::new(Mutex::new(Vec::new()));

    let mut roots = Vec::new();
    for url in root_urls {
        roots.push(tokio::spawn(crawl_directory(
            client.clone(),
            limiter.clone(),
            url,
            Arc::clone(&discovered),
            progress.clone(),
        )));
    }
    for handle in roots {
        if let Err(e) = handle.await {
            warn!(error = %e, "crawl task panicked");
        }
    }

    // All tasks have joined; the set has a single owner again.
    match Arc::try_unwrap(discovered) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
        Err(shared) => shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
    }
}

/// Processes one directory node and recurses into its children.
///
/// Boxed because the future type is recursive.
fn crawl_directory(
    client: HttpClient,
    limiter: FetchLimiter,
    dir_url: String,
    discovered: DiscoveredUrls,
    progress: ProgressBar,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let page = {
            let _permit = match limiter.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(error = %e, "limiter closed, abandoning branch");
                    return;
                }
            };
            match client.get_text(&dir_url).await {
                Ok(html) => listing::parse_directory_listing(&html),
                Err(e) => {
                    debug!(url = %dir_url, error = %e, "directory fetch failed, treating as leaf");
                    return;
                }
            }
            // Permit drops here, before any child acquires its own.
        };
        let ListingPage {
            file_urls,
            dir_urls,
        } = page;

        progress.inc(file_urls.len() as u64);
        if !file_urls.is_empty() {
            let mut set = discovered.lock().unwrap_or_else(PoisonError::into_inner);
            set.extend(file_urls);
        }

        if dir_urls.is_empty() {
            return;
        }
        debug!(count = dir_urls.len(), url = %dir_url, "found subdirectories");

        let mut children = Vec::new();
        for child_url in dir_urls {
            children.push(tokio::spawn(crawl_directory(
                client.clone(),
                limiter.clone(),
                child_url,
                Arc::clone(&discovered),
                progress.clone(),
            )));
        }
        for child in children {
            if let Err(e) = child.await {
                warn!(error = %e, "crawl task panicked");
            }
        }
    })
}
