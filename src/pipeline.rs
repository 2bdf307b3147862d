//! Download pipeline: turns discovered references into files on disk.
//!
//! Two independently invocable strategies share one limiter, one client,
//! and one output layout:
//!
//! - the **signature method** fetches each package's signature blob, scans
//!   it for embedded file names, resolves each name's metadata document to
//!   a trusted hash, and fetches the content from the hash-addressed file
//!   library;
//! - the **direct-URL method** takes file URLs from the crawler (or a
//!   pre-fetched list), fetches each body, and names it by its computed
//!   hash.
//!
//! Per-item failures are logged and counted, never propagated; directory
//! creation failures abort the enclosing operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error, info, warn};

use crate::endpoint::Endpoint;
use crate::fetch::{FetchError, HttpClient};
use crate::limiter::{FetchLimiter, LimiterError};
use crate::listing;
use crate::metadata;
use crate::store::{self, AddressTag, ExtensionPolicy};

/// Error type for pipeline operations.
///
/// Per-item fetch/metadata failures never surface here; they end the item,
/// not the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Filesystem error preparing the output layout.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The shared limiter was closed.
    #[error(transparent)]
    Limiter(#[from] LimiterError),
}

impl PipelineError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Counters for a harvest run.
///
/// Updated from concurrent download tasks; atomic so the final banner can
/// report totals without locking.
#[derive(Debug, Default)]
pub struct HarvestStats {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl HarvestStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files written to the store.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Number of references rejected by the extension policy.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Number of references that failed at any fetch/metadata stage.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn increment_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// One reference resolved far enough to hand to a download task.
struct ReferenceJob {
    metadata_url: String,
    name: String,
    ini_path: PathBuf,
    files_dir: PathBuf,
}

/// The shared download machinery for both strategies.
#[derive(Debug)]
pub struct DownloadPipeline {
    client: HttpClient,
    limiter: FetchLimiter,
    policy: ExtensionPolicy,
    output_dir: PathBuf,
    randomize: bool,
    stats: Arc<HarvestStats>,
}

impl DownloadPipeline {
    /// Creates a pipeline writing under `output_dir`.
    #[must_use]
    pub fn new(
        client: HttpClient,
        limiter: FetchLimiter,
        policy: ExtensionPolicy,
        output_dir: impl Into<PathBuf>,
        randomize: bool,
    ) -> Self {
        Self {
            client,
            limiter,
            policy,
            output_dir: output_dir.into(),
            randomize,
            stats: Arc::new(HarvestStats::new()),
        }
    }

    /// Run counters, shared across both strategies.
    #[must_use]
    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    /// Fetches the root package listing and snapshots it to
    /// `<server>_Datalib.txt` in the output directory.
    ///
    /// This is the run's only fatal fetch: the caller classifies the error
    /// into a sentinel marker and aborts.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or [`FetchError::Io`] if the output
    /// directory or snapshot cannot be written.
    pub async fn fetch_datalib_listing(
        &self,
        endpoint: &Endpoint,
        server: &str,
    ) -> Result<String, FetchError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| FetchError::io(&self.output_dir, e))?;

        let url = endpoint.datalib_url();
        info!(url = %url, "fetching root listing");
        let body = self.client.get_text(&url).await?;

        let snapshot = self.output_dir.join(format!("{server}_Datalib.txt"));
        std::fs::write(&snapshot, &body).map_err(|e| FetchError::io(&snapshot, e))?;
        debug!(path = %snapshot.display(), "listing snapshot saved");
        Ok(body)
    }

    /// Downloads each package's signature blob into
    /// `<output>/signatures/`, returning that directory.
    ///
    /// INI-suffixed entries are skipped outright — metadata documents
    /// never have signatures, so this halves the request count. Individual
    /// blob failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the signature directory cannot be
    /// created, or [`PipelineError::Limiter`] if the limiter closed.
    pub async fn fetch_signatures(
        &self,
        endpoint: &Endpoint,
        entry_names: &[String],
        progress: &ProgressBar,
    ) -> Result<PathBuf, PipelineError> {
        let sig_dir = self.output_dir.join("signatures");
        std::fs::create_dir_all(&sig_dir).map_err(|e| PipelineError::io(&sig_dir, e))?;

        let mut names: Vec<String> = entry_names
            .iter()
            .filter(|name| !name.ends_with(".INI"))
            .cloned()
            .collect();
        self.maybe_shuffle(&mut names);

        let mut handles = Vec::new();
        for name in names {
            progress.inc(1);
            let permit = self.limiter.acquire().await?;
            let client = self.client.clone();
            let url = endpoint.signature_url(&name);
            let out = sig_dir.join(format!("{name}.tar"));
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                match client.download_to_path(&url, &out).await {
                    Ok(()) => debug!(path = %out.display(), "signature saved"),
                    Err(e) => debug!(url = %url, error = %e, "error downloading signature"),
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "signature task panicked");
            }
        }
        Ok(sig_dir)
    }

    /// Downloads the files named by one signature blob.
    ///
    /// For each accepted name: fetch the metadata document into
    /// `<output>/inis/<package>/`, extract the trusted hash, then fetch
    /// the hash-addressed content into its extension bucket under the
    /// `sig` tag. A failure at either stage aborts only that reference.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if an output directory cannot be
    /// created, or [`PipelineError::Limiter`] if the limiter closed.
    pub async fn download_signature_files(
        &self,
        endpoint: &Endpoint,
        signature_path: &Path,
        file_names: Vec<String>,
    ) -> Result<(), PipelineError> {
        let package = signature_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        let ini_dir = self.output_dir.join("inis").join(&package);
        std::fs::create_dir_all(&ini_dir).map_err(|e| PipelineError::io(&ini_dir, e))?;

        let mut file_names = file_names;
        self.maybe_shuffle(&mut file_names);

        let mut handles = Vec::new();
        for raw_name in file_names {
            let name = raw_name.replace('\\', "/");

            // Relative references need their directory mirrored under inis/.
            if let Some(parent) = Path::new(&name).parent().filter(|p| !p.as_os_str().is_empty())
            {
                let nested = ini_dir.join(parent);
                std::fs::create_dir_all(&nested)
                    .map_err(|e| PipelineError::io(&nested, e))?;
            }

            let Some(bucket) = self.policy.bucket_for(&name) else {
                self.stats.increment_skipped();
                continue;
            };
            let files_dir = store::ensure_bucket_dir(&self.output_dir, &bucket)
                .map_err(|e| PipelineError::io(&self.output_dir, e))?;

            let job = ReferenceJob {
                metadata_url: endpoint.metadata_url(&package, &name),
                ini_path: ini_dir.join(format!("{name}.INI")),
                name,
                files_dir,
            };
            let permit = self.limiter.acquire().await?;
            handles.push(tokio::spawn(download_reference(
                self.client.clone(),
                endpoint.clone(),
                job,
                Arc::clone(&self.stats),
                permit,
            )));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "download task panicked");
            }
        }
        Ok(())
    }

    /// Downloads discovered file URLs, naming each file by the hash of
    /// its fetched content.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if a bucket directory cannot be
    /// created, or [`PipelineError::Limiter`] if the limiter closed.
    pub async fn download_from_urls(
        &self,
        file_urls: Vec<String>,
        progress: &ProgressBar,
    ) -> Result<(), PipelineError> {
        let mut file_urls = file_urls;
        self.maybe_shuffle(&mut file_urls);

        let mut handles = Vec::new();
        for url in file_urls {
            progress.inc(1);
            let name = listing::file_name_from_href(&url);
            if name.is_empty() {
                debug!(url = %url, "could not derive file name from URL");
                self.stats.increment_failed();
                continue;
            }
            let Some(bucket) = self.policy.bucket_for(&name) else {
                self.stats.increment_skipped();
                continue;
            };
            let files_dir = store::ensure_bucket_dir(&self.output_dir, &bucket)
                .map_err(|e| PipelineError::io(&self.output_dir, e))?;

            let permit = self.limiter.acquire().await?;
            handles.push(tokio::spawn(download_url_content(
                self.client.clone(),
                url,
                name,
                files_dir,
                Arc::clone(&self.stats),
                permit,
            )));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "download task panicked");
            }
        }
        Ok(())
    }

    /// Applies a uniform shuffle when randomization is enabled.
    fn maybe_shuffle(&self, items: &mut [String]) {
        if self.randomize {
            items.shuffle(&mut rand::thread_rng());
        }
    }
}

/// Resolves one signature-method reference: metadata document, trusted
/// hash, then the hash-addressed content.
async fn download_reference(
    client: HttpClient,
    endpoint: Endpoint,
    job: ReferenceJob,
    stats: Arc<HarvestStats>,
    permit: OwnedSemaphorePermit,
) {
    let _permit = permit;

    if let Err(e) = client.download_to_path(&job.metadata_url, &job.ini_path).await {
        debug!(name = %job.name, error = %e, "error downloading metadata document");
        stats.increment_failed();
        return;
    }

    let record = match metadata::read_signature_record(&job.ini_path) {
        Ok(record) => record,
        Err(e) => {
            debug!(path = %job.ini_path.display(), error = %e, "unusable metadata document");
            stats.increment_failed();
            return;
        }
    };

    let out = job
        .files_dir
        .join(store::hashed_file_name(record.hash(), AddressTag::Signature, &job.name));
    let content_url = endpoint.filelib_url(record.hash());
    match client.download_to_path(&content_url, &out).await {
        Ok(()) => {
            debug!(name = %job.name, path = %out.display(), "downloaded");
            stats.increment_downloaded();
        }
        Err(e) => {
            debug!(url = %content_url, error = %e, "error downloading content");
            stats.increment_failed();
        }
    }
}

/// Fetches one URL's body, hashes it, and stores it under the computed
/// name.
async fn download_url_content(
    client: HttpClient,
    url: String,
    name: String,
    files_dir: PathBuf,
    stats: Arc<HarvestStats>,
    permit: OwnedSemaphorePermit,
) {
    let _permit = permit;

    let bytes = match client.get_bytes(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(url = %url, error = %e, "error downloading file");
            stats.increment_failed();
            return;
        }
    };

    let hash = store::content_hash(&bytes);
    let out = files_dir.join(store::hashed_file_name(&hash, AddressTag::Url, &name));
    debug!(path = %out.display(), "output path");

    match tokio::fs::write(&out, &bytes).await {
        Ok(()) => stats.increment_downloaded(),
        Err(e) => {
            error!(path = %out.display(), error = %e, "error writing content file");
            stats.increment_failed();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default_is_zero() {
        let stats = HarvestStats::new();
        assert_eq!(stats.downloaded(), 0);
        assert_eq!(stats.skipped(), 0);
        assert_eq!(stats.failed(), 0);
    }

    #[test]
    fn test_stats_increment() {
        let stats = HarvestStats::new();
        stats.increment_downloaded();
        stats.increment_downloaded();
        stats.increment_skipped();
        stats.increment_failed();
        assert_eq!(stats.downloaded(), 2);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.failed(), 1);
    }

    #[test]
    fn test_stats_thread_safe() {
        use std::thread;

        let stats = Arc::new(HarvestStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats.increment_downloaded();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.downloaded(), 800);
    }

    #[test]
    fn test_maybe_shuffle_preserves_elements() {
        let client = HttpClient::new("test", 5, false).unwrap();
        let limiter = FetchLimiter::new(1).unwrap();
        let policy = ExtensionPolicy::new("all", false);
        let pipeline = DownloadPipeline::new(client, limiter, policy, "/tmp/out", true);

        let original: Vec<String> = (0..32).map(|i| format!("item-{i}")).collect();
        let mut shuffled = original.clone();
        pipeline.maybe_shuffle(&mut shuffled);

        let mut sorted = shuffled.clone();
        sorted.sort();
        let mut expected = original;
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
