//! HTTP transport for talking to a distribution point.
//!
//! All requests go through a single pre-configured [`HttpClient`]: one
//! user agent, one timeout, and an optional certificate-validation bypass
//! for endpoints with self-signed certificates. Bodies are read fully into
//! memory — the computed-hash addressing mode must hash content before it
//! can name the output file, so there is nothing to stream to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching from the distribution point.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to construct the HTTP client from the supplied configuration.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response body could not be read to completion.
    #[error("error reading response body from {url}: {source}")]
    BodyRead {
        /// The URL whose body failed to read.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing fetched content.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body-read error.
    pub fn body_read(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::BodyRead {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// HTTP client for distribution-point requests.
///
/// Created once and reused for every request so connection pooling applies.
/// Cloning is cheap; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given user agent, request timeout, and
    /// certificate-validation policy.
    ///
    /// With `accept_invalid_certs` set, HTTPS endpoints with self-signed or
    /// mismatched certificates are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the underlying client cannot
    /// be constructed.
    pub fn new(
        user_agent: &str,
        timeout_secs: u64,
        accept_invalid_certs: bool,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Fetches a URL and returns the full response body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] or [`FetchError::Timeout`] if the
    /// request fails, [`FetchError::HttpStatus`] on a non-2xx response, and
    /// [`FetchError::BodyRead`] if the body cannot be read to completion.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "fetching");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::body_read(url, e))?;
        Ok(body.to_vec())
    }

    /// Fetches a URL and returns the body decoded as text.
    ///
    /// Invalid UTF-8 sequences are replaced rather than treated as errors;
    /// listing pages occasionally carry stray bytes.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get_bytes`](Self::get_bytes).
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetches a URL and writes the body to `path`, truncating any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get_bytes`](Self::get_bytes), plus
    /// [`FetchError::Io`] if the write fails.
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<(), FetchError> {
        let body = self.get_bytes(url).await?;
        tokio::fs::write(path, &body)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        debug!(url, path = %path.display(), bytes = body.len(), "saved");
        Ok(())
    }
}
