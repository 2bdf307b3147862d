//! URL layout of a distribution-point file share.
//!
//! A distribution point exposes three namespaces under one base URL:
//! the `Datalib` package listing, the `SMS_DP_SMSSIG$` signature blobs,
//! and the content-addressed `FileLib`. This module is the single source
//! for those paths so request construction stays consistent across the
//! crawler and the download pipeline.

/// Package listing namespace.
const PKG_SHARE: &str = "SMS_DP_SMSPKG$";

/// Signature blob namespace.
const SIG_SHARE: &str = "SMS_DP_SMSSIG$";

/// Number of leading hash characters that select a `FileLib` bucket.
pub const HASH_PREFIX_LEN: usize = 4;

/// A remote distribution-point endpoint.
///
/// Holds the base URL (`protocol://host:port`) and derives the share
/// paths from it. Cheap to clone; no connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Creates an endpoint from protocol, host, and port.
    #[must_use]
    pub fn new(protocol: &str, server: &str, port: u16) -> Self {
        Self {
            base: format!("{protocol}://{server}:{port}"),
        }
    }

    /// Creates an endpoint from an already-formed base URL.
    ///
    /// A trailing slash is stripped so derived paths never double up.
    #[must_use]
    pub fn from_base(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    /// The base URL without a trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of the root package listing.
    #[must_use]
    pub fn datalib_url(&self) -> String {
        format!("{}/{PKG_SHARE}/Datalib", self.base)
    }

    /// URL of a package directory listing.
    ///
    /// Entries already carrying a scheme (discovered as absolute URLs in a
    /// listing) are passed through untouched.
    #[must_use]
    pub fn package_dir_url(&self, entry: &str) -> String {
        if entry.contains("http") {
            entry.to_string()
        } else {
            format!("{}/{PKG_SHARE}/{entry}", self.base)
        }
    }

    /// URL of a package's signature blob.
    #[must_use]
    pub fn signature_url(&self, package: &str) -> String {
        format!("{}/{SIG_SHARE}/{package}.tar", self.base)
    }

    /// URL of a file's metadata document inside a package directory.
    ///
    /// `name` may be a relative path with forward-slash separators.
    #[must_use]
    pub fn metadata_url(&self, package: &str, name: &str) -> String {
        format!("{}/{PKG_SHARE}/Datalib/{package}/{name}.INI", self.base)
    }

    /// URL of a content file in the hash-bucketed file library.
    ///
    /// The caller must supply a hash of at least [`HASH_PREFIX_LEN`]
    /// characters; [`crate::metadata::SignatureRecord`] guarantees this for
    /// hashes it produces.
    #[must_use]
    pub fn filelib_url(&self, hash: &str) -> String {
        let prefix = hash.get(..HASH_PREFIX_LEN).unwrap_or(hash);
        format!("{}/{PKG_SHARE}/FileLib/{prefix}/{hash}", self.base)
    }
}
