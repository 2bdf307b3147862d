//! Content-addressed naming and type-bucketed placement of retrieved files.
//!
//! Every stored file is named `<hash prefix>_<tag>_<original base name>`,
//! where the tag records which addressing mode produced the hash, so names
//! from the two modes can never collide. Identical content retrieved via
//! computed-hash addressing always lands on the same name; a later write
//! overwrites rather than duplicates.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::endpoint::HASH_PREFIX_LEN;

/// Bucket for files without an extension.
pub const UNKNOWN_BUCKET: &str = "UKN";

/// Allow-list sentinel accepting every extension.
pub const ALLOW_ALL: &str = "all";

/// Which addressing mode produced a stored file's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressTag {
    /// Hash taken verbatim from a signature metadata record.
    Signature,
    /// Hash computed locally from the fetched content.
    Url,
}

impl AddressTag {
    /// The tag fragment embedded in stored file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signature => "sig",
            Self::Url => "url",
        }
    }
}

/// Returns the base name of a possibly-relative reference.
///
/// References discovered in signature blobs use back-slash separators;
/// URLs use forward slashes. Both are handled.
#[must_use]
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Derives the stored file name for a piece of content.
///
/// The name is `<first 4 hash chars>_<tag>_<base name>`; the same hash,
/// tag, and name always produce the same output.
#[must_use]
pub fn hashed_file_name(hash: &str, tag: AddressTag, name: &str) -> String {
    let prefix = hash.get(..HASH_PREFIX_LEN).unwrap_or(hash);
    format!("{prefix}_{}_{}", tag.as_str(), base_name(name))
}

/// Computes the uppercase hex SHA-256 digest of content.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

/// Decides which files are worth downloading and where they land.
///
/// A file's suffix (after the last `.` of its base name) must appear in
/// the allow-list, or the list must carry the [`ALLOW_ALL`] sentinel.
/// Files without a suffix are taken only when no-extension downloads are
/// enabled, and land in the [`UNKNOWN_BUCKET`].
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    allowed: Vec<String>,
    allow_all: bool,
    download_no_ext: bool,
}

impl ExtensionPolicy {
    /// Builds a policy from a comma-separated allow-list.
    #[must_use]
    pub fn new(allow_spec: &str, download_no_ext: bool) -> Self {
        let allowed: Vec<String> = allow_spec
            .split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(ToString::to_string)
            .collect();
        let allow_all = allowed.iter().any(|ext| ext == ALLOW_ALL);
        Self {
            allowed,
            allow_all,
            download_no_ext,
        }
    }

    /// Returns the bucket a file belongs in, or `None` if it is unwanted.
    ///
    /// Rejections are debug-logged only; they are expected and frequent.
    #[must_use]
    pub fn bucket_for(&self, file_name: &str) -> Option<String> {
        let base = base_name(file_name);
        let suffix = base
            .rfind('.')
            .map(|dot| &base[dot + 1..])
            .filter(|suffix| !suffix.is_empty());

        match suffix {
            Some(suffix) => {
                if self.allow_all || self.allowed.iter().any(|ext| ext == suffix) {
                    Some(suffix.to_string())
                } else {
                    debug!(file = %file_name, suffix, "skipping: extension not wanted");
                    None
                }
            }
            None => {
                if self.download_no_ext {
                    debug!(file = %file_name, "no extension, downloading anyway");
                    Some(UNKNOWN_BUCKET.to_string())
                } else {
                    debug!(file = %file_name, "no extension, skipping");
                    None
                }
            }
        }
    }
}

/// Creates (idempotently) the output directory for a type bucket.
///
/// # Errors
///
/// Returns the underlying IO error if the directory cannot be created.
pub fn ensure_bucket_dir(output_dir: &Path, bucket: &str) -> io::Result<PathBuf> {
    let dir = output_dir.join("files").join(bucket);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_handles_both_separators() {
        assert_eq!(base_name("a/b/c.ps1"), "c.ps1");
        assert_eq!(base_name(r"a\b\c.ps1"), "c.ps1");
        assert_eq!(base_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_hashed_file_name_shape() {
        assert_eq!(
            hashed_file_name("ABCD1234", AddressTag::Signature, r"sub\tool.ps1"),
            "ABCD_sig_tool.ps1"
        );
        assert_eq!(
            hashed_file_name("ABCD1234", AddressTag::Url, "tool.ps1"),
            "ABCD_url_tool.ps1"
        );
    }

    #[test]
    fn test_tags_never_collide() {
        let sig = hashed_file_name("ABCD1234", AddressTag::Signature, "x.txt");
        let url = hashed_file_name("ABCD1234", AddressTag::Url, "x.txt");
        assert_ne!(sig, url);
    }

    #[test]
    fn test_content_hash_deterministic_and_uppercase() {
        let first = content_hash(b"identical content");
        let second = content_hash(b"identical content");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_eq!(first, first.to_uppercase());
        assert_ne!(first, content_hash(b"different content"));
    }

    #[test]
    fn test_known_content_hash_value() {
        // SHA-256 of the empty input.
        assert_eq!(
            content_hash(b""),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn test_policy_accepts_listed_extension() {
        let policy = ExtensionPolicy::new("ps1,txt", false);
        assert_eq!(policy.bucket_for("report.ps1"), Some("ps1".to_string()));
    }

    #[test]
    fn test_policy_rejects_unlisted_extension() {
        let policy = ExtensionPolicy::new("ps1,txt", false);
        assert_eq!(policy.bucket_for("payload.exe"), None);
    }

    #[test]
    fn test_policy_no_extension_gated_by_flag() {
        let rejecting = ExtensionPolicy::new("ps1,txt", false);
        assert_eq!(rejecting.bucket_for("noext"), None);

        let accepting = ExtensionPolicy::new("ps1,txt", true);
        assert_eq!(
            accepting.bucket_for("noext"),
            Some(UNKNOWN_BUCKET.to_string())
        );
    }

    #[test]
    fn test_policy_all_sentinel_accepts_everything() {
        let policy = ExtensionPolicy::new("all", false);
        assert_eq!(policy.bucket_for("anything.xyz"), Some("xyz".to_string()));
    }

    #[test]
    fn test_policy_trailing_dot_is_no_extension() {
        let policy = ExtensionPolicy::new("all", false);
        assert_eq!(policy.bucket_for("oddname."), None);
    }

    #[test]
    fn test_policy_uses_base_name_for_suffix() {
        let policy = ExtensionPolicy::new("ps1", false);
        assert_eq!(
            policy.bucket_for(r"scripts\setup.ps1"),
            Some("ps1".to_string())
        );
    }

    #[test]
    fn test_ensure_bucket_dir_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = ensure_bucket_dir(dir.path(), "ps1").unwrap();
        let second = ensure_bucket_dir(dir.path(), "ps1").unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(first.ends_with("files/ps1"));
    }
}
