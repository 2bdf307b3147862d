//! Per-file metadata documents and the trusted hash they carry.
//!
//! Each file on the distribution point has a small INI document next to
//! it whose `[File]` section declares the content hash the file library
//! stores it under. The hash is treated as a directive for addressing and
//! dedup naming only; the fetched content is not verified against it.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::endpoint::HASH_PREFIX_LEN;

/// Section holding the file record.
const FILE_SECTION: &str = "File";

/// Key holding the content hash.
const HASH_KEY: &str = "Hash";

/// Errors raised while reading a metadata document.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The document could not be read or parsed.
    #[error("malformed metadata document {path}: {source}")]
    Malformed {
        /// Path of the offending document.
        path: PathBuf,
        /// The underlying read/parse error.
        #[source]
        source: ini::Error,
    },

    /// The expected section/key is missing or empty.
    #[error("section '{FILE_SECTION}' key '{HASH_KEY}' not found in {path}")]
    HashNotFound {
        /// Path of the offending document.
        path: PathBuf,
    },

    /// The declared hash is too short to derive a storage prefix from.
    #[error("hash {value:?} in {path} is too short for content addressing")]
    HashTooShort {
        /// Path of the offending document.
        path: PathBuf,
        /// The unusable hash value.
        value: String,
    },
}

/// The parsed result of one metadata document.
///
/// A well-formed record always carries a non-empty hash long enough to
/// yield a storage prefix; anything else fails parsing and the associated
/// file reference is dropped by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    hash: String,
}

impl SignatureRecord {
    /// The declared content hash, verbatim.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The bucket-selecting hash prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.hash.get(..HASH_PREFIX_LEN).unwrap_or(&self.hash)
    }
}

/// Reads a metadata document and extracts its signature record.
///
/// # Errors
///
/// Returns [`MetadataError::Malformed`] if the document cannot be read or
/// parsed, [`MetadataError::HashNotFound`] if the `[File]` section or its
/// `Hash` key is missing or empty, and [`MetadataError::HashTooShort`] if
/// the value cannot yield a storage prefix.
pub fn read_signature_record(path: &Path) -> Result<SignatureRecord, MetadataError> {
    let document = Ini::load_from_file(path).map_err(|source| MetadataError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let hash = document
        .section(Some(FILE_SECTION))
        .and_then(|section| section.get(HASH_KEY))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MetadataError::HashNotFound {
            path: path.to_path_buf(),
        })?;

    if hash.len() < HASH_PREFIX_LEN {
        return Err(MetadataError::HashTooShort {
            path: path.to_path_buf(),
            value: hash.to_string(),
        });
    }

    Ok(SignatureRecord {
        hash: hash.to_string(),
    })
}
