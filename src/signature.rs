//! Heuristic scanner for embedded file names in signature blobs.
//!
//! Signature blobs are opaque binary archives, but each signed file's
//! record carries a fixed marker sequence at a known distance after the
//! file-name field. The scanner slides over the raw bytes, and at every
//! marker match extracts the NUL-terminated string starting 512 bytes
//! earlier. This is a structural heuristic, not a format parser: in dense
//! binary regions the extracted string may include unrelated bytes, and
//! overlapping or duplicate matches are reported as-is.

/// Marker sequence identifying a file record.
pub const NAME_MARKER: [u8; 11] = [
    0x18, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01,
];

/// Distance from the marker back to the start of the name field.
const NAME_OFFSET: usize = 512;

/// Extracts candidate file names from a signature blob.
///
/// Matches are returned in ascending offset order, without deduplication.
/// A buffer shorter than the marker yields an empty result. A name field
/// with no terminating NUL is truncated at the end of the buffer.
#[must_use]
pub fn extract_file_names(data: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    for (offset, window) in data.windows(NAME_MARKER.len()).enumerate() {
        if window != NAME_MARKER.as_slice() {
            continue;
        }
        let start = offset.saturating_sub(NAME_OFFSET);
        let end = data[start..]
            .iter()
            .position(|&b| b == 0x00)
            .map_or(data.len(), |nul| start + nul);
        names.push(String::from_utf8_lossy(&data[start..end]).into_owned());
    }
    names
}
