//! PDF header sniffing.
//!
//! Used to fail fast with a clear "not a PDF" error before handing bytes
//! to the parser.

use crate::error::FormatError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Whether the header is followed by the binary-marker comment line
    pub binary_marker: bool,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"
const HEADER_PROBE_LEN: usize = 32;

/// Detect PDF format from a file path.
///
/// Unreadable or short files are reported as [`FormatError::UnknownFormat`].
///
/// # Example
/// ```no_run
/// use pagewipe::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("scan.pdf").unwrap();
/// println!("PDF version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat, FormatError> {
    let file = File::open(path).map_err(|_| FormatError::UnknownFormat)?;
    let mut header = Vec::with_capacity(HEADER_PROBE_LEN);
    BufReader::new(file)
        .take(HEADER_PROBE_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|_| FormatError::UnknownFormat)?;
    detect_format_from_bytes(&header)
}

/// Detect PDF format from bytes.
///
/// Only the first few bytes are inspected; the whole document may be passed.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat, FormatError> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(FormatError::UnknownFormat);
    }

    // Extract version string (e.g., "1.7" from "%PDF-1.7")
    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    // Validate version format (should be like "1.0" to "2.0")
    if !is_valid_version(&version) {
        return Err(FormatError::UnsupportedVersion(version));
    }

    Ok(PdfFormat {
        version,
        binary_marker: has_binary_marker(&data[PDF_MAGIC_LEN + VERSION_LEN..]),
    })
}

/// A `%` comment of high-bit bytes on the line after the header.
fn has_binary_marker(rest: &[u8]) -> bool {
    let rest = rest
        .iter()
        .position(|b| *b != b'\r' && *b != b'\n')
        .map_or(&[][..], |start| &rest[start..]);
    rest.len() >= 5 && rest[0] == b'%' && rest[1..5].iter().all(|b| *b >= 128)
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// Check if a file starts with a PDF header.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
