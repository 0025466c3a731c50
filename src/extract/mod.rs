//! Text extraction for office documents, PDFs, and plain text.
//!
//! Every extractor turns file bytes into an ordered list of text units:
//! one per paragraph (DOCX), row (XLSX), or line (PDF, plain text). The
//! units carry no markup and feed straight into
//! [`chunk_units`](kb_harness_core::chunk::chunk_units).
//!
//! Extractor selection is purely by file-name suffix, case-insensitively:
//!
//! | Suffix | Extractor |
//! |--------|-----------|
//! | `.docx` | [`docx::extract`] |
//! | `.xlsx`, `.xls` | [`xlsx::extract`] |
//! | `.pdf` | [`pdf::PdfExtractor`] chosen by [`PdfBackend`] (can be disabled) |
//! | `.txt` | line split |
//!
//! Anything else is rejected with [`ExtractError::UnsupportedFormat`] before
//! any bytes are inspected.
//!
//! The OOXML extractors segment XML on boundary markers (`</w:p>`, `</row>`,
//! `</c>`) instead of building a tree, so malformed documents still yield
//! whatever text is recoverable.

mod container;
pub mod docx;
pub mod pdf;
pub mod xlsx;

use std::borrow::Cow;

pub use container::ContainerReader;
pub use pdf::{PdfBackend, PdfExtractor};

use crate::config::ExtractionConfig;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. Fatal to the current file only.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The bytes are not a readable archive.
    #[error("invalid file: {0}")]
    Container(String),
    /// The archive opened but a required part is missing.
    #[error("invalid document: {0}")]
    Format(String),
    /// The file-name suffix is not one we extract.
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}

/// Recognised file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Docx,
    Xlsx,
    Pdf,
    Text,
}

impl FileKind {
    /// Classify a file name by suffix, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".docx") {
            Some(FileKind::Docx)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(FileKind::Xlsx)
        } else if lower.ends_with(".pdf") {
            Some(FileKind::Pdf)
        } else if lower.ends_with(".txt") {
            Some(FileKind::Text)
        } else {
            None
        }
    }
}

/// Knobs for [`extract_units`].
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub pdf_enabled: bool,
    pub pdf_backend: PdfBackend,
    pub max_entry_bytes: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pdf_enabled: false,
            pdf_backend: PdfBackend::Raw,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

impl From<&ExtractionConfig> for ExtractOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            pdf_enabled: config.pdf_enabled,
            pdf_backend: config.pdf_backend,
            max_entry_bytes: config.max_entry_bytes,
        }
    }
}

/// Whether `name` would be accepted by [`extract_units`] under `options`.
pub fn is_supported(name: &str, options: &ExtractOptions) -> bool {
    match FileKind::from_name(name) {
        Some(FileKind::Pdf) => options.pdf_enabled,
        Some(_) => true,
        None => false,
    }
}

/// Extract ordered text units from a file's bytes, dispatching on `name`.
pub fn extract_units(
    name: &str,
    bytes: &[u8],
    options: &ExtractOptions,
) -> Result<Vec<String>, ExtractError> {
    match FileKind::from_name(name) {
        Some(FileKind::Docx) => docx::extract(bytes, options.max_entry_bytes),
        Some(FileKind::Xlsx) => xlsx::extract(bytes, options.max_entry_bytes),
        Some(FileKind::Pdf) if options.pdf_enabled => {
            options.pdf_backend.extractor().extract(bytes)
        }
        Some(FileKind::Text) => Ok(text_lines(bytes)),
        _ => Err(ExtractError::UnsupportedFormat(name.to_string())),
    }
}

/// Plain text: one unit per non-empty line, CRLF tolerated.
fn text_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve XML character and entity references, keeping the raw text when
/// it contains a malformed reference.
pub(crate) fn decode_entities(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_is_case_insensitive() {
        assert_eq!(FileKind::from_name("Report.DOCX"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_name("prices.Xls"), Some(FileKind::Xlsx));
        assert_eq!(FileKind::from_name("book.xlsx"), Some(FileKind::Xlsx));
        assert_eq!(FileKind::from_name("scan.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_name("notes.txt"), Some(FileKind::Text));
        assert_eq!(FileKind::from_name("slides.pptx"), None);
        assert_eq!(FileKind::from_name("docx"), None);
    }

    #[test]
    fn test_unsupported_suffix_rejected() {
        let err = extract_units("deck.pptx", b"anything", &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_pdf_rejected_by_default() {
        let options = ExtractOptions::default();
        let err = extract_units("a.pdf", b"%PDF-1.4", &options).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
        assert!(!is_supported("a.pdf", &options));
        assert!(is_supported("a.txt", &options));
    }

    #[test]
    fn test_pdf_accepted_when_enabled() {
        let options = ExtractOptions {
            pdf_enabled: true,
            ..ExtractOptions::default()
        };
        assert!(is_supported("Scan.PDF", &options));
        let units = extract_units("a.pdf", b"%PDF-1.4", &options).unwrap();
        assert_eq!(units, vec![pdf::UNPARSEABLE_NOTICE]);
    }

    #[test]
    fn test_invalid_zip_is_container_error() {
        let options = ExtractOptions::default();
        let err = extract_units("a.docx", b"not a zip", &options).unwrap_err();
        assert!(matches!(err, ExtractError::Container(_)));
        let err = extract_units("a.xlsx", b"not a zip", &options).unwrap_err();
        assert!(matches!(err, ExtractError::Container(_)));
        assert!(err.to_string().starts_with("invalid file"));
    }

    #[test]
    fn test_text_lines_skip_empty_and_strip_cr() {
        let units = extract_units(
            "notes.txt",
            b"first\r\n\r\nsecond\n\nthird",
            &ExtractOptions::default(),
        )
        .unwrap();
        assert_eq!(units, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("broken &bogus"), "broken &bogus");
    }
}
