//! PDF text extraction.
//!
//! [`RawPdfExtractor`] is a structural scanner that needs no PDF object
//! model. It locates `stream … endstream` blocks in the raw bytes, inflates
//! each one (falling back to the raw bytes when it is not zlib data), and
//! tokenizes the result for the literal-string text-show operators:
//!
//! | Operator | Handling |
//! |----------|----------|
//! | `(str) Tj` | append the string |
//! | `[(a) -20 (b)] TJ` | append every string, drop the spacing numbers |
//! | `(str) '` and `aw ac (str) "` | append the string, then a line break |
//!
//! Extractions are concatenated per stream in the order they occur, split
//! on line breaks, and trimmed; each non-empty line is a text unit.
//!
//! When no stream yields text, the whole file is scanned for parenthesized
//! word-like strings. When that also comes up empty the result is a single
//! [`UNPARSEABLE_NOTICE`] unit, so callers can show it to the user like any
//! other text. The raw extractor never fails.
//!
//! Encrypted files, cross-reference/object streams, hex strings, and
//! font-encoded (CID) text are not decoded.
//!
//! [`PdfExtractCrate`] delegates to the `pdf-extract` crate instead and is
//! selectable through [`PdfBackend`].

use std::borrow::Cow;
use std::io::Read;
use std::sync::LazyLock;

use flate2::read::ZlibDecoder;
use regex::Regex;
use serde::Deserialize;

use super::ExtractError;

/// Text unit emitted when nothing readable was found.
pub const UNPARSEABLE_NOTICE: &str =
    "(PDF content could not be parsed; it may be a scanned or image-only PDF)";

/// Cap on the inflated size of a single stream.
const MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

/// Stream body between the `stream` keyword's EOL and `endstream`.
static STREAM: LazyLock<regex::bytes::Regex> = LazyLock::new(|| {
    regex::bytes::Regex::new(r"(?s-u)stream\r?\n(.*?)endstream").unwrap()
});

/// One text-show operation. Group 1/2: literal string and its operator;
/// group 3: the body of a `TJ` array. The array body holds only literals and
/// non-bracket tokens, so an unrelated array such as a dash pattern cannot
/// open a span that runs into a later `TJ`.
static SHOW_OP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\(((?:\\(?s:.)|[^\\)])*)\)\s*(Tj|'|")|\[((?:\((?:\\(?s:.)|[^\\)])*\)|[^\[\]()])*)\]\s*(?i:TJ)"#,
    )
    .unwrap()
});

/// Literal strings inside a `TJ` array.
static ARRAY_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(((?:\\(?s:.)|[^\\)])*)\)").unwrap());

/// Last-resort candidates: any parenthesized run of two or more characters.
static PAREN_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]{2,})\)").unwrap());

/// Two consecutive ASCII word or CJK characters.
static WORDLIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9A-Za-z_\x{4e00}-\x{9fff}]{2,}").unwrap());

/// Turns PDF bytes into ordered text units.
///
/// Implementations fail only when the input cannot be read at all; they
/// return [`ExtractError::Container`] in that case.
pub trait PdfExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Which [`PdfExtractor`] handles `.pdf` files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdfBackend {
    /// [`RawPdfExtractor`].
    #[default]
    Raw,
    /// [`PdfExtractCrate`].
    PdfExtract,
}

impl PdfBackend {
    pub fn extractor(self) -> &'static dyn PdfExtractor {
        match self {
            PdfBackend::Raw => &RawPdfExtractor,
            PdfBackend::PdfExtract => &PdfExtractCrate,
        }
    }
}

/// Structural scanner; see the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPdfExtractor;

impl PdfExtractor for RawPdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let mut units = Vec::new();

        for (index, span) in stream_spans(bytes).enumerate() {
            let content = match inflate(span) {
                Some(inflated) => Cow::Owned(inflated),
                None => {
                    tracing::debug!(
                        stream = index,
                        len = span.len(),
                        "stream not inflatable, reading raw bytes"
                    );
                    Cow::Borrowed(span)
                }
            };
            let text = show_text(&latin1(&content));
            units.extend(text_lines(&text));
        }

        if units.is_empty() {
            tracing::debug!("no text-show operators found, scanning raw bytes");
            units = fallback_strings(&latin1(bytes));
        }

        if units.is_empty() {
            tracing::debug!("no extractable text in PDF");
            units.push(UNPARSEABLE_NOTICE.to_string());
        }

        Ok(units)
    }
}

/// Delegates to the `pdf-extract` crate. Fails on files it cannot parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractCrate;

impl PdfExtractor for PdfExtractCrate {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Container(format!("PDF extraction failed: {}", e)))?;
        let units = text_lines(&text);
        if units.is_empty() {
            return Ok(vec![UNPARSEABLE_NOTICE.to_string()]);
        }
        Ok(units)
    }
}

/// Stream bodies as slices of the original buffer, in file order.
fn stream_spans(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    STREAM
        .captures_iter(bytes)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_bytes())
}

/// Inflate zlib data. `None` when the data is not zlib or is corrupt.
fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_INFLATED_BYTES)
        .read_to_end(&mut out)
        .ok()?;
    Some(out)
}

/// One char per byte, so byte offsets and char offsets agree.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Concatenate every text-show operation in `content`, in order.
fn show_text(content: &str) -> String {
    let mut text = String::new();
    for caps in SHOW_OP.captures_iter(content) {
        if let Some(literal) = caps.get(1) {
            text.push_str(&unescape(literal.as_str()));
            if caps.get(2).is_some_and(|op| op.as_str() != "Tj") {
                text.push('\n');
            }
        } else if let Some(array) = caps.get(3) {
            for s in ARRAY_STRING.captures_iter(array.as_str()) {
                text.push_str(&unescape(&s[1]));
            }
        }
    }
    text
}

/// Resolve `\n \r \t \\ \( \)`. Other escapes are kept verbatim.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(c @ ('\\' | '(' | ')')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn text_lines(text: &str) -> Vec<String> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parenthesized strings that look like words and are not just control bytes.
fn fallback_strings(raw: &str) -> Vec<String> {
    PAREN_TEXT
        .captures_iter(raw)
        .filter_map(|caps| {
            let t = caps[1].trim();
            let only_control = t.chars().all(char::is_control);
            (!t.is_empty() && !only_control && WORDLIKE.is_match(t)).then(|| t.to_string())
        })
        .collect()
}
