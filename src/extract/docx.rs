//! DOCX paragraph extraction.
//!
//! Reads `word/document.xml`, splits it on paragraph ends (`</w:p>`), and
//! joins every text run (`<w:t>`) inside a paragraph with no separator, so a
//! word split across runs (`"Hel"` + `"lo"`) comes back whole. Run
//! properties and all other markup are ignored.

use std::sync::LazyLock;

use regex::Regex;

use super::{decode_entities, ContainerReader, ExtractError};

const DOCUMENT_ENTRY: &str = "word/document.xml";
const PARAGRAPH_END: &str = "</w:p>";

/// `<w:t>` or `<w:t xml:space="preserve">`, but not `<w:tab/>` or `<w:tbl>`.
static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").unwrap());

/// Extract one text unit per non-empty paragraph.
pub fn extract(bytes: &[u8], max_entry_bytes: u64) -> Result<Vec<String>, ExtractError> {
    let mut container = ContainerReader::open(bytes)?.with_entry_limit(max_entry_bytes);
    let xml = container
        .entry(DOCUMENT_ENTRY)?
        .ok_or_else(|| ExtractError::Format(format!("{} not found", DOCUMENT_ENTRY)))?;
    Ok(paragraphs(&xml))
}

/// Paragraph texts from a document body, in document order.
pub fn paragraphs(xml: &str) -> Vec<String> {
    xml.split(PARAGRAPH_END)
        .filter_map(|segment| {
            let text: String = TEXT_RUN
                .captures_iter(segment)
                .map(|run| decode_entities(&run[1]).into_owned())
                .collect();
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DEFAULT_MAX_ENTRY_BYTES;
    use std::io::{Cursor, Write};

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(DOCUMENT_ENTRY, zip::write::SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_runs_concatenate_within_paragraph() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Hel</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>lo</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Wor</w:t></w:r><w:r><w:t>ld</w:t></w:r></w:p>",
        );
        assert_eq!(extract(&bytes, DEFAULT_MAX_ENTRY_BYTES).unwrap(), vec!["Hello", "World"]);
    }

    #[test]
    fn test_empty_paragraphs_skipped() {
        let xml = "<w:p></w:p><w:p><w:r><w:t>   </w:t></w:r></w:p><w:p><w:r><w:t>kept</w:t></w:r></w:p>";
        assert_eq!(paragraphs(xml), vec!["kept"]);
    }

    #[test]
    fn test_preserve_space_attribute_and_trim() {
        let xml = "<w:p><w:r><w:t xml:space=\"preserve\"> padded </w:t></w:r><w:r><w:t>end</w:t></w:r></w:p>";
        assert_eq!(paragraphs(xml), vec!["padded end"]);
    }

    #[test]
    fn test_tab_and_table_tags_are_not_runs() {
        let xml = "<w:tbl><w:tr><w:tc><w:p><w:r><w:tab/><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        assert_eq!(paragraphs(xml), vec!["cell"]);
    }

    #[test]
    fn test_entities_decoded() {
        let xml = "<w:p><w:r><w:t>R&amp;D &lt;team&gt;</w:t></w:r></w:p>";
        assert_eq!(paragraphs(xml), vec!["R&D <team>"]);
    }

    #[test]
    fn test_missing_document_is_format_error() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<w:styles/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract(&buf, 1024).unwrap_err();
        assert!(matches!(err, ExtractError::Format(_)));
    }
}
