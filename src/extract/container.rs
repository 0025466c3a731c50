//! ZIP container access for OOXML documents.

use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use super::{ExtractError, DEFAULT_MAX_ENTRY_BYTES};

/// Read-only view over a ZIP-based document (DOCX, XLSX).
///
/// Entries are decompressed lazily, one per [`entry`](Self::entry) call,
/// and each read is capped at a byte limit.
pub struct ContainerReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    max_entry_bytes: u64,
}

impl<'a> ContainerReader<'a> {
    /// Open `bytes` as a ZIP archive.
    pub fn open(bytes: &'a [u8]) -> Result<Self, ExtractError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Container(e.to_string()))?;
        Ok(Self {
            archive,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        })
    }

    pub fn with_entry_limit(mut self, max_entry_bytes: u64) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Entry names in central-directory order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read an entry as text. Returns `Ok(None)` when the entry is absent.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; OOXML parts are
    /// UTF-8 in practice and a stray byte should not cost the whole file.
    pub fn entry(&mut self, name: &str) -> Result<Option<String>, ExtractError> {
        let limit = self.max_entry_bytes;
        let file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(ExtractError::Container(format!("{}: {}", name, e))),
        };

        let mut out = Vec::new();
        file.take(limit + 1)
            .read_to_end(&mut out)
            .map_err(|e| ExtractError::Container(format!("{}: {}", name, e)))?;
        if out.len() as u64 > limit {
            return Err(ExtractError::Container(format!(
                "ZIP entry {} exceeds size limit ({} bytes)",
                name, limit
            )));
        }

        Ok(Some(String::from_utf8_lossy(&out).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            for (name, body) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_reads_present_entry() {
        let bytes = zip_with(&[("a/b.xml", "<x>hi</x>")]);
        let mut reader = ContainerReader::open(&bytes).unwrap();
        assert_eq!(reader.entry("a/b.xml").unwrap().as_deref(), Some("<x>hi</x>"));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let bytes = zip_with(&[("a.xml", "")]);
        let mut reader = ContainerReader::open(&bytes).unwrap();
        assert!(reader.entry("missing.xml").unwrap().is_none());
    }

    #[test]
    fn test_entry_names_in_archive_order() {
        let bytes = zip_with(&[("z.xml", ""), ("a.xml", "")]);
        let reader = ContainerReader::open(&bytes).unwrap();
        assert_eq!(reader.entry_names(), vec!["z.xml", "a.xml"]);
    }

    #[test]
    fn test_entry_limit_enforced() {
        let body = "x".repeat(64);
        let bytes = zip_with(&[("big.xml", body.as_str())]);
        let mut reader = ContainerReader::open(&bytes).unwrap().with_entry_limit(16);
        assert!(matches!(
            reader.entry("big.xml"),
            Err(ExtractError::Container(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            ContainerReader::open(b"plain text"),
            Err(ExtractError::Container(_))
        ));
    }
}
