//! XLSX row extraction.
//!
//! Resolves the shared-string table, then walks every worksheet in sheet
//! number order. Each sheet is split on row ends (`</row>`) and each row on
//! cell ends (`</c>`). Shared-string cells (`t="s"`) are looked up by index,
//! inline-string cells read from `<is>`, everything else uses the literal
//! `<v>` value. The non-empty values of a row are joined with `" | "` to
//! form one text unit.

use std::sync::LazyLock;

use regex::Regex;

use super::{decode_entities, ContainerReader, ExtractError};

const SHARED_STRINGS_ENTRY: &str = "xl/sharedStrings.xml";

/// Separator between the cell values of a row.
pub const CELL_SEPARATOR: &str = " | ";

static WORKSHEET_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^xl/worksheets/sheet(\d+)\.xml$").unwrap());
/// A `<si>` item; self-closing items come first so they never open a span.
static STRING_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<si\b[^>]*/>|<si\b[^>]*>(.*?)</si>").unwrap()
});
/// Phonetic (furigana) runs and their properties, which are not cell text.
static PHONETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)<rPh\b[^>]*>.*?</rPh>",
        r"|<phoneticPr\b[^>]*/>",
        r"|<phoneticPr\b[^>]*>.*?</phoneticPr>",
    ))
    .unwrap()
});
static TEXT_NODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>").unwrap());
static CELL_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<c(?:\s[^>]*)?>").unwrap());
static SHARED_FLAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\st="s""#).unwrap());
static VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<v>(.*?)</v>").unwrap());
static INLINE_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<is>(.*?)</is>").unwrap());

/// Extract one text unit per non-empty row across all worksheets.
///
/// A missing shared-string table is treated as empty, not as an error.
pub fn extract(bytes: &[u8], max_entry_bytes: u64) -> Result<Vec<String>, ExtractError> {
    let mut container = ContainerReader::open(bytes)?.with_entry_limit(max_entry_bytes);

    let shared = container
        .entry(SHARED_STRINGS_ENTRY)?
        .map(|xml| shared_strings(&xml))
        .unwrap_or_default();

    let mut units = Vec::new();
    for name in worksheet_names(&container.entry_names()) {
        if let Some(xml) = container.entry(&name)? {
            units.extend(sheet_rows(&xml, &shared));
        }
    }
    Ok(units)
}

/// Worksheet entries sorted by sheet number (`sheet2` before `sheet10`).
fn worksheet_names(entries: &[String]) -> Vec<String> {
    let mut sheets: Vec<(u32, String)> = entries
        .iter()
        .filter_map(|name| {
            let caps = WORKSHEET_ENTRY.captures(name)?;
            let number = caps[1].parse::<u32>().unwrap_or(u32::MAX);
            Some((number, name.clone()))
        })
        .collect();
    sheets.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    sheets.into_iter().map(|(_, name)| name).collect()
}

/// Shared-string table in index order.
///
/// Each `<si>` is one entry, including an empty self-closing `<si/>`, so
/// indices stay aligned. Rich-text items spread over several `<r><t>` runs
/// are concatenated.
pub fn shared_strings(xml: &str) -> Vec<String> {
    STRING_ITEM
        .captures_iter(xml)
        .map(|item| item.get(1).map(|body| item_text(body.as_str())).unwrap_or_default())
        .collect()
}

/// Visible text of a string item: its `<t>` nodes minus phonetic runs.
fn item_text(body: &str) -> String {
    let visible = PHONETIC.replace_all(body, "");
    TEXT_NODE
        .captures_iter(&visible)
        .map(|t| decode_entities(&t[1]).into_owned())
        .collect()
}

/// Row texts of one worksheet, in sheet order.
pub fn sheet_rows(xml: &str, shared: &[String]) -> Vec<String> {
    xml.split("</row>")
        .filter_map(|row| {
            let values: Vec<String> = row
                .split("</c>")
                .filter_map(|segment| cell_value(segment, shared))
                .filter(|value| !value.is_empty())
                .collect();
            (!values.is_empty()).then(|| values.join(CELL_SEPARATOR))
        })
        .collect()
}

/// Value of the cell whose end tag closed `segment`.
///
/// The segment may start with earlier self-closing (empty) cells, so only
/// the last `<c ...>` opening tag belongs to this cell.
fn cell_value(segment: &str, shared: &[String]) -> Option<String> {
    let open = CELL_OPEN.find_iter(segment).last()?;
    let body = &segment[open.end()..];

    if let Some(value) = VALUE.captures(body) {
        let raw = &value[1];
        if SHARED_FLAG.is_match(open.as_str()) {
            let resolved = raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .cloned()
                .unwrap_or_default();
            return Some(resolved);
        }
        return Some(decode_entities(raw).into_owned());
    }

    INLINE_STRING
        .captures(body)
        .map(|inline| item_text(&inline[1]))
}
