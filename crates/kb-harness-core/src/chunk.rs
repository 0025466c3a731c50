//! Line-packing text chunker.
//!
//! Packs ordered text units (paragraphs, spreadsheet rows, lines) into
//! chunks of at most `max_len` characters. Units are never split: a unit
//! longer than the limit becomes a chunk of its own, so no text is lost.
//!
//! # Algorithm
//!
//! 1. Keep an accumulator of units, each followed by `\n`.
//! 2. Before appending a unit, check whether the accumulator plus the unit
//!    plus its line break would exceed `max_len`.
//! 3. If it would and the accumulator is non-empty, flush the accumulator
//!    as a chunk and start over with the current unit.
//! 4. After the last unit, flush whatever remains.
//!
//! A flushed chunk drops the final `\n` of its last unit, so chunk text is
//! its units joined by line breaks.
//!
//! Lengths are counted in Unicode scalar values, not bytes.
//!
//! # Example
//!
//! ```rust
//! use kb_harness_core::chunk::chunk_units;
//!
//! let chunks = chunk_units(&["alpha", "beta", "gamma"], 12);
//! assert_eq!(chunks, vec!["alpha\nbeta", "gamma"]);
//! ```

/// Default chunk limit, in characters.
pub const DEFAULT_MAX_LEN: usize = 500;

/// Pack `units` into chunks of at most `max_len` characters.
///
/// # Guarantees
///
/// - Chunks appear in source order and each unit lands in exactly one chunk.
/// - Every chunk is at most `max_len` characters, except a chunk holding a
///   single unit that is itself longer than `max_len`; that chunk equals the
///   unit exactly.
/// - Empty input yields no chunks.
pub fn chunk_units<S: AsRef<str>>(units: &[S], max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for unit in units {
        let unit = unit.as_ref();
        let unit_len = unit.chars().count();

        if buf_len + unit_len + 1 > max_len && !buf.is_empty() {
            chunks.push(flush(&mut buf));
            buf_len = 0;
        }

        buf.push_str(unit);
        buf.push('\n');
        buf_len += unit_len + 1;
    }

    if !buf.is_empty() {
        chunks.push(flush(&mut buf));
    }

    chunks
}

fn flush(buf: &mut String) -> String {
    let mut chunk = std::mem::take(buf);
    chunk.pop();
    chunk
}
