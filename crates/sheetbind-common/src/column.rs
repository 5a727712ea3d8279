//! Column label codec.
//!
//! Spreadsheet columns are labelled in bijective base-26: there is no zero
//! symbol, so `A` is 1, `Z` is 26 and `AA` is 27. Row and column indices are
//! 1-based throughout.

/// Convert a 1-based column index into its alphabetic label.
///
/// Returns an empty string for `0`, which has no label.
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        buf.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Convert an alphabetic label back into its 1-based column index.
///
/// Lowercase letters are accepted. Returns `None` for empty input, any
/// non-letter, or a label that overflows `u32`.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let val = (ch.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col.checked_mul(26)?.checked_add(val)?;
    }
    Some(col)
}

/// Compose a cell address such as `A4` from a row and a column index.
pub fn cell_address(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row)
}

/// Column label of a cell reference: the leading letters of `B12` are `B`.
///
/// Absolute markers (`$`) are ignored.
pub fn column_label(reference: &str) -> &str {
    let trimmed = reference.trim_start_matches('$');
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Split a cell reference into its column index and row index.
pub fn parse_cell_address(reference: &str) -> Option<(u32, u32)> {
    let label = column_label(reference);
    let col = letters_to_column(label)?;
    let rest = reference.trim_start_matches('$')[label.len()..].trim_start_matches('$');
    let row = rest.parse::<u32>().ok().filter(|r| *r > 0)?;
    Some((row, col))
}
