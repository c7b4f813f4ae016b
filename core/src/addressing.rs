//! Spreadsheet column addressing.
//!
//! Columns use bijective base-26: letters A-Z map to digits 1-26 with no
//! zero digit, so 1 is "A", 26 is "Z", 27 is "AA", 28 is "AB".

/// Convert a 1-based column index to its letter label.
/// Returns `None` for 0.
pub fn column_to_letter(mut n: u32) -> Option<String> {
    if n == 0 {
        return None;
    }

    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();

    // Only ASCII uppercase bytes are pushed above.
    Some(String::from_utf8(letters).unwrap_or_default())
}

/// Parse an uppercase letter label into its 1-based column index.
/// Returns `None` for empty input, non A-Z characters, or overflow.
pub fn letter_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add((ch - b'A' + 1) as u32)?;
    }
    Some(col)
}
