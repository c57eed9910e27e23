//! Text normalization for glyph runs.
//!
//! PDF text layers often carry presentation forms (ligatures, full-width
//! letters), no-break spaces and stray control characters. Output text boxes
//! should hold plain, editable text instead.

use unicode_normalization::UnicodeNormalization;

/// Space-like characters that should become a plain space.
const SPACE_CHARS: &[char] = &['\u{00A0}', '\u{2007}', '\u{202F}', '\t'];

/// Normalize the text of one source text item.
///
/// - Applies NFKC, so `"ﬁ"` becomes `"fi"`
/// - Maps no-break and tab spaces to a plain space
/// - Drops other control and zero-width characters
pub fn normalize_glyph_text(text: &str) -> String {
    text.nfkc()
        .filter_map(|c| {
            if SPACE_CHARS.contains(&c) {
                Some(' ')
            } else if c.is_control() || is_zero_width(c) {
                None
            } else {
                Some(c)
            }
        })
        .collect()
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\u{00AD}')
}
