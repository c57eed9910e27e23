//! ToUnicode CMap parsing.
//!
//! Only the parts needed to turn character codes into text are read:
//! `codespacerange` (code width), `bfchar` and `bfrange` sections.

use std::collections::HashMap;

/// A character code to Unicode table from a font's `/ToUnicode` stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    mappings: HashMap<u32, String>,

    /// Bytes per character code, when the CMap declares a codespace.
    code_width: Option<usize>,
}

impl ToUnicodeMap {
    /// Parse CMap program bytes. Malformed entries are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut map = ToUnicodeMap::default();

        for section in sections(&text, "begincodespacerange", "endcodespacerange") {
            if let Some(first) = hex_tokens(section).first() {
                map.code_width = Some(first.len().div_ceil(2).max(1));
            }
        }
        for section in sections(&text, "beginbfchar", "endbfchar") {
            map.parse_bfchar(section);
        }
        for section in sections(&text, "beginbfrange", "endbfrange") {
            map.parse_bfrange(section);
        }

        log::debug!("Parsed ToUnicode CMap with {} mappings", map.mappings.len());
        map
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    /// Declared bytes per code, if any.
    pub fn code_width(&self) -> Option<usize> {
        self.code_width
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn parse_bfchar(&mut self, section: &str) {
        let tokens = hex_tokens(section);
        for pair in tokens.chunks_exact(2) {
            if let (Some(code), Some(text)) = (parse_code(pair[0]), decode_utf16be_hex(pair[1])) {
                self.mappings.insert(code, text);
            }
        }
    }

    fn parse_bfrange(&mut self, section: &str) {
        for line in section.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.find('[') {
                // <lo> <hi> [<dst0> <dst1> ...]
                Some(bracket) => {
                    let bounds = hex_tokens(&line[..bracket]);
                    let (Some(lo), Some(hi)) = (
                        bounds.first().and_then(|t| parse_code(t)),
                        bounds.get(1).and_then(|t| parse_code(t)),
                    ) else {
                        continue;
                    };
                    for (code, dst) in (lo..=hi).zip(hex_tokens(&line[bracket..])) {
                        if let Some(text) = decode_utf16be_hex(dst) {
                            self.mappings.insert(code, text);
                        }
                    }
                }
                // <lo> <hi> <dst>
                None => {
                    let tokens = hex_tokens(line);
                    let [lo, hi, dst, ..] = tokens.as_slice() else {
                        continue;
                    };
                    let (Some(lo), Some(hi), Some(start)) =
                        (parse_code(lo), parse_code(hi), decode_utf16be_units(dst))
                    else {
                        continue;
                    };
                    if hi < lo || hi - lo > 0xFFFF {
                        log::debug!("Skipping implausible bfrange <{:X}> <{:X}>", lo, hi);
                        continue;
                    }
                    for offset in 0..=(hi - lo) {
                        // The last UTF-16 unit of the destination is incremented.
                        let mut units = start.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        if let Ok(text) = String::from_utf16(&units) {
                            self.mappings.insert(lo + offset, text);
                        }
                    }
                }
            }
        }
    }
}

/// Bodies between every `begin` / `end` keyword pair.
fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let body = &rest[start + begin.len()..];
        match body.find(end) {
            Some(stop) => {
                out.push(&body[..stop]);
                rest = &body[stop + end.len()..];
            }
            None => break,
        }
    }
    out
}

/// Every `<hex>` token in order, without the angle brackets.
fn hex_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) => {
                tokens.push(after[..close].trim());
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    tokens
}

fn parse_code(hex: &str) -> Option<u32> {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn decode_utf16be_units(hex: &str) -> Option<Vec<u16>> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let padded = if hex.len() % 4 == 2 {
        format!("00{}", hex)
    } else {
        hex
    };
    if padded.is_empty() || padded.len() % 4 != 0 || !padded.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..padded.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&padded[i..i + 4], 16).ok())
        .collect()
}

fn decode_utf16be_hex(hex: &str) -> Option<String> {
    decode_utf16be_units(hex).and_then(|units| String::from_utf16(&units).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
3 beginbfchar
<0003> <0020>
<0011> <0048>
<0046> <FB01>
endbfchar
2 beginbfrange
<0020> <0022> <0061>
<0030> <0032> [<0058> <0059> <005A>]
endbfrange
endcmap
"#;

    #[test]
    fn test_bfchar_and_bfrange() {
        let map = ToUnicodeMap::parse(SAMPLE.as_bytes());
        assert_eq!(map.code_width(), Some(2));
        assert_eq!(map.lookup(0x03), Some(" "));
        assert_eq!(map.lookup(0x11), Some("H"));
        assert_eq!(map.lookup(0x46), Some("\u{FB01}"));
        assert_eq!(map.lookup(0x20), Some("a"));
        assert_eq!(map.lookup(0x22), Some("c"));
        assert_eq!(map.lookup(0x31), Some("Y"));
        assert_eq!(map.lookup(0x99), None);
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn test_single_byte_codespace_and_ligature_destination() {
        let data = b"begincodespacerange <00> <FF> endcodespacerange\n\
                     1 beginbfchar <1F> <00660066> endbfchar";
        let map = ToUnicodeMap::parse(data);
        assert_eq!(map.code_width(), Some(1));
        assert_eq!(map.lookup(0x1F), Some("ff"));
    }

    #[test]
    fn test_surrogate_pair_destination() {
        let map = ToUnicodeMap::parse(b"beginbfchar <01> <D835DC00> endbfchar");
        assert_eq!(map.lookup(1), Some("\u{1D400}"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let map = ToUnicodeMap::parse(b"beginbfchar <zz> <0041> <02> <0042> endbfchar beginbfrange <10> <05> <0041> endbfrange");
        assert_eq!(map.lookup(2), Some("B"));
        assert_eq!(map.len(), 1);
        assert!(ToUnicodeMap::parse(b"").is_empty());
    }

    #[test]
    fn test_non_hex_bytes_do_not_panic() {
        let map = ToUnicodeMap::parse(b"beginbfchar <01> <00\xFF000> <+2> <0043> <03> <0044> endbfchar");
        assert_eq!(map.lookup(1), None);
        assert_eq!(map.lookup(2), None);
        assert_eq!(map.lookup(3), Some("D"));

        let map = ToUnicodeMap::parse(b"beginbfrange\n<10> <12> <\xC3\xA9\xC3\xA9>\n<20> <21> [<00\xE90> <0041>]\nendbfrange");
        assert_eq!(map.lookup(0x10), None);
        assert_eq!(map.lookup(0x20), None);
        assert_eq!(map.lookup(0x21), Some("A"));
    }
}
