//! Font dictionaries: glyph decoding, widths and style flags.

use crate::cmap::ToUnicodeMap;
use crate::objects::{get, get_array, get_dict, get_name, get_number, number, resolve, stream_bytes};
use lopdf::{Dictionary, Document, Object};
use pdf2ppt_core::FontInfo;
use std::collections::HashMap;

/// FontDescriptor `/Flags` bit for italic faces.
const FLAG_ITALIC: i64 = 1 << 6;

/// FontDescriptor `/Flags` bit asking for bold rendering.
const FLAG_FORCE_BOLD: i64 = 1 << 18;

/// Width of a simple-font glyph without a declared width (1/1000 em).
const DEFAULT_SIMPLE_WIDTH: f64 = 500.0;

/// `/DW` default for composite fonts (1/1000 em).
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Windows-1252 characters for bytes 0x80-0x9F.
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Map one WinAnsiEncoding byte to its character.
pub fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// One decoded character code of a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub text: String,

    /// Horizontal advance in glyph space (1/1000 of the font size).
    pub width: f64,

    /// Single-byte code 32, which word spacing applies to.
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
enum Widths {
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        missing: f64,
    },
    Composite {
        widths: HashMap<u32, f64>,
        default: f64,
    },
}

/// A font resource prepared for decoding shown strings.
#[derive(Debug, Clone)]
pub struct PdfFont {
    pub info: FontInfo,
    code_width: usize,
    composite: bool,
    to_unicode: Option<ToUnicodeMap>,
    widths: Widths,
}

impl PdfFont {
    /// Read a font dictionary.
    pub fn load(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = get_name(doc, dict, b"BaseFont").unwrap_or_default();
        let composite = get_name(doc, dict, b"Subtype").as_deref() == Some("Type0");

        let descendant = if composite {
            get_array(doc, dict, b"DescendantFonts")
                .and_then(|fonts| fonts.first())
                .and_then(|obj| resolve(doc, obj).as_dict().ok())
        } else {
            None
        };

        let descriptor = descendant
            .and_then(|d| get_dict(doc, d, b"FontDescriptor"))
            .or_else(|| get_dict(doc, dict, b"FontDescriptor"));
        let flags = descriptor
            .and_then(|d| get(doc, d, b"Flags"))
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        let weight = descriptor.and_then(|d| get_number(doc, d, b"FontWeight"));

        let to_unicode = get(doc, dict, b"ToUnicode")
            .and_then(|obj| obj.as_stream().ok())
            .and_then(|stream| match stream_bytes(stream) {
                Ok(bytes) => Some(ToUnicodeMap::parse(&bytes)),
                Err(e) => {
                    log::warn!("Unreadable ToUnicode CMap for font {}: {}", base_font, e);
                    None
                }
            });

        let widths = match descendant {
            Some(cid_font) => Widths::Composite {
                widths: get_array(doc, cid_font, b"W")
                    .map(|w| parse_cid_widths(doc, w))
                    .unwrap_or_default(),
                default: get_number(doc, cid_font, b"DW").unwrap_or(DEFAULT_CID_WIDTH),
            },
            None => Widths::Simple {
                first_char: get_number(doc, dict, b"FirstChar").unwrap_or(0.0).max(0.0) as u32,
                widths: get_array(doc, dict, b"Widths")
                    .map(|w| w.iter().map(|o| number(resolve(doc, o)).unwrap_or(0.0)).collect())
                    .unwrap_or_default(),
                missing: descriptor
                    .and_then(|d| get_number(doc, d, b"MissingWidth"))
                    .filter(|w| *w > 0.0)
                    .unwrap_or(DEFAULT_SIMPLE_WIDTH),
            },
        };

        let code_width = if composite {
            to_unicode
                .as_ref()
                .and_then(ToUnicodeMap::code_width)
                .unwrap_or(2)
        } else {
            1
        };

        Self {
            info: FontInfo {
                name: base_font,
                bold: flags & FLAG_FORCE_BOLD != 0 || weight.is_some_and(|w| w >= 700.0),
                italic: flags & FLAG_ITALIC != 0,
            },
            code_width,
            composite,
            to_unicode,
            widths,
        }
    }

    /// A stand-in for a font resource that could not be found.
    pub fn missing(resource: &str) -> Self {
        Self {
            info: FontInfo::named(resource),
            code_width: 1,
            composite: false,
            to_unicode: None,
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: DEFAULT_SIMPLE_WIDTH,
            },
        }
    }

    /// Split a shown string into character codes and decode each one.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        bytes
            .chunks(self.code_width)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                Glyph {
                    code,
                    text: self.unicode(code),
                    width: self.width(code),
                    is_word_space: chunk.len() == 1 && code == 32,
                }
            })
            .collect()
    }

    fn unicode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.lookup(code)) {
            return text.to_string();
        }
        if self.composite {
            char::from_u32(code).unwrap_or('\u{FFFD}').to_string()
        } else {
            win_ansi_char(code as u8).to_string()
        }
    }

    fn width(&self, code: u32) -> f64 {
        match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            Widths::Composite { widths, default } => widths.get(&code).copied().unwrap_or(*default),
        }
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
fn parse_cid_widths(doc: &Document, items: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(resolve(doc, &items[i])) else {
            break;
        };
        let first = first as u32;
        match items.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    let code = u32::try_from(offset).ok().and_then(|o| first.checked_add(o));
                    if let (Some(code), Some(w)) = (code, number(resolve(doc, w))) {
                        widths.insert(code, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (
                    number(last),
                    items.get(i + 2).and_then(|o| number(resolve(doc, o))),
                ) else {
                    break;
                };
                for code in first..=(last as u32).min(first.saturating_add(0xFFFF)) {
                    widths.insert(code, w);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi_char(b'A'), 'A');
        assert_eq!(win_ansi_char(0x93), '\u{201C}');
        assert_eq!(win_ansi_char(0x80), '\u{20AC}');
        assert_eq!(win_ansi_char(0xE9), '\u{00E9}');
    }

    #[test]
    fn test_simple_font_widths_and_flags() {
        let mut doc = Document::with_version("1.5");
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Flags" => FLAG_ITALIC | FLAG_FORCE_BOLD,
            "MissingWidth" => 250,
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+Georgia",
            "FirstChar" => 65,
            "Widths" => vec![600.into(), 700.into()],
            "FontDescriptor" => descriptor,
        };

        let font = PdfFont::load(&doc, &font);
        assert_eq!(font.info.name, "ABCDEF+Georgia");
        assert!(font.info.bold && font.info.italic);

        let glyphs = font.decode(b"AB Z");
        let widths: Vec<f64> = glyphs.iter().map(|g| g.width).collect();
        assert_eq!(widths, vec![600.0, 700.0, 250.0, 250.0]);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(text, "AB Z");
        assert!(glyphs[2].is_word_space);
        assert!(!glyphs[0].is_word_space);
    }

    #[test]
    fn test_composite_font_with_to_unicode() {
        let mut doc = Document::with_version("1.5");
        let cmap = doc.add_object(Stream::new(
            dictionary! {},
            b"1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
              2 beginbfchar <0024> <0048> <0025> <0069> endbfchar"
                .to_vec(),
        ));
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "Calibri-Bold",
            "DW" => 1000,
            "W" => vec![
                36.into(),
                Object::Array(vec![480.into(), 230.into()]),
                100.into(),
                110.into(),
                300.into(),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Calibri-Bold",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![cid_font.into()],
            "ToUnicode" => cmap,
        };

        let font = PdfFont::load(&doc, &font);
        let glyphs = font.decode(&[0x00, 0x24, 0x00, 0x25, 0x00, 0x6E, 0x00, 0x05]);
        let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(&text[..2], "Hi");
        let widths: Vec<f64> = glyphs.iter().map(|g| g.width).collect();
        assert_eq!(widths, vec![480.0, 230.0, 300.0, 1000.0]);
        assert!(glyphs.iter().all(|g| !g.is_word_space));
    }

    #[test]
    fn test_composite_without_to_unicode_reads_utf16() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "SimSun",
            "DescendantFonts" => vec![dictionary! { "Subtype" => "CIDFontType0" }.into()],
        };
        let font = PdfFont::load(&doc, &font);
        let text: String = font
            .decode(&[0x4E, 0x2D, 0x65, 0x87])
            .iter()
            .map(|g| g.text.clone())
            .collect();
        assert_eq!(text, "中文");
    }

    #[test]
    fn test_cid_widths_near_code_limit() {
        let doc = Document::with_version("1.5");
        let max = u32::MAX as i64;
        let items = vec![
            Object::Integer(max - 1),
            Object::Array(vec![Object::Integer(100), Object::Integer(200), Object::Integer(300)]),
            Object::Integer(max - 1),
            Object::Integer(max),
            Object::Integer(400),
            Object::Integer(5),
            Object::Array(vec![Object::Integer(700)]),
        ];

        let widths = parse_cid_widths(&doc, &items);
        assert_eq!(widths[&(u32::MAX - 1)], 400.0);
        assert_eq!(widths[&u32::MAX], 400.0);
        assert_eq!(widths[&5], 700.0);
        assert_eq!(widths.len(), 3);
    }

    #[test]
    fn test_missing_font_uses_defaults() {
        let font = PdfFont::missing("F9");
        assert_eq!(font.info, FontInfo::named("F9"));
        let glyphs = font.decode(b"ab");
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].width, DEFAULT_SIMPLE_WIDTH);
    }
}
