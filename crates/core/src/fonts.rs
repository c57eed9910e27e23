//! Font style resolution from font names.
//!
//! PDF fonts rarely say outright whether they are bold or italic; the
//! PostScript name usually does ("ABCDEF+Arial-BoldItalicMT"). Styles are
//! derived from those names, with structured descriptor flags OR-ed in when
//! the source provides them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Family used when nothing better is known.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Weight keywords in a resolved font's name.
static BOLD_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bold|heavy|black|extrabold|semibold|demi").unwrap());

/// Slant keywords in a resolved font's name.
static ITALIC_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)italic|oblique|slanted").unwrap());

/// Weight keywords in a bare resource name.
static BOLD_RESOURCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bold|heavy|black").unwrap());

/// Slant keywords in a bare resource name.
static ITALIC_RESOURCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)italic|oblique").unwrap());

/// Six-letter subset tag, e.g. `ABCDEF+`.
static SUBSET_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{6}\+").unwrap());

/// Vendor suffixes glued to a family name.
static FAMILY_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(MT|PS|PC|Std|Pro|LT)$").unwrap());

/// Style tails after a comma, e.g. `Arial,BoldItalic`.
static COMMA_STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),\s*(Bold|Italic|BoldItalic|Regular).*").unwrap());

/// Vendor and weight suffixes in an output family name.
static OUTPUT_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(MT|PS|PC|Std|Pro|LT|Regular)$").unwrap());

/// Characters that are unsafe in an output typeface name.
static UNSAFE_FAMILY_CHARS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9 \-]").unwrap());

/// What a document source knows about a font resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontInfo {
    /// Internal (PostScript) font name, possibly subset-tagged.
    pub name: String,

    /// Structured bold flag from the font descriptor, if set.
    pub bold: bool,

    /// Structured italic flag from the font descriptor, if set.
    pub italic: bool,
}

impl FontInfo {
    /// A font known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Lookup of font resources by the name used in the page's content.
pub trait FontResolver {
    /// Resolve a font resource, or `None` if it cannot be resolved.
    fn resolve(&self, resource: &str) -> Option<FontInfo>;
}

impl FontResolver for HashMap<String, FontInfo> {
    fn resolve(&self, resource: &str) -> Option<FontInfo> {
        self.get(resource).cloned()
    }
}

/// Resolved visual style of a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub family: String,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

/// Resolve the style for a font resource name.
pub fn resolve_font_style(fonts: &dyn FontResolver, resource: &str) -> FontStyle {
    match fonts.resolve(resource) {
        Some(info) => {
            let name = if info.name.is_empty() {
                resource
            } else {
                info.name.as_str()
            };
            FontStyle {
                bold: info.bold || BOLD_NAME_REGEX.is_match(name),
                italic: info.italic || ITALIC_NAME_REGEX.is_match(name),
                family: family_from_font_name(name).unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            }
        }
        None => FontStyle {
            bold: BOLD_RESOURCE_REGEX.is_match(resource),
            italic: ITALIC_RESOURCE_REGEX.is_match(resource),
            family: DEFAULT_FONT_FAMILY.to_string(),
        },
    }
}

/// Derive a family name from an internal font name.
///
/// `"ABCDEF+Arial-BoldMT"` → `"Arial"`, `"TimesNewRomanPSMT"` → `"TimesNewRomanPS"`.
/// Returns `None` when fewer than two characters survive.
pub fn family_from_font_name(name: &str) -> Option<String> {
    let untagged = SUBSET_TAG_REGEX.replace(name, "");
    let base = untagged
        .split(['-', ',', '_'])
        .next()
        .unwrap_or_default();
    let family = FAMILY_SUFFIX_REGEX.replace(base, "");
    let family = family.trim();

    (family.chars().count() > 1).then(|| family.to_string())
}

/// Make a family name safe for the output document's typeface attribute.
pub fn sanitize_font_family(name: &str) -> String {
    if name.chars().count() < 2 {
        return DEFAULT_FONT_FAMILY.to_string();
    }

    let cleaned = COMMA_STYLE_REGEX.replace(name, "");
    let cleaned = OUTPUT_SUFFIX_REGEX.replace(&cleaned, "");
    let cleaned = UNSAFE_FAMILY_CHARS_REGEX.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        DEFAULT_FONT_FAMILY.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts(entries: &[(&str, FontInfo)]) -> HashMap<String, FontInfo> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_resolved_font_name_styles() {
        let table = fonts(&[
            ("F1", FontInfo::named("ABCDEF+Arial-BoldItalicMT")),
            ("F2", FontInfo::named("Helvetica-Oblique")),
            ("F3", FontInfo::named("MyriadPro-Semibold")),
            ("F4", FontInfo::named("TimesNewRomanPSMT")),
        ]);

        let style = resolve_font_style(&table, "F1");
        assert!(style.bold);
        assert!(style.italic);
        assert_eq!(style.family, "Arial");

        let style = resolve_font_style(&table, "F2");
        assert!(!style.bold);
        assert!(style.italic);
        assert_eq!(style.family, "Helvetica");

        let style = resolve_font_style(&table, "F3");
        assert!(style.bold);
        assert_eq!(style.family, "Myriad");

        let style = resolve_font_style(&table, "F4");
        assert!(!style.bold && !style.italic);
        assert_eq!(style.family, "TimesNewRomanPS");
    }

    #[test]
    fn test_structured_flags_are_honored() {
        let table = fonts(&[(
            "F1",
            FontInfo {
                name: "XYZABC+Foo".to_string(),
                bold: true,
                italic: true,
            },
        )]);
        let style = resolve_font_style(&table, "F1");
        assert!(style.bold && style.italic);
        assert_eq!(style.family, "Foo");
    }

    #[test]
    fn test_unresolved_font_uses_resource_name() {
        let table = HashMap::new();
        let style = resolve_font_style(&table, "Helvetica-BoldOblique");
        assert!(style.bold);
        assert!(style.italic);
        assert_eq!(style.family, DEFAULT_FONT_FAMILY);

        // "Demi" is only recognized in resolved names.
        let style = resolve_font_style(&table, "F_Demi");
        assert!(!style.bold);

        assert_eq!(resolve_font_style(&table, "F9"), FontStyle::default());
    }

    #[test]
    fn test_short_family_falls_back() {
        assert_eq!(family_from_font_name("ABCDEF+X-Bold"), None);
        assert_eq!(family_from_font_name("Calibri"), Some("Calibri".to_string()));
        assert_eq!(family_from_font_name("Garamond,Bold"), Some("Garamond".to_string()));
        assert_eq!(family_from_font_name("Futura_Light"), Some("Futura".to_string()));
    }

    #[test]
    fn test_sanitize_font_family() {
        assert_eq!(sanitize_font_family("Arial, Bold"), "Arial");
        assert_eq!(sanitize_font_family("TimesNewRomanPS"), "TimesNewRoman");
        assert_eq!(sanitize_font_family("Segoe UI"), "Segoe UI");
        assert_eq!(sanitize_font_family("Open+Sans!"), "OpenSans");
        assert_eq!(sanitize_font_family("X"), DEFAULT_FONT_FAMILY);
        assert_eq!(sanitize_font_family("Regular"), DEFAULT_FONT_FAMILY);
    }
}
