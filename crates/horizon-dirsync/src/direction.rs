//! Text direction and the language classifier.
//!
//! [`classify`] maps a BCP 47 language tag to the direction its script is
//! written in. Only the primary subtag matters: `ar`, `ar-SA` and `AR-eg` all
//! classify the same way.
//!
//! ```
//! use horizon_dirsync::direction::{classify, TextDirection};
//!
//! assert_eq!(classify(Some("he-IL")), TextDirection::Rtl);
//! assert_eq!(classify(Some("en-GB")), TextDirection::Ltr);
//! assert_eq!(classify(None), TextDirection::Ltr);
//! ```

use std::fmt;

/// Primary language subtags treated as right-to-left.
///
/// `ha` (Hausa) and `uz` (Uzbek) are only right-to-left in some of their
/// scripts; they are classified as RTL regardless of any script subtag.
pub const RTL_LANGUAGES: &[&str] = &[
    "ar",  // Arabic
    "arc", // Aramaic
    "dv",  // Divehi
    "fa",  // Persian
    "ha",  // Hausa
    "he",  // Hebrew
    "khw", // Khowar
    "ks",  // Kashmiri
    "ku",  // Kurdish
    "ps",  // Pashto
    "sd",  // Sindhi
    "ur",  // Urdu
    "uz",  // Uzbek
    "yi",  // Yiddish
];

/// Visual direction of text and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDirection {
    /// Left-to-right (e.g., English, French, German)
    #[default]
    Ltr,
    /// Right-to-left (e.g., Arabic, Hebrew)
    Rtl,
}

impl TextDirection {
    /// The value written to the direction attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }

    /// Parse a direction attribute value (`"rtl"` or `"ltr"`, any case).
    pub fn from_attribute(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("rtl") {
            Some(TextDirection::Rtl)
        } else if value.eq_ignore_ascii_case("ltr") {
            Some(TextDirection::Ltr)
        } else {
            None
        }
    }

    /// Direction for a language tag. Same as [`classify`].
    pub fn for_language(code: Option<&str>) -> Self {
        classify(code)
    }

    /// Returns true if this is left-to-right direction.
    pub fn is_ltr(self) -> bool {
        matches!(self, TextDirection::Ltr)
    }

    /// Returns true if this is right-to-left direction.
    pub fn is_rtl(self) -> bool {
        matches!(self, TextDirection::Rtl)
    }
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased text before the first `-` of a language tag.
pub fn primary_subtag(code: &str) -> String {
    let primary = code.split('-').next().unwrap_or(code);
    primary.to_lowercase()
}

/// Classify a language tag. Absent or empty tags are left-to-right.
pub fn classify(code: Option<&str>) -> TextDirection {
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return TextDirection::Ltr;
    };
    let primary = primary_subtag(code);
    if RTL_LANGUAGES.contains(&primary.as_str()) {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_missing_are_ltr() {
        assert_eq!(classify(None), TextDirection::Ltr);
        assert_eq!(classify(Some("")), TextDirection::Ltr);
    }

    #[test]
    fn test_every_listed_language_is_rtl() {
        for code in RTL_LANGUAGES {
            assert_eq!(classify(Some(code)), TextDirection::Rtl, "{code}");
        }
    }

    #[test]
    fn test_case_and_region_are_ignored() {
        assert_eq!(classify(Some("AR")), TextDirection::Rtl);
        assert_eq!(classify(Some("ar-SA")), TextDirection::Rtl);
        assert_eq!(classify(Some("he-IL")), TextDirection::Rtl);
        assert_eq!(classify(Some("Fa-IR")), TextDirection::Rtl);
        assert_eq!(classify(Some("ku-Arab-IQ")), TextDirection::Rtl);
        assert_eq!(classify(Some("en-GB")), TextDirection::Ltr);
        assert_eq!(classify(Some("EN-us")), TextDirection::Ltr);
    }

    #[test]
    fn test_partial_subtags_do_not_match() {
        // "a" and "arb" share a prefix with "ar" but are different subtags.
        assert_eq!(classify(Some("a")), TextDirection::Ltr);
        assert_eq!(classify(Some("arb")), TextDirection::Ltr);
        assert_eq!(classify(Some("-ar")), TextDirection::Ltr);
    }

    #[test]
    fn test_only_hyphen_separates_subtags() {
        assert_eq!(primary_subtag("ar_SA"), "ar_sa");
        assert_eq!(classify(Some("ar_SA")), TextDirection::Ltr);
    }

    #[test]
    fn test_approximate_entries_are_kept() {
        assert_eq!(classify(Some("ha")), TextDirection::Rtl);
        assert_eq!(classify(Some("uz-Latn")), TextDirection::Rtl);
    }

    #[test]
    fn test_attribute_round_trip() {
        assert_eq!(TextDirection::Rtl.as_str(), "rtl");
        assert_eq!(TextDirection::from_attribute("RTL"), Some(TextDirection::Rtl));
        assert_eq!(TextDirection::from_attribute("ltr"), Some(TextDirection::Ltr));
        assert_eq!(TextDirection::from_attribute("auto"), None);
        assert_eq!(TextDirection::Ltr.to_string(), "ltr");
        assert!(TextDirection::default().is_ltr());
    }
}
