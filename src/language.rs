//! Script-ratio language detection.
//!
//! The journal speaks English and Hindi. Text counts as Hindi when more than
//! 20% of its characters fall in the Devanagari block (U+0900–U+097F).

use serde::{Deserialize, Serialize};

/// Share of Devanagari characters above which text is classified as Hindi.
const DEVANAGARI_THRESHOLD: f64 = 0.2;

/// A supported conversation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Primary language.
    #[default]
    English,
    /// Secondary language, written in Devanagari.
    Hindi,
}

impl Language {
    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" | "english" => Ok(Self::English),
            "hi" | "hindi" => Ok(Self::Hindi),
            _ => Err(format!("unsupported language: {s}")),
        }
    }
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

/// Classify `text` as [`Language::Hindi`] or [`Language::English`].
///
/// Empty input is English.
pub fn detect_language(text: &str) -> Language {
    let total = text.chars().count();
    if total == 0 {
        return Language::English;
    }

    let devanagari = text.chars().filter(|c| is_devanagari(*c)).count();
    if devanagari as f64 > total as f64 * DEVANAGARI_THRESHOLD {
        Language::Hindi
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devanagari_text_is_hindi() {
        assert_eq!(detect_language("यह एक परीक्षण है"), Language::Hindi);
    }

    #[test]
    fn latin_text_is_english() {
        assert_eq!(detect_language("this is a test"), Language::English);
    }

    #[test]
    fn empty_text_is_english() {
        assert_eq!(detect_language(""), Language::English);
    }

    #[test]
    fn threshold_is_strictly_greater_than_twenty_percent() {
        // 1 of 5 characters = exactly 20% -> English
        assert_eq!(detect_language("कabcd"), Language::English);
        // 2 of 5 -> Hindi
        assert_eq!(detect_language("कखabc"), Language::Hindi);
    }

    #[test]
    fn mixed_hinglish_with_mostly_hindi_words() {
        assert_eq!(detect_language("save करो"), Language::Hindi);
    }

    #[test]
    fn parse_and_display_round_trip() {
        assert_eq!("hi".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(Language::English.to_string(), "en");
        assert!("fr".parse::<Language>().is_err());
    }
}
