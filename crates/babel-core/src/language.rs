use std::fmt;
use std::str::FromStr;

use icu_locale_core::LanguageIdentifier;
use serde::{Serialize, Serializer};

/// English names for the primary language subtags the prompts mention by name.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid language tag {input:?}: {reason}")]
pub struct LanguageTagError {
    pub input: String,
    pub reason: String,
}

/// A validated BCP 47 language tag in canonical form (`en-US`, `ja`, `zh-Hant-TW`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag {
    id: LanguageIdentifier,
}

impl LanguageTag {
    pub fn parse(input: &str) -> Result<Self, LanguageTagError> {
        let trimmed = input.trim();
        let fail = |reason: String| LanguageTagError {
            input: input.to_string(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(fail("empty".into()));
        }
        let id = LanguageIdentifier::try_from_str(trimmed).map_err(|err| fail(err.to_string()))?;
        // ISO 639 codes are two or three letters; longer primary subtags are reserved.
        let primary_len = id.language.as_str().len();
        if !(2..=3).contains(&primary_len) {
            return Err(fail(format!(
                "primary subtag {:?} is not an ISO 639 code",
                id.language.as_str()
            )));
        }
        Ok(Self { id })
    }

    /// Primary language subtag, e.g. `ja` for `ja-JP`.
    pub fn primary(&self) -> &str {
        self.id.language.as_str()
    }

    /// English display name used inside prompts. Falls back to the tag itself.
    pub fn display_name(&self) -> String {
        DISPLAY_NAMES
            .iter()
            .find(|(code, _)| *code == self.primary())
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl FromStr for LanguageTag {
    type Err = LanguageTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LanguageTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
