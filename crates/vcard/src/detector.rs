//! Guess which kind of device produced a vCard.

use crate::builder::VBuilder;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

static APPLE_SIGNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "X-PHONETIC-FIRST-NAME",
        "X-PHONETIC-MIDDLE-NAME",
        "X-PHONETIC-LAST-NAME",
        "X-ABADR",
        "X-ABUID",
    ]
    .into_iter()
    .collect()
});

static JAPANESE_MOBILE_SIGNS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["X-GNO", "X-GN", "X-REDUCTION"].into_iter().collect());

static WINDOWS_MOBILE_SIGNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "X-MICROSOFT-ASST_TEL",
        "X-MICROSOFT-ASSISTANT",
        "X-MICROSOFT-OFFICELOC",
    ]
    .into_iter()
    .collect()
});

// These appear before Japanese mobile signs such as X-GN, so FOMA wins
static FOMA_SIGNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "X-SD-VERN",
        "X-SD-FORMAT_VER",
        "X-SD-CATEGORIES",
        "X-SD-CLASS",
        "X-SD-DCREATED",
        "X-SD-DESCRIPTION",
    ]
    .into_iter()
    .collect()
});

const FOMA_CHARSET_SIGN: &str = "X-SD-CHAR_CODE";

/// Device family a vCard most likely came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// No sign found
    #[default]
    Unknown,
    /// Apple Address Book
    Apple,
    /// Japanese mobile phones
    JapaneseMobilePhone,
    /// Japanese FOMA phones, which nest vCards
    Foma,
    /// Japanese Windows Mobile
    WindowsMobileJp,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::Unknown => "unknown",
            SourceType::Apple => "apple",
            SourceType::JapaneseMobilePhone => "japanese_mobile_phone",
            SourceType::Foma => "foma",
            SourceType::WindowsMobileJp => "windows_mobile_jp",
        };
        write!(f, "{}", name)
    }
}

/// A [`VBuilder`] that only looks at property names to detect the source.
#[derive(Debug, Default)]
pub struct VCardSourceDetector {
    source_type: SourceType,
    need_specified_charset: bool,
    specified_charset: Option<String>,
}

impl VCardSourceDetector {
    /// Create a detector with nothing detected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detected source type.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Charset declared by the data itself, if any.
    pub fn specified_charset(&self) -> Option<&str> {
        self.specified_charset.as_deref()
    }

    /// Charset guessed from the detected source.
    ///
    /// Must be called after parsing. Returns `None` when nothing is known.
    pub fn estimated_charset(&self) -> Option<&str> {
        if let Some(charset) = self.specified_charset.as_deref() {
            return Some(charset);
        }
        match self.source_type {
            SourceType::WindowsMobileJp | SourceType::Foma | SourceType::JapaneseMobilePhone => {
                Some("SHIFT_JIS")
            }
            SourceType::Apple => Some("UTF-8"),
            SourceType::Unknown => None,
        }
    }
}

impl VBuilder for VCardSourceDetector {
    fn start_property(&mut self) {
        self.need_specified_charset = false;
    }

    fn property_name(&mut self, name: &str) {
        if name.eq_ignore_ascii_case(FOMA_CHARSET_SIGN) {
            self.source_type = SourceType::Foma;
            self.need_specified_charset = true;
            return;
        }
        if self.source_type != SourceType::Unknown {
            return;
        }

        self.source_type = if WINDOWS_MOBILE_SIGNS.contains(name) {
            SourceType::WindowsMobileJp
        } else if FOMA_SIGNS.contains(name) {
            SourceType::Foma
        } else if JAPANESE_MOBILE_SIGNS.contains(name) {
            SourceType::JapaneseMobilePhone
        } else if APPLE_SIGNS.contains(name) {
            SourceType::Apple
        } else {
            SourceType::Unknown
        };
    }

    fn property_values(&mut self, values: Option<Vec<String>>) {
        if !self.need_specified_charset {
            return;
        }
        if let Some(first) = values.and_then(|v| v.into_iter().next()) {
            self.specified_charset = Some(first);
        }
    }
}
