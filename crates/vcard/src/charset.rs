//! Character set conversion for vCard text.
//!
//! vCards in the wild declare their charset through the `CHARSET` parameter or
//! implicitly through the producing device. Only the Unicode encodings and the
//! single-byte Latin sets are converted here; other labels are reported as
//! unsupported and callers fall back to UTF-8.

use crate::{Result, VCardError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported character sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Charset {
    /// UTF-8 (default)
    #[default]
    Utf8,
    /// 7-bit US-ASCII
    UsAscii,
    /// ISO-8859-1 (Latin-1)
    Iso8859_1,
    /// UTF-16 big endian
    Utf16Be,
    /// UTF-16 little endian
    Utf16Le,
}

impl Charset {
    /// Look up a charset by its label, ignoring case.
    ///
    /// # Arguments
    /// * `label` - Charset name such as `UTF-8`, `latin1` or `US-ASCII`
    ///
    /// # Returns
    /// The charset, or `None` when the label is unknown
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" | "unicode-1-1-utf-8" => Some(Charset::Utf8),
            "us-ascii" | "ascii" | "us" | "iso646-us" | "ansi_x3.4-1968" => Some(Charset::UsAscii),
            "iso-8859-1" | "iso8859-1" | "iso8859_1" | "iso_8859-1" | "latin1" | "l1"
            | "cp819" => Some(Charset::Iso8859_1),
            "utf-16be" | "utf16be" | "utf-16" | "utf16" => Some(Charset::Utf16Be),
            "utf-16le" | "utf16le" => Some(Charset::Utf16Le),
            _ => None,
        }
    }

    /// Canonical label of this charset.
    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
        }
    }

    /// Decode bytes into a string.
    ///
    /// # Returns
    /// The decoded text, or `VCardError::Charset` when the bytes are not valid
    /// in this charset
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| VCardError::Charset(format!("invalid UTF-8: {}", e))),
            Charset::UsAscii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(VCardError::Charset(format!(
                        "byte 0x{:02X} at offset {} is not US-ASCII",
                        bytes[pos], pos
                    )));
                }
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            Charset::Iso8859_1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf16Be | Charset::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(VCardError::Charset(format!(
                        "odd byte length {} for {}",
                        bytes.len(),
                        self.label()
                    )));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| match self {
                        Charset::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                        _ => u16::from_be_bytes([pair[0], pair[1]]),
                    })
                    .collect();
                String::from_utf16(&units)
                    .map_err(|e| VCardError::Charset(format!("invalid {}: {}", self.label(), e)))
            }
        }
    }

    /// Decode bytes, replacing anything invalid.
    ///
    /// Falls back to lossy UTF-8 when strict decoding fails.
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        match self.decode(bytes) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Encode a string into bytes.
    ///
    /// Characters the charset cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::UsAscii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Charset::Iso8859_1 => text
                .chars()
                .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
                .collect(),
            Charset::Utf16Be => text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect(),
            Charset::Utf16Le => text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Charset {
    type Err = VCardError;

    fn from_str(s: &str) -> Result<Self> {
        Charset::from_label(s)
            .ok_or_else(|| VCardError::Charset(format!("unsupported charset \"{}\"", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_aliases() {
        assert_eq!(Charset::from_label("utf-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_label("UTF8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_label("Latin1"), Some(Charset::Iso8859_1));
        assert_eq!(Charset::from_label("ascii"), Some(Charset::UsAscii));
        assert_eq!(Charset::from_label("SHIFT_JIS"), None);
    }

    #[test]
    fn test_latin1_decode() {
        assert_eq!(Charset::Iso8859_1.decode(&[0x63, 0x61, 0x66, 0xE9]).unwrap(), "café");
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        assert!(Charset::UsAscii.decode(&[0x41, 0xE9]).is_err());
        assert_eq!(Charset::UsAscii.decode(b"ok").unwrap(), "ok");
    }

    #[test]
    fn test_utf16() {
        let bytes = Charset::Utf16Le.encode("hé");
        assert_eq!(bytes, vec![0x68, 0x00, 0xE9, 0x00]);
        assert_eq!(Charset::Utf16Le.decode(&bytes).unwrap(), "hé");
        assert!(Charset::Utf16Be.decode(&[0x00]).is_err());
    }

    #[test]
    fn test_encode_unmappable() {
        assert_eq!(Charset::UsAscii.encode("é!"), b"?!".to_vec());
        assert_eq!(Charset::Iso8859_1.encode("€"), b"?".to_vec());
    }

    #[test]
    fn test_decode_lossy_falls_back() {
        let s = Charset::Utf8.decode_lossy(&[0x61, 0xFF]);
        assert!(s.starts_with('a'));
        assert!(s.contains('\u{FFFD}'));
    }
}
