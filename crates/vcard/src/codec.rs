//! Transfer codecs used by vCard values.
//!
//! Quoted-printable decoding and lenient Base64 handling for `ENCODING`
//! parameters, plus the chunked Base64 form written by the composer.

use crate::{Result, VCardError};
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

/// Base64 line length used when writing binary values.
pub const BASE64_LINE_LENGTH: usize = 76;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode quoted-printable bytes.
///
/// `=XY` (hex digits, either case) becomes the byte `0xXY`; every other byte
/// is copied unchanged. Soft line breaks must already be removed.
///
/// # Arguments
/// * `input` - Quoted-printable encoded bytes
///
/// # Returns
/// Decoded bytes, or `VCardError::Decode` for a truncated or invalid escape
pub fn decode_quoted_printable(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b == b'=' {
            if i + 2 >= input.len() {
                return Err(VCardError::Decode(
                    "Invalid quoted-printable encoding: truncated escape".to_string(),
                ));
            }
            let hi = hex_value(input[i + 1]);
            let lo = hex_value(input[i + 2]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => output.push((hi << 4) | lo),
                _ => {
                    return Err(VCardError::Decode(format!(
                        "Invalid quoted-printable escape: ={}{}",
                        input[i + 1] as char,
                        input[i + 2] as char
                    )));
                }
            }
            i += 3;
        } else {
            output.push(b);
            i += 1;
        }
    }

    Ok(output)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode Base64 leniently.
///
/// Bytes outside the standard alphabet (whitespace, line breaks, padding)
/// are skipped. A lone trailing sextet cannot form a byte and is dropped.
/// This never fails; undecodable input yields an empty vector.
pub fn decode_base64(input: &[u8]) -> Vec<u8> {
    let mut filtered: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();

    if filtered.len() % 4 == 1 {
        filtered.pop();
    }

    match LENIENT.decode(&filtered) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to decode BASE64 value: {}", e);
            Vec::new()
        }
    }
}

/// Encode bytes as Base64 split into CRLF-terminated lines.
///
/// # Arguments
/// * `data` - Binary data to encode
///
/// # Returns
/// Base64 text with lines of at most 76 characters, each ending in CRLF.
/// Empty input yields an empty string.
pub fn encode_base64_chunked(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut output = String::with_capacity(encoded.len() + encoded.len() / 38 + 2);

    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        // Base64 output is pure ASCII
        output.push_str(&String::from_utf8_lossy(chunk));
        output.push_str("\r\n");
    }

    output
}
