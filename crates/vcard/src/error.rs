//! Error types for the vCard crate.

use thiserror::Error;

/// Result type alias for vCard operations.
pub type Result<T> = std::result::Result<T, VCardError>;

/// Errors that can occur while parsing, decoding or composing vCards.
#[derive(Debug, Error)]
pub enum VCardError {
    /// A content line could not be split into name and value
    #[error("Invalid line: \"{0}\"")]
    InvalidLine(String),

    /// Input ended in the middle of a construct
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(&'static str),

    /// The record did not start with BEGIN:VCARD
    #[error("Expected String \"BEGIN:VCARD\" did not come (Instead, \"{0}\" came)")]
    MissingBegin(String),

    /// The record was not terminated by END:VCARD
    #[error("Expected END:VCARD was not found: {0}")]
    MissingEnd(String),

    /// Parameter name not allowed by the vCard version
    #[error("Unknown type \"{0}\"")]
    UnknownParam(String),

    /// VALUE parameter outside the known set
    #[error("Unknown value \"{0}\"")]
    UnknownValue(String),

    /// ENCODING parameter outside the known set
    #[error("Unknown encoding \"{0}\"")]
    UnknownEncoding(String),

    /// LANGUAGE parameter is not a language tag
    #[error("Invalid Language: \"{0}\"")]
    InvalidLanguage(String),

    /// A vCard was found inside another vCard
    #[error("This vCard has nested vCard data in it")]
    NestedVCard,

    /// BEGIN of something other than VCARD inside a record
    #[error("Unknown BEGIN type: {0}")]
    UnknownBegin(String),

    /// AGENT is not supported
    #[error("AGENT property is not supported in vCard {0}")]
    AgentUnsupported(&'static str),

    /// Both the 2.1 and the 3.0 parser rejected the input
    #[error("Parse failed (even with the 3.0 parser): {0}")]
    ParseFailed(#[source] Box<VCardError>),

    /// Quoted-printable or similar transfer decoding failed
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// Bytes could not be decoded with the requested charset
    #[error("Charset error: {0}")]
    Charset(String),

    /// A contact without a name cannot be composed
    #[error("Contact name must have a value")]
    ComposeEmptyName,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error code for integration with foodshare-core error handling.
/// Range: 11xxx for vCard errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VCardErrorCode {
    /// Malformed content line or record framing
    Syntax = 11001,
    /// Unsupported or invalid parameter
    Parameter = 11002,
    /// Unsupported construct (nested vCard, AGENT, foreign BEGIN)
    Unsupported = 11003,
    /// Every parser rejected the input
    ParseFailed = 11004,
    /// Transfer encoding or charset failure
    Encoding = 11005,
    /// Contact cannot be written as a vCard
    Compose = 11006,
    /// IO failure
    Io = 11007,
}

impl VCardError {
    /// Returns the error code for this error.
    pub fn code(&self) -> VCardErrorCode {
        match self {
            VCardError::InvalidLine(_)
            | VCardError::UnexpectedEof(_)
            | VCardError::MissingBegin(_)
            | VCardError::MissingEnd(_) => VCardErrorCode::Syntax,
            VCardError::UnknownParam(_)
            | VCardError::UnknownValue(_)
            | VCardError::UnknownEncoding(_)
            | VCardError::InvalidLanguage(_) => VCardErrorCode::Parameter,
            VCardError::NestedVCard
            | VCardError::UnknownBegin(_)
            | VCardError::AgentUnsupported(_) => VCardErrorCode::Unsupported,
            VCardError::ParseFailed(_) => VCardErrorCode::ParseFailed,
            VCardError::Decode(_) | VCardError::Charset(_) => VCardErrorCode::Encoding,
            VCardError::ComposeEmptyName => VCardErrorCode::Compose,
            VCardError::Io(_) => VCardErrorCode::Io,
        }
    }
}
