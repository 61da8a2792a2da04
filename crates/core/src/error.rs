//! Workspace error type for the vCard tools
//!
//! Library failures (`VCardError`, io, TOML, JSON) are folded into one
//! [`Error`] carrying a numbered [`ErrorCode`]. The leading digit of the code
//! picks the process exit status, and [`ErrorReport`] is what `--json` prints.

use foodshare_vcard::{VCardError, VCardErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Numbered failure kinds, grouped by thousands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Files and directories (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,
    DirectoryNotFound = 2004,

    // fs-vcard.toml (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    ConfigValidationError = 3003,

    // Reading vCard text (4xxx)
    ParseError = 4000,
    InvalidSyntax = 4001,
    UnsupportedParameter = 4002,
    UnsupportedConstruct = 4003,
    AllParsersFailed = 4004,
    DecodeError = 4005,

    // Writing vCard text (5xxx)
    MissingName = 5001,

    // Malformed input documents (6xxx)
    InvalidFormat = 6002,
}

impl ErrorCode {
    /// Numeric value, e.g. 4004
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Group name shown in reports
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Parse",
            5 => "Compose",
            6 => "Validation",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// A failed fs-vcard operation
#[derive(Error, Debug)]
pub struct Error {
    /// What went wrong
    pub code: ErrorCode,
    /// One-line description
    pub message: String,
    /// What the tool was doing, e.g. "Parsing contacts.vcf"
    pub context: Option<String>,
    /// Hint printed under the message
    pub suggestion: Option<String>,
    /// Underlying library error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Error with only a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach what the tool was doing
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a hint for the user
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Flatten into the `--json` error document
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    /// Process exit status for this error's group
    pub fn exit_code(&self) -> i32 {
        match self.code.code() / 1000 {
            2 => exit_codes::IO_ERROR,
            3 => exit_codes::CONFIG_ERROR,
            4 => exit_codes::PARSE_ERROR,
            5 => exit_codes::COMPOSE_ERROR,
            6 => exit_codes::VALIDATION_ERROR,
            _ => exit_codes::FAILURE,
        }
    }

    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a fs-vcard.toml file or use --config to specify a path")
    }

    pub fn invalid_config_value(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigValidationError,
            format!("Invalid value for {}: {}", key, value),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

}

/// JSON shape of an [`Error`], printed on stdout in `--json` mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Process exit statuses of `fs-vcard`
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const PARSE_ERROR: i32 = 4;
    pub const COMPOSE_ERROR: i32 = 5;
    pub const IO_ERROR: i32 = 6;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::InvalidFormat, format!("JSON parse error: {}", err))
            .with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

impl From<VCardError> for Error {
    fn from(err: VCardError) -> Self {
        let code = match err.code() {
            VCardErrorCode::Syntax => ErrorCode::InvalidSyntax,
            VCardErrorCode::Parameter => ErrorCode::UnsupportedParameter,
            VCardErrorCode::Unsupported => ErrorCode::UnsupportedConstruct,
            VCardErrorCode::ParseFailed => ErrorCode::AllParsersFailed,
            VCardErrorCode::Encoding => ErrorCode::DecodeError,
            VCardErrorCode::Compose => ErrorCode::MissingName,
            VCardErrorCode::Io => ErrorCode::IoError,
        };
        let suggestion = match code {
            ErrorCode::AllParsersFailed => Some("Check that every BEGIN:VCARD has a matching END:VCARD"),
            ErrorCode::MissingName => Some("Set a non-blank \"name\" on the contact"),
            ErrorCode::DecodeError => Some("Try a different --charset"),
            _ => None,
        };

        let mut error = Error::new(code, err.to_string());
        if let Some(suggestion) = suggestion {
            error = error.with_suggestion(suggestion);
        }
        error.with_source(err)
    }
}

/// Annotate a failing [`Result`] on its way up to `main`
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}
