//! vCard parsing.
//!
//! [`VersionedParser`] reads one vCard version and reports to a
//! [`VBuilder`]. [`VCardParser`] is the usual entry point: it picks the
//! version from the data, repairs unfolded continuation lines and falls back
//! to 3.0 when 2.1 parsing fails.

mod engine;
mod lines;

pub use engine::{ParseStats, VersionedParser};

use crate::builder::{BuilderOptions, VBuilder, VDataBuilder};
use crate::charset::Charset;
use crate::detector::{SourceType, VCardSourceDetector};
use crate::node::VNode;
use crate::{Result, VCardError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported vCard versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Version {
    /// vCard 2.1
    #[default]
    #[serde(rename = "2.1")]
    V21,
    /// vCard 3.0 (RFC 2426)
    #[serde(rename = "3.0")]
    V30,
}

impl Version {
    /// Version number as written in `VERSION:`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V21 => "2.1",
            Version::V30 => "3.0",
        }
    }

    /// Label of the version, `vcard2.1` or `vcard3.0`.
    pub fn label(&self) -> &'static str {
        match self {
            Version::V21 => "vcard2.1",
            Version::V30 => "vcard3.0",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Version {
    type Err = VCardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2.1" | "21" | "vcard2.1" => Ok(Version::V21),
            "3.0" | "30" | "3" | "vcard3.0" => Ok(Version::V30),
            other => Err(VCardError::UnknownValue(format!("vCard version {}", other))),
        }
    }
}

/// Options for [`VCardParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Fixed version, or `None` to judge it from the data
    pub version: Option<Version>,
    /// Charset of byte input and of the builder
    pub charset: Charset,
    /// Split quoted-printable soft breaks on CRLF only
    pub strict_line_breaks: bool,
    /// Run the source detector first (enables FOMA nesting support)
    pub detect_source: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            version: None,
            charset: Charset::Utf8,
            strict_line_breaks: false,
            detect_source: true,
        }
    }
}

impl ParserOptions {
    /// Options for the default [`VDataBuilder`].
    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            source_charset: self.charset,
            target_charset: self.charset,
            strict_line_breaks: self.strict_line_breaks,
        }
    }
}

/// Front end over [`VersionedParser`].
#[derive(Debug, Default)]
pub struct VCardParser {
    options: ParserOptions,
    used_version: Option<Version>,
    source_type: SourceType,
    stats: ParseStats,
    cancel: Arc<AtomicBool>,
}

impl VCardParser {
    /// Create a parser that judges the version from the data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser for a fixed version.
    pub fn with_version(version: Version) -> Self {
        Self::with_options(ParserOptions {
            version: Some(version),
            ..Default::default()
        })
    }

    /// Create a parser with explicit options.
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Parser options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Version used by the last successful parse.
    pub fn version(&self) -> Option<Version> {
        self.used_version
    }

    /// Source detected by the last parse, when detection is enabled.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Statistics of the last parser run.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Flag that stops parsing after the current record when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Guess the version from a `VERSION:` line.
    ///
    /// Defaults to 2.1 when the line is missing or names neither version.
    pub fn judge_version(input: &str) -> Version {
        let Some(idx) = input.find("\nVERSION:") else {
            return Version::V21;
        };
        let rest = &input[idx + 1..];
        let line = match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        };

        if line.contains("2.1") {
            Version::V21
        } else if line.contains("3.0") {
            Version::V30
        } else {
            Version::V21
        }
    }

    /// Re-terminate every line with CRLF and turn lines without a `:` into
    /// folded continuations.
    ///
    /// An empty line is kept as is when the following line holds a property.
    pub fn normalize(input: &str) -> String {
        let unified = input.replace("\r\n", "\n");
        let mut lines: Vec<&str> = unified.split('\n').collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        let mut out = String::with_capacity(unified.len() + lines.len() * 2);
        for (i, line) in lines.iter().enumerate() {
            if !line.contains(':') {
                let next_is_property = lines
                    .get(i + 1)
                    .and_then(|next| next.find(':'))
                    .is_some_and(|pos| pos > 0);
                if !(line.is_empty() && next_is_property) {
                    out.push(' ');
                }
            }
            out.push_str(line);
            out.push_str("\r\n");
        }

        out
    }

    /// Parse text into records.
    ///
    /// # Arguments
    /// * `input` - vCard text, possibly holding several records
    ///
    /// # Returns
    /// The parsed records in input order
    pub fn parse(&mut self, input: &str) -> Result<Vec<VNode>> {
        let options = self.options.builder_options();
        let builder = self.parse_with(input, || VDataBuilder::with_options(options))?;
        Ok(builder.into_nodes())
    }

    /// Parse bytes, decoding them with the configured charset first.
    pub fn parse_bytes(&mut self, input: &[u8]) -> Result<Vec<VNode>> {
        let text = self.options.charset.decode(input)?;
        self.parse(&text)
    }

    /// Parse with builders produced by `factory`.
    ///
    /// When 2.1 parsing fails, the input is parsed again with 3.0 into a
    /// fresh builder. If that fails too, `VCardError::ParseFailed` wraps the
    /// 3.0 error.
    pub fn parse_with<B, F>(&mut self, input: &str, mut factory: F) -> Result<B>
    where
        B: VBuilder,
        F: FnMut() -> B,
    {
        let version = self
            .options
            .version
            .unwrap_or_else(|| Self::judge_version(input));
        let normalized = Self::normalize(input);
        let detector = self.detect(version, &normalized);

        match self.run(version, &normalized, &detector, factory()) {
            Ok(builder) => Ok(builder),
            Err(e) if version == Version::V21 => {
                warn!("vCard 2.1 parsing failed ({}), retrying as 3.0", e);
                self.run(Version::V30, &normalized, &detector, factory())
                    .map_err(|e| VCardError::ParseFailed(Box::new(e)))
            }
            Err(e) => Err(e),
        }
    }

    fn detect(&mut self, version: Version, input: &str) -> VCardSourceDetector {
        let mut detector = VCardSourceDetector::new();
        if self.options.detect_source {
            // Detection only needs property names; errors surface in the real pass
            if let Err(e) = VersionedParser::new(version).parse(input, &mut detector) {
                debug!("Source detection stopped early: {}", e);
            }
        }
        self.source_type = detector.source_type();
        detector
    }

    fn run<B: VBuilder>(
        &mut self,
        version: Version,
        input: &str,
        detector: &VCardSourceDetector,
        mut builder: B,
    ) -> Result<B> {
        let mut parser = VersionedParser::with_source(version, detector)
            .with_cancel_handle(Arc::clone(&self.cancel));
        let result = parser.parse(input, &mut builder);
        self.stats = parser.stats().clone();
        parser.log_debug_info();
        result?;

        self.used_version = Some(version);
        Ok(builder)
    }
}
