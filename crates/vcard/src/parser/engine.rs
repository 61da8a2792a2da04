//! Line-oriented vCard 2.1 / 3.0 parser.
//!
//! One parser handles both versions; the differences (known names, accepted
//! encodings, line unfolding, escaping and BASE64 termination) are switched
//! on [`Version`].

use super::lines::LineReader;
use super::Version;
use crate::builder::VBuilder;
use crate::detector::{SourceType, VCardSourceDetector};
use crate::{Result, VCardError};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_ENCODING: &str = "8BIT";

static KNOWN_TYPES_V21: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "DOM", "INTL", "POSTAL", "PARCEL", "HOME", "WORK", "PREF", "VOICE", "FAX", "MSG", "CELL",
        "PAGER", "BBS", "MODEM", "CAR", "ISDN", "VIDEO", "AOL", "APPLELINK", "ATTMAIL", "CIS",
        "EWORLD", "INTERNET", "IBMMAIL", "MCIMAIL", "POWERSHARE", "PRODIGY", "TLX", "X400", "GIF",
        "CGM", "WMF", "BMP", "MET", "PMB", "DIB", "PICT", "TIFF", "PDF", "PS", "JPEG", "QTIME",
        "MPEG", "MPEG2", "AVI", "WAVE", "AIFF", "PCM", "X509", "PGP",
    ]
    .into_iter()
    .collect()
});

static KNOWN_VALUES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["INLINE", "URL", "CONTENT-ID", "CID"].into_iter().collect());

static PROPERTY_NAMES_V21: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "BEGIN", "LOGO", "PHOTO", "LABEL", "FN", "TITLE", "SOUND", "VERSION", "TEL", "EMAIL", "TZ",
        "GEO", "NOTE", "URL", "BDAY", "ROLE", "REV", "UID", "KEY", "MAILER",
    ]
    .into_iter()
    .collect()
});

static PROPERTY_NAMES_V30: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    PROPERTY_NAMES_V21
        .iter()
        .copied()
        .chain([
            "NAME",
            "PROFILE",
            "SOURCE",
            "NICKNAME",
            "CLASS",
            "SORT-STRING",
            "CATEGORIES",
            "PRODID",
        ])
        .collect()
});

static ENCODINGS_V21: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["7BIT", "8BIT", "QUOTED-PRINTABLE", "BASE64", "B"]
        .into_iter()
        .collect()
});

static ENCODINGS_V30: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["7BIT", "8BIT", "BASE64", "B"].into_iter().collect());

/// Counters and timings collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseStats {
    /// Records started
    pub records: usize,
    /// Properties completed
    pub properties: usize,
    /// Distinct warnings emitted
    pub warnings: usize,
    /// Wall time spent in `parse`
    pub total: Duration,
    /// Part of `total` spent reading lines
    pub line_read: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    GroupOrName,
    Params,
    ParamsInQuote,
}

struct Context<'a, B> {
    lines: LineReader<'a>,
    builder: B,
}

/// Parser for one vCard version.
///
/// Drives a [`VBuilder`] with the records and properties found in the input.
#[derive(Debug)]
pub struct VersionedParser {
    version: Version,
    nest_count: usize,
    encoding: String,
    /// Line that ended the item list, checked against `END:VCARD`
    end_line: Option<String>,
    /// Line read ahead while unfolding 3.0 input
    lookahead: Option<String>,
    cancel: Arc<AtomicBool>,
    warned: HashSet<String>,
    stats: ParseStats,
}

impl VersionedParser {
    /// Create a parser for the given version.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            nest_count: 0,
            encoding: DEFAULT_ENCODING.to_string(),
            end_line: None,
            lookahead: None,
            cancel: Arc::new(AtomicBool::new(false)),
            warned: HashSet::new(),
            stats: ParseStats::default(),
        }
    }

    /// Create a parser tuned to a detected source.
    ///
    /// FOMA phones wrap the real vCard in an outer one, so the outer record
    /// is skipped.
    pub fn with_source(version: Version, detector: &VCardSourceDetector) -> Self {
        let mut parser = Self::new(version);
        if detector.source_type() == SourceType::Foma {
            parser.nest_count = 1;
        }
        parser
    }

    /// Share an existing cancellation flag.
    pub fn with_cancel_handle(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Version this parser accepts.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Flag that stops parsing after the current record when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Statistics accumulated over every `parse` call.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Log collected statistics at debug level.
    pub fn log_debug_info(&self) {
        debug!(
            version = self.version.as_str(),
            records = self.stats.records,
            properties = self.stats.properties,
            warnings = self.stats.warnings,
            "parse statistics"
        );
        debug!("total parsing time: {} ms", self.stats.total.as_millis());
        debug!("total line read time: {} ms", self.stats.line_read.as_millis());
    }

    /// Parse `input` and report its content to `builder`.
    ///
    /// # Arguments
    /// * `input` - vCard text
    /// * `builder` - Receiver of parse events (pass `&mut b` to keep ownership)
    ///
    /// # Returns
    /// `Ok(())` when every record was read, or the first syntax error
    pub fn parse<B: VBuilder>(&mut self, input: &str, builder: B) -> Result<()> {
        let start = Instant::now();
        self.end_line = None;
        self.lookahead = None;

        let mut cx = Context {
            lines: LineReader::new(input),
            builder,
        };

        cx.builder.start();
        let result = self.parse_file(&mut cx);
        if result.is_ok() {
            cx.builder.end();
        }

        self.stats.line_read += cx.lines.elapsed();
        self.stats.total += start.elapsed();
        result
    }

    fn parse_file<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Result<()> {
        let mut first = true;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                debug!("vCard parsing canceled");
                break;
            }
            if !self.parse_one_vcard(first, cx)? {
                break;
            }
            first = false;
        }

        let mut use_cache = true;
        for _ in 0..self.nest_count {
            self.read_end_vcard(use_cache, true, cx)?;
            use_cache = false;
        }

        Ok(())
    }

    fn parse_one_vcard<B: VBuilder>(&mut self, first: bool, cx: &mut Context<'_, B>) -> Result<bool> {
        let mut allow_garbage = false;
        if first {
            for _ in 0..self.nest_count {
                if !self.read_begin_vcard(allow_garbage, cx)? {
                    return Ok(false);
                }
                allow_garbage = true;
            }
        }
        if !self.read_begin_vcard(allow_garbage, cx)? {
            return Ok(false);
        }

        cx.builder.start_record("VCARD");
        self.stats.records += 1;
        self.parse_items(cx)?;
        self.read_end_vcard(true, false, cx)?;
        cx.builder.end_record();

        Ok(true)
    }

    /// Returns `false` at end of input.
    fn read_begin_vcard<B: VBuilder>(&mut self, allow_garbage: bool, cx: &mut Context<'_, B>) -> Result<bool> {
        loop {
            let Some(line) = self.next_non_blank_line(cx) else {
                return Ok(false);
            };
            if is_marker(&line, "BEGIN") {
                return Ok(true);
            }
            if !allow_garbage {
                if self.nest_count > 0 {
                    self.end_line = Some(line);
                    return Ok(false);
                }
                return Err(VCardError::MissingBegin(line));
            }
        }
    }

    fn read_end_vcard<B: VBuilder>(
        &mut self,
        use_cache: bool,
        allow_garbage: bool,
        cx: &mut Context<'_, B>,
    ) -> Result<()> {
        let mut use_cache = use_cache;
        loop {
            let cached = if use_cache { self.end_line.take() } else { None };
            let line = match cached {
                Some(line) => line,
                None => self.next_non_blank_line(cx).ok_or_else(|| {
                    VCardError::MissingEnd("Expected END:VCARD was not found.".to_string())
                })?,
            };
            if is_marker(&line, "END") {
                return Ok(());
            }
            if !allow_garbage {
                return Err(VCardError::MissingEnd(format!("END:VCARD != \"{}\"", line)));
            }
            use_cache = false;
        }
    }

    fn parse_items<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Result<()> {
        loop {
            cx.builder.start_property();
            if self.parse_item(cx)? {
                return Ok(());
            }
            cx.builder.end_property();
            self.stats.properties += 1;
        }
    }

    /// Returns `true` when the END line was reached.
    fn parse_item<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Result<bool> {
        self.encoding = DEFAULT_ENCODING.to_string();
        let line = self.next_item_line(cx)?;

        let Some((name, value)) = self.separate_line_and_handle_group(&line, cx)? else {
            return Ok(true);
        };
        let name = name.to_ascii_uppercase();

        match name.as_str() {
            "ADR" | "ORG" | "N" => self.handle_multiple_property_value(value, cx)?,
            "AGENT" => return Err(VCardError::AgentUnsupported(self.version.as_str())),
            _ => {
                self.check_property_name(&name);
                if name == "BEGIN" {
                    if value.trim().eq_ignore_ascii_case("VCARD") {
                        return Err(VCardError::NestedVCard);
                    }
                    return Err(VCardError::UnknownBegin(value));
                }
                self.handle_property_value(value, cx)?;
            }
        }

        Ok(false)
    }

    /// Split a content line into name and raw value, reporting groups,
    /// the name and every parameter to the builder on the way.
    ///
    /// Returns `None` for an END line.
    fn separate_line_and_handle_group<B: VBuilder>(
        &mut self,
        line: &str,
        cx: &mut Context<'_, B>,
    ) -> Result<Option<(String, String)>> {
        let mut state = LineState::GroupOrName;
        let mut start = 0;
        let mut name = String::new();

        for (i, ch) in line.char_indices() {
            match state {
                LineState::GroupOrName => match ch {
                    ':' | ';' => {
                        let prop = &line[start..i];
                        if prop.eq_ignore_ascii_case("END") {
                            self.end_line = Some(line.to_string());
                            return Ok(None);
                        }
                        cx.builder.property_name(prop);
                        if ch == ':' {
                            return Ok(Some((prop.to_string(), line[i + 1..].to_string())));
                        }
                        name = prop.to_string();
                        start = i + 1;
                        state = LineState::Params;
                    }
                    '.' => {
                        cx.builder.property_group(&line[start..i]);
                        start = i + 1;
                    }
                    _ => {}
                },
                LineState::Params => match ch {
                    '"' => state = LineState::ParamsInQuote,
                    ';' => {
                        self.handle_params(&line[start..i], cx)?;
                        start = i + 1;
                    }
                    ':' => {
                        self.handle_params(&line[start..i], cx)?;
                        return Ok(Some((name, line[i + 1..].to_string())));
                    }
                    _ => {}
                },
                LineState::ParamsInQuote => {
                    if ch == '"' {
                        state = LineState::Params;
                    }
                }
            }
        }

        Err(VCardError::InvalidLine(line.to_string()))
    }

    fn handle_params<B: VBuilder>(&mut self, params: &str, cx: &mut Context<'_, B>) -> Result<()> {
        match self.version {
            Version::V21 => self.handle_known_params(params, cx),
            // 3.0 allows any iana-token as a parameter name
            Version::V30 => match self.handle_known_params(params, cx) {
                Ok(()) => Ok(()),
                Err(_) => match params.split_once('=') {
                    Some((name, value)) => {
                        handle_any_param(name, value, cx);
                        Ok(())
                    }
                    None => Err(VCardError::UnknownParam(params.to_string())),
                },
            },
        }
    }

    fn handle_known_params<B: VBuilder>(&mut self, params: &str, cx: &mut Context<'_, B>) -> Result<()> {
        let Some((name, value)) = params.split_once('=') else {
            self.handle_type(params, cx);
            return Ok(());
        };
        let (name, value) = (name.trim(), value.trim());

        match name {
            "TYPE" => self.handle_type(value, cx),
            "VALUE" => handle_value(value, cx)?,
            "ENCODING" => self.handle_encoding(value, cx)?,
            "CHARSET" => {
                cx.builder.property_param_type("CHARSET");
                cx.builder.property_param_value(value);
            }
            "LANGUAGE" => handle_language(value, cx)?,
            _ if name.starts_with("X-") => handle_any_param(name, value, cx),
            _ => return Err(VCardError::UnknownParam(name.to_string())),
        }

        Ok(())
    }

    fn handle_type<B: VBuilder>(&mut self, ptype: &str, cx: &mut Context<'_, B>) {
        match self.version {
            Version::V21 => {
                if !(KNOWN_TYPES_V21.contains(ptype) || ptype.starts_with("X-")) {
                    self.warn_once(ptype, "Type unsupported by vCard 2.1");
                }
                cx.builder.property_param_type("TYPE");
                cx.builder.property_param_value(ptype);
            }
            Version::V30 => {
                for value in ptype.split(',') {
                    let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                        &value[1..value.len() - 1]
                    } else {
                        value
                    };
                    cx.builder.property_param_type("TYPE");
                    cx.builder.property_param_value(value);
                }
            }
        }
    }

    fn handle_encoding<B: VBuilder>(&mut self, encoding: &str, cx: &mut Context<'_, B>) -> Result<()> {
        let known = match self.version {
            Version::V21 => &*ENCODINGS_V21,
            Version::V30 => &*ENCODINGS_V30,
        };
        if !(known.contains(encoding.to_ascii_uppercase().as_str()) || encoding.starts_with("X-")) {
            return Err(VCardError::UnknownEncoding(encoding.to_string()));
        }
        cx.builder.property_param_type("ENCODING");
        cx.builder.property_param_value(encoding);
        self.encoding = encoding.to_string();
        Ok(())
    }

    fn check_property_name(&mut self, name: &str) {
        let known = match self.version {
            Version::V21 => &*PROPERTY_NAMES_V21,
            Version::V30 => &*PROPERTY_NAMES_V30,
        };
        if !(known.contains(name) || name.starts_with("X-")) {
            let message = match self.version {
                Version::V21 => "Property name unsupported by vCard 2.1",
                Version::V30 => "Property name unsupported by vCard 3.0",
            };
            self.warn_once(name, message);
        }
    }

    fn warn_once(&mut self, token: &str, message: &str) {
        if self.warned.insert(token.to_string()) {
            self.stats.warnings += 1;
            warn!("{}: {}", message, token);
        }
    }

    fn handle_property_value<B: VBuilder>(&mut self, value: String, cx: &mut Context<'_, B>) -> Result<()> {
        let encoding = self.encoding.to_ascii_uppercase();

        let decoded = match encoding.as_str() {
            "QUOTED-PRINTABLE" => self.get_quoted_printable(value, cx)?,
            "BASE64" | "B" => self.get_base64(value, cx)?,
            _ => {
                if !(encoding == "7BIT" || encoding == "8BIT" || encoding.starts_with("X-")) {
                    warn!("Encoding unsupported by vCard: \"{}\"", self.encoding);
                }
                self.unescape_text(&value)
            }
        };

        cx.builder.property_values(Some(vec![decoded]));
        Ok(())
    }

    /// Gather soft-break continuation lines of a quoted-printable value.
    fn get_quoted_printable<B: VBuilder>(&mut self, first: String, cx: &mut Context<'_, B>) -> Result<String> {
        if !first.trim().ends_with('=') {
            return Ok(first);
        }

        let mut value = first;
        value.push_str("\r\n");
        loop {
            let line = self.next_raw_line(cx).ok_or(VCardError::UnexpectedEof(
                "File ended during parsing quoted-printable String",
            ))?;
            value.push_str(&line);
            if line.trim().ends_with('=') {
                value.push_str("\r\n");
            } else {
                return Ok(value);
            }
        }
    }

    /// Gather the lines of a BASE64 value.
    ///
    /// 2.1 data ends at an empty line; 3.0 data also ends at the first line
    /// that is not indented, which is kept for the next item.
    fn get_base64<B: VBuilder>(&mut self, first: String, cx: &mut Context<'_, B>) -> Result<String> {
        let mut value = first;
        loop {
            let line = self
                .next_raw_line(cx)
                .ok_or(VCardError::UnexpectedEof("File ended during parsing BASE64 binary"))?;
            if line.is_empty() {
                break;
            }
            if self.version == Version::V30 && !line.starts_with([' ', '\t']) {
                self.lookahead = Some(line);
                break;
            }
            value.push_str(&line);
        }
        Ok(value)
    }

    /// Split an `ADR`, `ORG` or `N` value on unescaped semicolons.
    fn handle_multiple_property_value<B: VBuilder>(
        &mut self,
        value: String,
        cx: &mut Context<'_, B>,
    ) -> Result<()> {
        // 2.1 does not allow QUOTED-PRINTABLE here, but some data has it
        let value = if self.encoding.eq_ignore_ascii_case("QUOTED-PRINTABLE") {
            self.get_quoted_printable(value, cx)?
        } else {
            value
        };

        let chars: Vec<char> = value.chars().collect();
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == '\\' && i + 1 < chars.len() {
                match self.unescape_char(chars[i + 1]) {
                    Some(unescaped) => {
                        current.push_str(&unescaped);
                        i += 1;
                    }
                    None => current.push(ch),
                }
            } else if ch == ';' {
                parts.push(std::mem::take(&mut current));
            } else {
                current.push(ch);
            }
            i += 1;
        }
        parts.push(current);

        cx.builder.property_values(Some(parts));
        Ok(())
    }

    /// Replacement for `\\` followed by `ch`, or `None` to keep the backslash.
    fn unescape_char(&self, ch: char) -> Option<String> {
        match (self.version, ch) {
            (Version::V21, '\\' | ';' | ':' | ',') => Some(ch.to_string()),
            (Version::V21, _) => None,
            (Version::V30, 'n' | 'N') => Some("\r\n".to_string()),
            (Version::V30, _) => Some(ch.to_string()),
        }
    }

    fn unescape_text(&self, text: &str) -> String {
        if self.version == Version::V21 {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some('n' | 'N') => out.push_str("\r\n"),
                    Some(next) => out.push(next),
                    None => out.push(ch),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Next raw line, honouring a 3.0 look-ahead line.
    fn next_raw_line<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Option<String> {
        if self.version == Version::V30 {
            if let Some(line) = self.lookahead.take() {
                return Some(line);
            }
        }
        cx.lines.next_line().map(str::to_string)
    }

    fn next_non_blank_line<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Option<String> {
        loop {
            let line = self.next_raw_line(cx)?;
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
    }

    /// Next logical content line. 3.0 input is unfolded here.
    fn next_item_line<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Result<String> {
        match self.version {
            Version::V21 => self
                .next_non_blank_line(cx)
                .ok_or(VCardError::UnexpectedEof("Reached end of buffer.")),
            Version::V30 => self.next_unfolded_line(cx),
        }
    }

    fn next_unfolded_line<B: VBuilder>(&mut self, cx: &mut Context<'_, B>) -> Result<String> {
        let mut folded: Option<String> = None;
        loop {
            let Some(line) = cx.lines.next_line() else {
                if let Some(folded) = folded {
                    return Ok(folded);
                }
                return self
                    .lookahead
                    .take()
                    .ok_or(VCardError::UnexpectedEof("Reached end of buffer."));
            };

            if line.is_empty() {
                if let Some(folded) = folded {
                    return Ok(folded);
                }
                if let Some(previous) = self.lookahead.take() {
                    return Ok(previous);
                }
            } else if line.starts_with([' ', '\t']) {
                match folded.as_mut() {
                    Some(buf) => buf.push_str(&line[1..]),
                    None => match self.lookahead.take() {
                        Some(mut previous) => {
                            previous.push_str(&line[1..]);
                            folded = Some(previous);
                        }
                        None => return Err(VCardError::InvalidLine(line.to_string())),
                    },
                }
            } else {
                match self.lookahead.replace(line.to_string()) {
                    Some(previous) => return Ok(previous),
                    None => {
                        if let Some(folded) = folded {
                            return Ok(folded);
                        }
                    }
                }
            }
        }
    }
}

fn handle_any_param<B: VBuilder>(name: &str, value: &str, cx: &mut Context<'_, B>) {
    cx.builder.property_param_type(name);
    cx.builder.property_param_value(value);
}

fn handle_value<B: VBuilder>(value: &str, cx: &mut Context<'_, B>) -> Result<()> {
    if !(KNOWN_VALUES.contains(value.to_ascii_uppercase().as_str()) || value.starts_with("X-")) {
        return Err(VCardError::UnknownValue(value.to_string()));
    }
    cx.builder.property_param_type("VALUE");
    cx.builder.property_param_value(value);
    Ok(())
}

fn handle_language<B: VBuilder>(value: &str, cx: &mut Context<'_, B>) -> Result<()> {
    let mut parts: Vec<&str> = value.split('-').collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    let valid = parts.len() <= 2
        && parts
            .iter()
            .all(|part| part.chars().all(|c| c.is_ascii_alphabetic()));
    if !valid {
        return Err(VCardError::InvalidLanguage(value.to_string()));
    }
    cx.builder.property_param_type("LANGUAGE");
    cx.builder.property_param_value(value);
    Ok(())
}

/// `BEGIN:VCARD` / `END:VCARD` with optional whitespace and any case.
fn is_marker(line: &str, keyword: &str) -> bool {
    match line.split_once(':') {
        Some((key, value)) => {
            key.trim().eq_ignore_ascii_case(keyword) && value.trim().eq_ignore_ascii_case("VCARD")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::VDataBuilder;
    use crate::node::VNode;

    fn parse(version: Version, input: &str) -> Result<Vec<VNode>> {
        let mut builder = VDataBuilder::new();
        VersionedParser::new(version).parse(input, &mut builder)?;
        Ok(builder.into_nodes())
    }

    #[test]
    fn test_parse_simple_v21() {
        let nodes = parse(
            Version::V21,
            "BEGIN:VCARD\r\nVERSION:2.1\r\nN:Doe;John;;;\r\nFN:John Doe\r\nTEL;HOME;VOICE:555-1234\r\nEND:VCARD\r\n",
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let card = &nodes[0];
        assert_eq!(card.name, "VCARD");
        assert_eq!(card.properties.len(), 4);

        let n = card.property("N").unwrap();
        assert_eq!(n.values, vec!["Doe", "John", "", "", ""]);

        let tel = card.property("TEL").unwrap();
        assert!(tel.has_type("HOME"));
        assert!(tel.has_type("VOICE"));
        assert_eq!(tel.value, "555-1234");
    }

    #[test]
    fn test_groups_and_lowercase_markers() {
        let nodes = parse(
            Version::V21,
            "begin : vcard\r\nitem1.item2.EMAIL;INTERNET:a@b.c\r\nend:VCARD\r\n",
        )
        .unwrap();
        let email = &nodes[0].properties[0];
        assert_eq!(email.name, "EMAIL");
        assert!(email.groups.contains("item1"));
        assert!(email.groups.contains("item2"));
    }

    #[test]
    fn test_missing_begin() {
        let err = parse(Version::V21, "FN:x\r\n").unwrap_err();
        assert!(matches!(err, VCardError::MissingBegin(line) if line == "FN:x"));
    }

    #[test]
    fn test_empty_input_is_ok() {
        assert!(parse(Version::V21, "").unwrap().is_empty());
        assert!(parse(Version::V30, "\r\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_end() {
        let err = parse(Version::V21, "BEGIN:VCARD\r\nFN:x\r\n").unwrap_err();
        assert!(matches!(err, VCardError::UnexpectedEof(_)));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nFN:x\r\nEND:VCALENDAR\r\n").unwrap_err();
        assert!(matches!(err, VCardError::MissingEnd(_)));
    }

    #[test]
    fn test_invalid_line() {
        let err = parse(Version::V21, "BEGIN:VCARD\r\nNOCOLON\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::InvalidLine(_)));
    }

    #[test]
    fn test_unknown_param_v21_and_v30() {
        let input = "BEGIN:VCARD\r\nTEL;FOO=bar:1\r\nEND:VCARD\r\n";
        assert!(matches!(
            parse(Version::V21, input).unwrap_err(),
            VCardError::UnknownParam(name) if name == "FOO"
        ));

        let nodes = parse(Version::V30, input).unwrap();
        assert_eq!(nodes[0].properties[0].param("FOO"), Some("bar"));
    }

    #[test]
    fn test_unknown_value_and_encoding() {
        let err = parse(Version::V21, "BEGIN:VCARD\r\nPHOTO;VALUE=FTP:x\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::UnknownValue(_)));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nNOTE;ENCODING=UUE:x\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::UnknownEncoding(_)));
    }

    #[test]
    fn test_language_param() {
        let nodes = parse(Version::V21, "BEGIN:VCARD\r\nNOTE;LANGUAGE=en-US:hi\r\nEND:VCARD\r\n").unwrap();
        assert_eq!(nodes[0].properties[0].param("LANGUAGE"), Some("en-US"));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nNOTE;LANGUAGE=en-US-x:hi\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::InvalidLanguage(_)));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nNOTE;LANGUAGE=e1:hi\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::InvalidLanguage(_)));
    }

    #[test]
    fn test_quoted_params_keep_separators() {
        let nodes = parse(
            Version::V30,
            "BEGIN:VCARD\r\nTEL;TYPE=\"HOME,WORK\";X-LABEL=\"a;b:c\":123\r\nEND:VCARD\r\n",
        )
        .unwrap();
        let tel = &nodes[0].properties[0];
        assert_eq!(tel.value, "123");
        assert!(tel.has_type("\"HOME"));
        assert_eq!(tel.param("X-LABEL"), Some("\"a;b:c\""));
    }

    #[test]
    fn test_v30_type_list() {
        let nodes = parse(Version::V30, "BEGIN:VCARD\r\nTEL;TYPE=HOME,\"CELL\":1\r\nEND:VCARD\r\n").unwrap();
        let tel = &nodes[0].properties[0];
        assert!(tel.has_type("HOME"));
        assert!(tel.has_type("CELL"));
    }

    #[test]
    fn test_quoted_printable_continuation() {
        let nodes = parse(
            Version::V21,
            "BEGIN:VCARD\r\nNOTE;ENCODING=QUOTED-PRINTABLE:line one=0D=0A=\r\nline two\r\nEND:VCARD\r\n",
        )
        .unwrap();
        assert_eq!(nodes[0].properties[0].value, "line one\r\nline two");
    }

    #[test]
    fn test_quoted_printable_eof() {
        let err = parse(
            Version::V21,
            "BEGIN:VCARD\r\nNOTE;ENCODING=QUOTED-PRINTABLE:abc=\r\n",
        )
        .unwrap_err();
        assert!(matches!(err, VCardError::UnexpectedEof(_)));
    }

    #[test]
    fn test_base64_v21_ends_at_blank_line() {
        let nodes = parse(
            Version::V21,
            "BEGIN:VCARD\r\nPHOTO;ENCODING=BASE64;TYPE=GIF:SGVs\r\n bG8=\r\n\r\nFN:x\r\nEND:VCARD\r\n",
        )
        .unwrap();
        let photo = &nodes[0].properties[0];
        assert_eq!(photo.value_bytes.as_deref(), Some(&b"Hello"[..]));
        assert_eq!(nodes[0].properties[1].value, "x");
    }

    #[test]
    fn test_base64_v30_ends_at_unindented_line() {
        let nodes = parse(
            Version::V30,
            "BEGIN:VCARD\r\nPHOTO;ENCODING=b;TYPE=JPEG:SGVs\r\n bG8=\r\nFN:x\r\nEND:VCARD\r\n",
        )
        .unwrap();
        let photo = &nodes[0].properties[0];
        assert_eq!(photo.value_bytes.as_deref(), Some(&b"Hello"[..]));
        assert_eq!(nodes[0].properties[1].value, "x");
    }

    #[test]
    fn test_base64_eof() {
        let err = parse(Version::V21, "BEGIN:VCARD\r\nPHOTO;ENCODING=BASE64:SGVs\r\n").unwrap_err();
        assert!(matches!(err, VCardError::UnexpectedEof(_)));
    }

    #[test]
    fn test_v30_unfolding_and_unescape() {
        let nodes = parse(
            Version::V30,
            "BEGIN:VCARD\r\nNOTE:first\r\n  second\\nthird\\, ok\r\nEND:VCARD\r\n",
        )
        .unwrap();
        assert_eq!(nodes[0].properties[0].value, "first second\r\nthird, ok");
    }

    #[test]
    fn test_v30_leading_space_without_previous_line() {
        let err = parse(Version::V30, "BEGIN:VCARD\r\n FN:x\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::InvalidLine(_)));
    }

    #[test]
    fn test_structured_value_escapes() {
        let nodes = parse(Version::V21, "BEGIN:VCARD\r\nN:A\\;B;C\\xD\r\nEND:VCARD\r\n").unwrap();
        assert_eq!(nodes[0].properties[0].values, vec!["A;B", "C\\xD"]);

        let nodes = parse(Version::V30, "BEGIN:VCARD\r\nADR:;;1\\n2;x\\yz\r\nEND:VCARD\r\n").unwrap();
        assert_eq!(nodes[0].properties[0].values, vec!["", "", "1\r\n2", "xyz"]);
    }

    #[test]
    fn test_agent_and_nested() {
        let err = parse(Version::V21, "BEGIN:VCARD\r\nAGENT:x\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::AgentUnsupported("2.1")));

        let err = parse(Version::V30, "BEGIN:VCARD\r\nAGENT:x\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::AgentUnsupported("3.0")));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nBEGIN:VCARD\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::NestedVCard));

        let err = parse(Version::V21, "BEGIN:VCARD\r\nBEGIN:VEVENT\r\nEND:VCARD\r\n").unwrap_err();
        assert!(matches!(err, VCardError::UnknownBegin(v) if v == "VEVENT"));
    }

    #[test]
    fn test_warnings_are_counted_once() {
        let mut builder = VDataBuilder::new();
        let mut parser = VersionedParser::new(Version::V21);
        parser
            .parse(
                "BEGIN:VCARD\r\nNICKNAME:a\r\nNICKNAME:b\r\nTEL;STRANGE:1\r\nEND:VCARD\r\n",
                &mut builder,
            )
            .unwrap();
        assert_eq!(parser.stats().warnings, 2);
        assert_eq!(parser.stats().records, 1);
        assert_eq!(parser.stats().properties, 3);
    }

    #[test]
    fn test_multiple_records() {
        let nodes = parse(
            Version::V21,
            "BEGIN:VCARD\r\nFN:a\r\nEND:VCARD\r\n\r\nBEGIN:VCARD\r\nFN:b\r\nEND:VCARD\r\n",
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].properties[0].value, "b");
    }

    #[test]
    fn test_v30_multiple_records() {
        let nodes = parse(
            Version::V30,
            "BEGIN:VCARD\r\nFN:a\r\nEND:VCARD\r\nBEGIN:VCARD\r\nFN:b\r\nEND:VCARD\r\n",
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_cancel_before_parse() {
        let mut builder = VDataBuilder::new();
        let mut parser = VersionedParser::new(Version::V21);
        parser.cancel();
        parser
            .parse("BEGIN:VCARD\r\nFN:a\r\nEND:VCARD\r\n", &mut builder)
            .unwrap();
        assert!(builder.nodes().is_empty());
    }

    #[test]
    fn test_foma_nested_card() {
        let mut detector = VCardSourceDetector::new();
        detector.property_name("X-SD-VERN");

        let mut builder = VDataBuilder::new();
        let mut parser = VersionedParser::with_source(Version::V21, &detector);
        parser
            .parse(
                "BEGIN:VCARD\r\nX-SD-VERN:2.0\r\nBEGIN:VCARD\r\nFN:inner\r\nEND:VCARD\r\nEND:VCARD\r\n",
                &mut builder,
            )
            .unwrap();
        let nodes = builder.into_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].properties[0].value, "inner");
    }
}
