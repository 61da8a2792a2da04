//! Builder callbacks driven by the parser, and the default tree builder.

use crate::charset::Charset;
use crate::codec::{decode_base64, decode_quoted_printable};
use crate::node::{PropertyNode, VNode};
use tracing::{debug, warn};

/// Receives parse events from [`crate::VersionedParser`].
///
/// Every callback defaults to a no-op, so implementors only override what
/// they need.
pub trait VBuilder {
    /// Parsing of the whole input begins.
    fn start(&mut self) {}

    /// Parsing of the whole input ended.
    fn end(&mut self) {}

    /// A record (`BEGIN:<type>`) begins.
    fn start_record(&mut self, _record_type: &str) {}

    /// The current record ended.
    fn end_record(&mut self) {}

    /// A content line begins.
    fn start_property(&mut self) {}

    /// The current content line ended.
    fn end_property(&mut self) {}

    /// A group prefix of the current property.
    fn property_group(&mut self, _group: &str) {}

    /// Name of the current property.
    fn property_name(&mut self, _name: &str) {}

    /// Name of the parameter whose value follows.
    fn property_param_type(&mut self, _param_type: &str) {}

    /// Value of a parameter.
    fn property_param_value(&mut self, _value: &str) {}

    /// Raw values of the current property, `None` when they could not be read.
    fn property_values(&mut self, _values: Option<Vec<String>>) {}
}

impl<B: VBuilder + ?Sized> VBuilder for &mut B {
    fn start(&mut self) {
        (**self).start()
    }
    fn end(&mut self) {
        (**self).end()
    }
    fn start_record(&mut self, record_type: &str) {
        (**self).start_record(record_type)
    }
    fn end_record(&mut self) {
        (**self).end_record()
    }
    fn start_property(&mut self) {
        (**self).start_property()
    }
    fn end_property(&mut self) {
        (**self).end_property()
    }
    fn property_group(&mut self, group: &str) {
        (**self).property_group(group)
    }
    fn property_name(&mut self, name: &str) {
        (**self).property_name(name)
    }
    fn property_param_type(&mut self, param_type: &str) {
        (**self).property_param_type(param_type)
    }
    fn property_param_value(&mut self, value: &str) {
        (**self).property_param_value(value)
    }
    fn property_values(&mut self, values: Option<Vec<String>>) {
        (**self).property_values(values)
    }
}

/// Options for [`VDataBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Charset the parser decoded the input with
    pub source_charset: Charset,
    /// Charset used for decoded quoted-printable bytes without a CHARSET param
    pub target_charset: Charset,
    /// Split quoted-printable soft breaks on CRLF only
    pub strict_line_breaks: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            source_charset: Charset::Utf8,
            target_charset: Charset::Utf8,
            strict_line_breaks: false,
        }
    }
}

/// Builds a list of [`VNode`] records from parse events.
///
/// Records may nest; `end_record` returns to the nearest enclosing record
/// that is still open.
#[derive(Debug, Default)]
pub struct VDataBuilder {
    options: BuilderOptions,
    nodes: Vec<VNode>,
    cursor: Option<usize>,
    current_property: Option<PropertyNode>,
    current_param_type: Option<String>,
}

impl VDataBuilder {
    /// Create a builder with UTF-8 source and target charsets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with explicit options.
    pub fn with_options(options: BuilderOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Builder options.
    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Records built so far.
    pub fn nodes(&self) -> &[VNode] {
        &self.nodes
    }

    /// Consume the builder and return its records.
    pub fn into_nodes(self) -> Vec<VNode> {
        self.nodes
    }

    fn current_node(&mut self) -> Option<&mut VNode> {
        self.cursor.and_then(|i| self.nodes.get_mut(i))
    }

    fn decode_value(&self, property: &mut PropertyNode, value: &str, encoding: Option<&str>) -> String {
        match encoding {
            Some(enc) if enc.eq_ignore_ascii_case("BASE64") || enc.eq_ignore_ascii_case("B") => {
                // BASE64 values carry a single value
                property.value_bytes = Some(decode_base64(value.as_bytes()));
                value.to_string()
            }
            Some(enc) if enc.eq_ignore_ascii_case("QUOTED-PRINTABLE") => {
                self.decode_quoted_printable_value(property, value)
            }
            _ => self.recode(value),
        }
    }

    fn decode_quoted_printable_value(&self, property: &PropertyNode, value: &str) -> String {
        let qp = value.replace("= ", " ").replace("=\t", "\t");

        let lines: Vec<&str> = if self.options.strict_line_breaks {
            qp.split("\r\n").collect()
        } else {
            split_lenient_lines(&qp)
        };

        let joined: String = lines
            .iter()
            .map(|line| line.strip_suffix('=').unwrap_or(line))
            .collect();

        let bytes = self.options.source_charset.encode(&joined);
        let decoded = match decode_quoted_printable(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Failed to decode quoted-printable: {}", e);
                return String::new();
            }
        };

        let charset = match property.param("CHARSET") {
            Some(label) => match Charset::from_label(label) {
                Some(charset) => charset,
                None => {
                    warn!("Unsupported CHARSET \"{}\", using {}", label, self.options.target_charset);
                    self.options.target_charset
                }
            },
            None => self.options.target_charset,
        };

        match charset.decode(&decoded) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to decode quoted-printable bytes as {}: {}", charset, e);
                String::from_utf8_lossy(&decoded).into_owned()
            }
        }
    }

    fn recode(&self, value: &str) -> String {
        let source = self.options.source_charset;
        let target = self.options.target_charset;
        if source == target {
            return value.to_string();
        }
        let bytes = source.encode(value);
        match target.decode(&bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to re-encode value from {} to {}: {}", source, target, e);
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }
}

/// Split on CR, LF or CRLF, dropping a final empty line.
fn split_lenient_lines(s: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&s[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&s[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < s.len() {
        lines.push(&s[start..]);
    }

    lines
}

fn join_values(values: &[String]) -> String {
    match values.len() {
        0 => String::new(),
        1 => values[0].clone(),
        _ => values.join(";"),
    }
}

impl VBuilder for VDataBuilder {
    fn start_record(&mut self, record_type: &str) {
        let mut node = VNode::new(record_type);
        node.parsing = true;
        self.nodes.push(node);
        self.cursor = Some(self.nodes.len() - 1);
    }

    fn end_record(&mut self) {
        let Some(mut pos) = self.cursor else {
            debug!("end_record called outside of a record");
            return;
        };
        if let Some(node) = self.nodes.get_mut(pos) {
            node.parsing = false;
        }
        while pos > 0 {
            pos -= 1;
            if self.nodes[pos].parsing {
                break;
            }
        }
        self.cursor = Some(pos);
    }

    fn start_property(&mut self) {
        self.current_property = Some(PropertyNode::default());
    }

    fn end_property(&mut self) {
        let Some(property) = self.current_property.take() else {
            return;
        };
        match self.current_node() {
            Some(node) => node.properties.push(property),
            None => debug!("Dropping property {} outside of a record", property.name),
        }
    }

    fn property_group(&mut self, group: &str) {
        if let Some(property) = self.current_property.as_mut() {
            property.groups.insert(group.to_string());
        }
    }

    fn property_name(&mut self, name: &str) {
        if let Some(property) = self.current_property.as_mut() {
            property.name = name.to_string();
        }
    }

    fn property_param_type(&mut self, param_type: &str) {
        self.current_param_type = Some(param_type.to_string());
    }

    fn property_param_value(&mut self, value: &str) {
        let param_type = self.current_param_type.take();
        let Some(property) = self.current_property.as_mut() else {
            return;
        };
        match param_type {
            Some(name) if !name.eq_ignore_ascii_case("TYPE") => {
                property.params.insert(name, value.to_string());
            }
            _ => {
                property.param_types.insert(value.to_string());
            }
        }
    }

    fn property_values(&mut self, values: Option<Vec<String>>) {
        let Some(mut property) = self.current_property.take() else {
            return;
        };

        match values {
            Some(values) if !values.is_empty() => {
                let encoding = property.param("ENCODING").map(str::to_string);
                for value in &values {
                    let decoded = self.decode_value(&mut property, value, encoding.as_deref());
                    property.values.push(decoded);
                }
                property.value = join_values(&property.values);
            }
            _ => {
                property.value_bytes = None;
                property.values = vec![String::new()];
                property.value = String::new();
            }
        }

        self.current_property = Some(property);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_one(params: &[(&str, &str)], values: Option<Vec<&str>>) -> PropertyNode {
        let mut builder = VDataBuilder::new();
        builder.start_record("VCARD");
        builder.start_property();
        builder.property_name("NOTE");
        for (k, v) in params {
            builder.property_param_type(k);
            builder.property_param_value(v);
        }
        builder.property_values(values.map(|v| v.into_iter().map(String::from).collect()));
        builder.end_property();
        builder.end_record();
        builder.into_nodes().remove(0).properties.remove(0)
    }

    #[test]
    fn test_plain_values() {
        let prop = build_one(&[], Some(vec!["a", "b"]));
        assert_eq!(prop.values, vec!["a", "b"]);
        assert_eq!(prop.value, "a;b");
    }

    #[test]
    fn test_empty_values() {
        let prop = build_one(&[], None);
        assert_eq!(prop.values, vec![""]);
        assert_eq!(prop.value, "");
        assert!(prop.value_bytes.is_none());

        let prop = build_one(&[], Some(vec![]));
        assert_eq!(prop.values, vec![""]);
    }

    #[test]
    fn test_type_params() {
        let prop = build_one(&[("TYPE", "HOME"), ("type", "WORK"), ("X-FOO", "bar")], Some(vec!["x"]));
        assert!(prop.has_type("HOME"));
        assert!(prop.has_type("WORK"));
        assert_eq!(prop.param("X-FOO"), Some("bar"));
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let prop = build_one(
            &[("ENCODING", "QUOTED-PRINTABLE")],
            Some(vec!["caf=C3=\r\n=A9 =\r\nbar"]),
        );
        assert_eq!(prop.value, "café bar");
    }

    fn build_qp(strict_line_breaks: bool, value: &str) -> PropertyNode {
        let mut builder = VDataBuilder::with_options(BuilderOptions {
            strict_line_breaks,
            ..Default::default()
        });
        builder.start_record("VCARD");
        builder.start_property();
        builder.property_name("NOTE");
        builder.property_param_type("ENCODING");
        builder.property_param_value("QUOTED-PRINTABLE");
        builder.property_values(Some(vec![value.to_string()]));
        builder.end_property();
        builder.end_record();
        builder.into_nodes().remove(0).properties.remove(0)
    }

    #[test]
    fn test_quoted_printable_strict_line_breaks() {
        let value = "line one\nline two=\r\n=C3=A9";

        let strict = build_qp(true, value);
        assert_eq!(strict.value, "line one\nline twoé");

        let lenient = build_qp(false, value);
        assert_eq!(lenient.value, "line oneline twoé");
    }

    #[test]
    fn test_quoted_printable_bare_lf_soft_break() {
        assert_eq!(build_qp(false, "ab=\ncd").value, "abcd");
        assert_eq!(build_qp(true, "ab=\r\ncd").value, "abcd");
        // bare LF stays in the line, leaving "=\nc" as a bad escape
        assert_eq!(build_qp(true, "ab=\ncd").value, "");
    }

    #[test]
    fn test_quoted_printable_charset_param() {
        let prop = build_one(
            &[("ENCODING", "QUOTED-PRINTABLE"), ("CHARSET", "ISO-8859-1")],
            Some(vec!["caf=E9"]),
        );
        assert_eq!(prop.value, "café");
    }

    #[test]
    fn test_quoted_printable_invalid_yields_empty() {
        let prop = build_one(&[("ENCODING", "QUOTED-PRINTABLE")], Some(vec!["bad=Z"]));
        assert_eq!(prop.value, "");
    }

    #[test]
    fn test_base64_sets_bytes() {
        let prop = build_one(&[("ENCODING", "BASE64")], Some(vec!["SGVsbG8="]));
        assert_eq!(prop.value_bytes.as_deref(), Some(&b"Hello"[..]));
        assert_eq!(prop.value, "SGVsbG8=");
    }

    #[test]
    fn test_nested_records_return_to_parent() {
        let mut builder = VDataBuilder::new();
        builder.start_record("VCALENDAR");
        builder.start_record("VEVENT");
        builder.end_record();
        builder.start_property();
        builder.property_name("X-AFTER");
        builder.property_values(Some(vec!["1".into()]));
        builder.end_property();
        builder.end_record();

        let nodes = builder.into_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].properties.len(), 1);
        assert!(nodes[1].properties.is_empty());
    }

    #[test]
    fn test_property_outside_record_is_dropped() {
        let mut builder = VDataBuilder::new();
        builder.start_property();
        builder.property_name("FN");
        builder.end_property();
        assert!(builder.nodes().is_empty());
    }

    #[test]
    fn test_split_lenient_lines() {
        assert_eq!(split_lenient_lines("a\rb\r\nc\n"), vec!["a", "b", "c"]);
        assert_eq!(split_lenient_lines("a\n\nb"), vec!["a", "", "b"]);
    }
}
