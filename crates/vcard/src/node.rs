//! Parsed vCard data: records and their properties.

use crate::codec::decode_base64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One content line of a vCard after value decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyNode {
    /// Property name as it appeared in the source line
    pub name: String,
    /// Values joined by `;` (a single value verbatim)
    pub value: String,
    /// Decoded value list
    pub values: Vec<String>,
    /// Decoded binary for BASE64 values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_bytes: Option<Vec<u8>>,
    /// Non-TYPE parameters; a later parameter with the same name wins
    pub params: BTreeMap<String, String>,
    /// Values of TYPE parameters
    pub param_types: BTreeSet<String>,
    /// Group prefixes such as `item1` in `item1.TEL`
    pub groups: BTreeSet<String>,
}

impl PropertyNode {
    /// Create an empty property with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a parameter value by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Check whether a TYPE value is present.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.param_types.contains(type_name)
    }

    /// Encode this property into a single line that [`PropertyNode::decode`]
    /// can read back.
    ///
    /// Format: `propName:[N],propGroup:[g1,g2],paramMap:[K=V,TYPE=T],propValue:[v1,v2],`
    /// with each section present only when non-empty.
    pub fn encode(&self) -> String {
        let mut out = String::new();

        if !self.name.is_empty() {
            out.push_str("propName:[");
            out.push_str(&self.name);
            out.push_str("],");
        }

        if !self.groups.is_empty() {
            out.push_str("propGroup:[");
            out.push_str(&self.groups.iter().cloned().collect::<Vec<_>>().join(","));
            out.push_str("],");
        }

        if !self.params.is_empty() || !self.param_types.is_empty() {
            let items: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, escape_item(v)))
                .chain(
                    self.param_types
                        .iter()
                        .map(|t| format!("TYPE={}", escape_item(t))),
                )
                .collect();
            out.push_str("paramMap:[");
            out.push_str(&items.join(","));
            out.push_str("],");
        }

        if !self.values.is_empty() {
            let items: Vec<String> = self.values.iter().map(|v| escape_item(v)).collect();
            out.push_str("propValue:[");
            out.push_str(&items.join(","));
            out.push_str("],");
        }

        out
    }

    /// Decode a property produced by [`PropertyNode::encode`].
    ///
    /// Blank input yields an empty property. Unknown sections are ignored.
    pub fn decode(encoded: &str) -> Self {
        let mut node = PropertyNode::default();
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return node;
        }

        for elem in trimmed.split("],").filter(|e| !e.is_empty()) {
            let elem = elem.strip_suffix(']').unwrap_or(elem);
            let Some(open) = elem.find(":[") else {
                continue;
            };
            let section = &elem[..open];
            let items = split_unescaped_commas(&elem[open + 2..]);

            match section {
                "propName" => {
                    if let Some(first) = items.first() {
                        node.name = first.clone();
                    }
                }
                "propGroup" | "propGroupSet" => {
                    node.groups.extend(items);
                }
                "paramMap" => {
                    for item in items {
                        let (key, value) = match item.split_once('=') {
                            Some((k, v)) => (k.to_string(), unescape_item(v)),
                            None => (item.clone(), String::new()),
                        };
                        if key.eq_ignore_ascii_case("TYPE") {
                            node.param_types.insert(value);
                        } else {
                            node.params.insert(key, value);
                        }
                    }
                }
                "propValue" => {
                    node.values = items.iter().map(|v| unescape_item(v)).collect();
                    node.value = node.values.join(";");
                }
                _ => {}
            }
        }

        let is_base64 = node
            .param("ENCODING")
            .is_some_and(|e| e.eq_ignore_ascii_case("BASE64") || e.eq_ignore_ascii_case("B"));
        if is_base64 {
            if let Some(first) = node.values.first() {
                node.value_bytes = Some(decode_base64(first.as_bytes()));
            }
        }

        node
    }
}

fn escape_item(s: &str) -> String {
    s.replace('\\', "\\\\").replace(',', "\\,")
}

fn unescape_item(s: &str) -> String {
    s.replace("\\,", ",").replace("\\\\", "\\")
}

/// Split on commas that are not preceded by a backslash, keeping empty items.
fn split_unescaped_commas(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut prev = None;

    for c in s.chars() {
        if c == ',' && prev != Some('\\') {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        prev = Some(c);
    }
    items.push(current);

    items
}

impl PartialEq for PropertyNode {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name
            || self.params != other.params
            || self.param_types != other.param_types
            || self.groups != other.groups
        {
            return false;
        }

        if let Some(bytes) = &self.value_bytes {
            if other.value_bytes.as_ref() == Some(bytes) {
                return true;
            }
        }

        if self.value != other.value {
            return false;
        }

        // A single value is already carried in full by `value`
        self.values == other.values || self.values.len() == 1 || other.values.len() == 1
    }
}

impl fmt::Display for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        let types: Vec<&str> = self.param_types.iter().map(String::as_str).collect();
        let groups: Vec<&str> = self.groups.iter().map(String::as_str).collect();

        write!(
            f,
            "propName: {}, paramMap: {{{}}}, propmMap_TYPE: [{}], propGroupSet: [{}]",
            self.name,
            params.join(", "),
            types.join(", "),
            groups.join(", ")
        )?;
        if self.values.len() > 1 {
            write!(f, ", propValue_vector size: {}", self.values.len())?;
        }
        if let Some(bytes) = &self.value_bytes {
            write!(f, ", propValue_bytes size: {}", bytes.len())?;
        }
        write!(f, ", propValue: {}", self.value)
    }
}

/// A parsed record (`BEGIN:VCARD` ... `END:VCARD`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VNode {
    /// Record type, `VCARD` for vCards
    pub name: String,
    /// Properties in source order
    pub properties: Vec<PropertyNode>,
    #[serde(skip)]
    pub(crate) parsing: bool,
}

impl VNode {
    /// Create an empty record of the given type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            parsing: false,
        }
    }

    /// Iterate over properties whose name matches, ignoring case.
    pub fn properties_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a PropertyNode> + use<'a, 'n> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    /// First property with the given name, ignoring case.
    pub fn property(&self, name: &str) -> Option<&PropertyNode> {
        self.properties_named(name).next()
    }
}
