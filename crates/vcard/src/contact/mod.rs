//! Contact model built from vCards and consumed by the composer.

mod from_vnode;
mod phone;
mod types;

pub use from_vnode::{AddressOrder, ContactOptions, NameOrder};
pub use phone::format_number;
pub use types::{
    ContactKind, ContactMethodType, OrganizationType, PhoneType, MOBILE_EMAIL_TYPE_NAME,
};

use crate::node::PropertyNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneData {
    /// Phone type
    #[serde(rename = "type", default)]
    pub phone_type: PhoneType,
    /// Formatted number
    pub data: String,
    /// Label for custom types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Primary number of the contact
    #[serde(default)]
    pub is_primary: bool,
}

/// An e-mail address, postal address or other contact method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMethod {
    /// Kind of contact method
    pub kind: ContactKind,
    /// Method type
    #[serde(rename = "type", default)]
    pub method_type: ContactMethodType,
    /// Address text
    pub data: String,
    /// Label for custom types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Primary method of its kind
    #[serde(default)]
    pub is_primary: bool,
}

/// An organization the contact belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationData {
    /// Organization type
    #[serde(rename = "type", default)]
    pub org_type: OrganizationType,
    /// Company name
    #[serde(default)]
    pub company_name: String,
    /// Position or role at the company
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_name: Option<String>,
    /// Primary organization
    #[serde(default)]
    pub is_primary: bool,
}

/// A person contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    /// Display name; required by the composer
    pub name: String,
    /// Phonetic reading of the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic_name: Option<String>,
    /// Notes, in source order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Job title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Photo binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_bytes: Option<Vec<u8>>,
    /// Photo format such as `JPEG` or `image/gif`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_type: Option<String>,
    /// Phone numbers
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<PhoneData>,
    /// E-mail and postal addresses
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contact_methods: Vec<ContactMethod>,
    /// Organizations
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<OrganizationData>,
    /// Properties without a dedicated field, as encoded property nodes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Vec<String>>,
    /// Web site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Company written as `ORG` by the composer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl Contact {
    /// Create a contact with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a phone number.
    ///
    /// Only digits and a leading `+` are kept from `data` (after trimming),
    /// then the number is NANP-formatted.
    pub fn add_phone(
        &mut self,
        phone_type: PhoneType,
        data: &str,
        label: Option<String>,
        is_primary: bool,
    ) {
        let cleaned: String = data
            .trim()
            .chars()
            .enumerate()
            .filter(|&(i, c)| c.is_ascii_digit() || (i == 0 && c == '+'))
            .map(|(_, c)| c)
            .collect();

        self.phones.push(PhoneData {
            phone_type,
            data: format_number(&cleaned),
            label,
            is_primary,
        });
    }

    /// Add an e-mail, postal or other contact method.
    pub fn add_contact_method(
        &mut self,
        kind: ContactKind,
        method_type: ContactMethodType,
        data: impl Into<String>,
        label: Option<String>,
        is_primary: bool,
    ) {
        self.contact_methods.push(ContactMethod {
            kind,
            method_type,
            data: data.into(),
            label,
            is_primary,
        });
    }

    /// Add an organization.
    pub fn add_organization(
        &mut self,
        org_type: OrganizationType,
        company_name: impl Into<String>,
        position_name: Option<String>,
        is_primary: bool,
    ) {
        self.organizations.push(OrganizationData {
            org_type,
            company_name: company_name.into(),
            position_name,
            is_primary,
        });
    }

    /// Set the position of the last organization.
    ///
    /// Creates an `Other` organization with an empty company name when there
    /// is none yet (TITLE may come before ORG).
    pub fn set_position(&mut self, position: impl Into<String>) {
        if self.organizations.is_empty() {
            self.add_organization(OrganizationType::Other, "", None, false);
        }
        if let Some(last) = self.organizations.last_mut() {
            last.position_name = Some(position.into());
        }
    }

    /// Keep a property without a dedicated field, encoded with
    /// [`PropertyNode::encode`]. Properties with an empty value are skipped.
    pub fn add_extension(&mut self, property: &PropertyNode) {
        if property.value.is_empty() {
            return;
        }
        self.extensions
            .entry(property.name.clone())
            .or_default()
            .push(property.encode());
    }

    /// Contact methods of one kind.
    pub fn contact_methods_of(&self, kind: ContactKind) -> impl Iterator<Item = &ContactMethod> {
        self.contact_methods.iter().filter(move |m| m.kind == kind)
    }

    /// Text to show for this contact: the name, else the primary e-mail,
    /// else the primary phone number.
    pub fn display_string(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        if let Some(email) = self
            .contact_methods_of(ContactKind::Email)
            .find(|m| m.is_primary)
        {
            return &email.data;
        }
        if let Some(phone) = self.phones.iter().find(|p| p.is_primary) {
            return &phone.data;
        }
        ""
    }

    /// A contact with no name, phonetic name, phone or contact method
    /// carries nothing worth importing.
    pub fn is_ignorable(&self) -> bool {
        self.name.is_empty()
            && self.phonetic_name.as_deref().is_none_or(str::is_empty)
            && self.phones.is_empty()
            && self.contact_methods.is_empty()
    }
}
