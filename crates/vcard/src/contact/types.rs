//! Contact kinds and type codes, numbered like the platform contacts provider.

use serde::{Deserialize, Serialize};

/// Label used for e-mail addresses typed `CELL`.
pub const MOBILE_EMAIL_TYPE_NAME: &str = "_AUTO_CELL";

/// Kind of a contact method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Postal,
    Im,
    Organization,
    Phone,
}

impl ContactKind {
    /// Provider code.
    pub fn code(&self) -> i32 {
        match self {
            ContactKind::Email => 1,
            ContactKind::Postal => 2,
            ContactKind::Im => 3,
            ContactKind::Organization => 4,
            ContactKind::Phone => 5,
        }
    }
}

/// Type of a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneType {
    Custom,
    #[default]
    Home,
    Mobile,
    Work,
    FaxWork,
    FaxHome,
    Pager,
    Other,
}

impl PhoneType {
    /// Provider code.
    pub fn code(&self) -> i32 {
        match self {
            PhoneType::Custom => 0,
            PhoneType::Home => 1,
            PhoneType::Mobile => 2,
            PhoneType::Work => 3,
            PhoneType::FaxWork => 4,
            PhoneType::FaxHome => 5,
            PhoneType::Pager => 6,
            PhoneType::Other => 7,
        }
    }

    /// Look up a type by provider code.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => PhoneType::Custom,
            1 => PhoneType::Home,
            2 => PhoneType::Mobile,
            3 => PhoneType::Work,
            4 => PhoneType::FaxWork,
            5 => PhoneType::FaxHome,
            6 => PhoneType::Pager,
            7 => PhoneType::Other,
            _ => return None,
        })
    }
}

/// Type of an e-mail or postal contact method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethodType {
    Custom,
    Home,
    Work,
    #[default]
    Other,
}

impl ContactMethodType {
    /// Provider code.
    pub fn code(&self) -> i32 {
        match self {
            ContactMethodType::Custom => 0,
            ContactMethodType::Home => 1,
            ContactMethodType::Work => 2,
            ContactMethodType::Other => 3,
        }
    }
}

/// Type of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Custom,
    #[default]
    Work,
    Other,
}

impl OrganizationType {
    /// Provider code.
    pub fn code(&self) -> i32 {
        match self {
            OrganizationType::Custom => 0,
            OrganizationType::Work => 1,
            OrganizationType::Other => 2,
        }
    }
}
