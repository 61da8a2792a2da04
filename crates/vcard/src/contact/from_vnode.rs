//! Mapping of a parsed vCard record onto [`Contact`].

use super::{
    Contact, ContactKind, ContactMethodType, OrganizationType, PhoneType, MOBILE_EMAIL_TYPE_NAME,
};
use crate::node::{PropertyNode, VNode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Order of name parts when building a name from `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameOrder {
    /// Prefix, given, middle, family, suffix
    #[default]
    English,
    /// Prefix, family, middle, given, suffix
    Japanese,
}

/// Order of address parts when joining `ADR` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressOrder {
    /// PO box first, country last
    #[default]
    Western,
    /// Country first, PO box last
    Japanese,
}

/// Options for [`Contact::from_vnode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactOptions {
    /// Name part order
    pub name_order: NameOrder,
    /// Address part order
    pub address_order: AddressOrder,
}

/// Primary flags already granted through `PREF`.
#[derive(Debug, Default)]
struct PrefState {
    address: bool,
    phone: bool,
    email: bool,
    organization: bool,
}

/// Classification of the TYPE values of one property.
#[derive(Debug, Default)]
struct TypeScan<T> {
    kind: Option<T>,
    label: Option<String>,
    primary: bool,
    fax: bool,
}

impl<T> TypeScan<T> {
    /// First custom token wins; `X-` prefixes are stripped.
    fn custom(&mut self, custom: T, token: &str) {
        if self.kind.is_some() {
            return;
        }
        self.kind = Some(custom);
        let label = match token.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("X-") => &token[2..],
            _ => token,
        };
        self.label = Some(label.to_string());
    }
}

impl Contact {
    /// Build a contact from a parsed record.
    ///
    /// # Arguments
    /// * `node` - A record produced by the parser
    /// * `options` - Name and address ordering
    ///
    /// # Returns
    /// The contact, or `None` when the record is not a `VCARD`
    pub fn from_vnode(node: &VNode, options: &ContactOptions) -> Option<Contact> {
        if node.name != "VCARD" {
            warn!("Non VCARD data is inserted: {}", node.name);
            return None;
        }

        let mut contact = Contact::default();
        let mut pref = PrefState::default();
        let mut full_name: Option<String> = None;
        let mut name_from_n: Option<String> = None;
        let mut phonetic_first: Option<String> = None;
        let mut phonetic_middle: Option<String> = None;
        let mut phonetic_last: Option<String> = None;

        for property in &node.properties {
            if property.value.is_empty() {
                continue;
            }
            let name = property.name.to_ascii_uppercase();

            match name.as_str() {
                "VERSION" => {}
                "FN" => full_name = Some(property.value.clone()),
                "NAME" if full_name.is_none() => full_name = Some(property.value.clone()),
                "N" => name_from_n = Some(name_from_n_values(&property.values, options.name_order)),
                "SORT-STRING" => contact.phonetic_name = Some(property.value.clone()),
                "SOUND" => {
                    if property.has_type("X-IRMC-N") && contact.phonetic_name.is_none() {
                        contact.phonetic_name = Some(property.value.replace(';', ""));
                    } else {
                        contact.add_extension(property);
                    }
                }
                "ADR" => add_address(&mut contact, property, options.address_order, &mut pref),
                "ORG" => {
                    let is_primary = property.has_type("PREF") && !pref.organization;
                    pref.organization |= is_primary;
                    contact.add_organization(
                        OrganizationType::Work,
                        property.values.join(" "),
                        Some(String::new()),
                        is_primary,
                    );
                }
                "TITLE" | "ROLE" => contact.set_position(property.value.clone()),
                "PHOTO" => set_photo(&mut contact, property),
                "LOGO" => {
                    if contact.photo_bytes.is_none() {
                        set_photo(&mut contact, property);
                    }
                }
                "EMAIL" => add_email(&mut contact, property, &mut pref),
                "TEL" => add_tel(&mut contact, property, &mut pref),
                "NOTE" => contact.notes.push(property.value.clone()),
                "URL" => contact.website = Some(property.value.clone()),
                "X-PHONETIC-FIRST-NAME" => phonetic_first = Some(property.value.clone()),
                "X-PHONETIC-MIDDLE-NAME" => phonetic_middle = Some(property.value.clone()),
                "X-PHONETIC-LAST-NAME" => phonetic_last = Some(property.value.clone()),
                // BDAY, REV, UID, KEY, MAILER, TZ, GEO, NICKNAME, CLASS,
                // PROFILE, CATEGORIES, SOURCE, PRODID and unknown names
                _ => contact.add_extension(property),
            }
        }

        contact.name = full_name.or(name_from_n).unwrap_or_default();

        if contact.phonetic_name.is_none()
            && (phonetic_first.is_some() || phonetic_middle.is_some() || phonetic_last.is_some())
        {
            let (first, second) = match options.name_order {
                NameOrder::Japanese => (phonetic_last, phonetic_first),
                NameOrder::English => (phonetic_first, phonetic_last),
            };
            let phonetic: String = [first, phonetic_middle, second]
                .into_iter()
                .flatten()
                .collect();
            contact.phonetic_name = Some(phonetic);
        }
        if let Some(phonetic) = contact.phonetic_name.as_mut() {
            *phonetic = phonetic.trim().to_string();
        }

        if !pref.phone {
            if let Some(phone) = contact.phones.first_mut() {
                phone.is_primary = true;
            }
        }
        if !pref.address {
            if let Some(postal) = contact
                .contact_methods
                .iter_mut()
                .find(|m| m.kind == ContactKind::Postal)
            {
                postal.is_primary = true;
            }
        }
        if !pref.email {
            if let Some(email) = contact
                .contact_methods
                .iter_mut()
                .find(|m| m.kind == ContactKind::Email)
            {
                email.is_primary = true;
            }
        }
        if !pref.organization {
            if let Some(org) = contact.organizations.first_mut() {
                org.is_primary = true;
            }
        }

        Some(contact)
    }
}

/// Join `N` parts: family, given, middle, prefix, suffix.
fn name_from_n_values(parts: &[String], order: NameOrder) -> String {
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => {
            let part = |i: usize| parts.get(i).map(String::as_str).unwrap_or("");
            let (first, second) = match order {
                NameOrder::Japanese => (part(0), part(1)),
                NameOrder::English => (part(1), part(0)),
            };
            [part(3), first, part(2), second, part(4)]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

fn add_address(
    contact: &mut Contact,
    property: &PropertyNode,
    order: AddressOrder,
    pref: &mut PrefState,
) {
    if property.values.iter().all(|v| v.is_empty()) {
        return;
    }

    let mut scan = TypeScan::<ContactMethodType>::default();
    for token in &property.param_types {
        if token == "PREF" {
            if !pref.address {
                pref.address = true;
                scan.primary = true;
            }
        } else if token.eq_ignore_ascii_case("HOME") {
            scan.kind = Some(ContactMethodType::Home);
            scan.label = None;
        } else if token.eq_ignore_ascii_case("WORK") || token.eq_ignore_ascii_case("COMPANY") {
            scan.kind = Some(ContactMethodType::Work);
            scan.label = None;
        } else if ["POSTAL", "PARCEL", "DOM", "INTL"]
            .iter()
            .any(|t| token.eq_ignore_ascii_case(t))
        {
            // delivery flags carry no type
        } else {
            scan.custom(ContactMethodType::Custom, token);
        }
    }

    let data = if property.values.len() > 1 {
        let parts: Vec<&str> = match order {
            AddressOrder::Western => property.values.iter().map(String::as_str).collect(),
            AddressOrder::Japanese => property.values.iter().rev().map(String::as_str).collect(),
        };
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    } else {
        property.value.clone()
    };

    contact.add_contact_method(
        ContactKind::Postal,
        scan.kind.unwrap_or(ContactMethodType::Home),
        data,
        Some(scan.label.unwrap_or_default()),
        scan.primary,
    );
}

fn add_email(contact: &mut Contact, property: &PropertyNode, pref: &mut PrefState) {
    let mut scan = TypeScan::<ContactMethodType>::default();
    for token in &property.param_types {
        if token == "PREF" {
            if !pref.email {
                pref.email = true;
                scan.primary = true;
            }
        } else if token.eq_ignore_ascii_case("HOME") {
            scan.kind = Some(ContactMethodType::Home);
        } else if token.eq_ignore_ascii_case("WORK") {
            scan.kind = Some(ContactMethodType::Work);
        } else if token.eq_ignore_ascii_case("CELL") {
            scan.kind = Some(ContactMethodType::Custom);
            scan.label = Some(MOBILE_EMAIL_TYPE_NAME.to_string());
        } else {
            scan.custom(ContactMethodType::Custom, token);
        }
    }

    contact.add_contact_method(
        ContactKind::Email,
        scan.kind.unwrap_or(ContactMethodType::Other),
        property.value.clone(),
        scan.label,
        scan.primary,
    );
}

fn add_tel(contact: &mut Contact, property: &PropertyNode, pref: &mut PrefState) {
    let mut scan = TypeScan::<PhoneType>::default();
    for token in &property.param_types {
        if token == "PREF" {
            if !pref.phone {
                pref.phone = true;
                scan.primary = true;
            }
        } else if token.eq_ignore_ascii_case("HOME") {
            scan.kind = Some(PhoneType::Home);
        } else if token.eq_ignore_ascii_case("WORK") {
            scan.kind = Some(PhoneType::Work);
        } else if token.eq_ignore_ascii_case("CELL") {
            scan.kind = Some(PhoneType::Mobile);
        } else if token.eq_ignore_ascii_case("PAGER") {
            scan.kind = Some(PhoneType::Pager);
        } else if token.eq_ignore_ascii_case("FAX") {
            scan.fax = true;
        } else if token.eq_ignore_ascii_case("VOICE") || token.eq_ignore_ascii_case("MSG") {
            // no type of their own
        } else {
            scan.custom(PhoneType::Custom, token);
        }
    }

    let phone_type = match (scan.kind.unwrap_or(PhoneType::Home), scan.fax) {
        (PhoneType::Home, true) => PhoneType::FaxHome,
        (PhoneType::Work, true) => PhoneType::FaxWork,
        (kind, _) => kind,
    };

    contact.add_phone(phone_type, &property.value, scan.label, scan.primary);
}

fn set_photo(contact: &mut Contact, property: &PropertyNode) {
    contact.photo_bytes = property.value_bytes.clone();
    let photo_type = property
        .param("TYPE")
        .map(str::to_string)
        .or_else(|| property.param_types.iter().next().cloned());
    if photo_type.is_some() {
        contact.photo_type = photo_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::VCardParser;

    fn contact_from(input: &str, options: ContactOptions) -> Contact {
        let nodes = VCardParser::new().parse(input).unwrap();
        Contact::from_vnode(&nodes[0], &options).unwrap()
    }

    #[test]
    fn test_not_a_vcard() {
        let node = VNode::new("VCALENDAR");
        assert!(Contact::from_vnode(&node, &ContactOptions::default()).is_none());
    }

    #[test]
    fn test_full_contact() {
        let contact = contact_from(
            "BEGIN:VCARD\r\n\
             VERSION:2.1\r\n\
             N:Doe;John;Q;Dr.;Jr.\r\n\
             TEL;CELL:555-123-4567\r\n\
             TEL;WORK;FAX;PREF:5559876543\r\n\
             EMAIL;INTERNET;HOME:john@example.com\r\n\
             ADR;WORK:;;1 Main St;Springfield;IL;62701;USA\r\n\
             ORG:Acme;R&D\r\n\
             TITLE:Engineer\r\n\
             NOTE:first note\r\n\
             URL:https://example.com\r\n\
             BDAY:1980-01-01\r\n\
             END:VCARD\r\n",
            ContactOptions::default(),
        );

        assert_eq!(contact.name, "Dr. John Q Doe Jr.");
        assert_eq!(contact.phones.len(), 2);
        assert_eq!(contact.phones[0].phone_type, PhoneType::Mobile);
        assert!(!contact.phones[0].is_primary);
        assert_eq!(contact.phones[1].phone_type, PhoneType::FaxWork);
        assert!(contact.phones[1].is_primary);
        assert_eq!(contact.phones[1].data, "555-987-6543");

        let email = contact.contact_methods_of(ContactKind::Email).next().unwrap();
        assert_eq!(email.method_type, ContactMethodType::Home);
        assert_eq!(email.label, None);
        assert!(email.is_primary);

        let postal = contact.contact_methods_of(ContactKind::Postal).next().unwrap();
        assert_eq!(postal.method_type, ContactMethodType::Work);
        assert_eq!(postal.data, "1 Main St Springfield IL 62701 USA");
        assert!(postal.is_primary);

        assert_eq!(contact.organizations.len(), 1);
        assert_eq!(contact.organizations[0].company_name, "Acme R&D");
        assert_eq!(contact.organizations[0].position_name.as_deref(), Some("Engineer"));
        assert!(contact.organizations[0].is_primary);

        assert_eq!(contact.notes, vec!["first note"]);
        assert_eq!(contact.website.as_deref(), Some("https://example.com"));
        assert!(contact.extensions.contains_key("BDAY"));
    }

    #[test]
    fn test_fn_wins_over_n() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nN:Doe;John\r\nFN:Johnny\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.name, "Johnny");
    }

    #[test]
    fn test_name_after_fn_is_an_extension() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Johnny\r\nNAME:Jonathan\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.name, "Johnny");
        assert_eq!(contact.extensions["NAME"].len(), 1);

        let contact = contact_from(
            "BEGIN:VCARD\r\nVERSION:3.0\r\nNAME:Jonathan\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.name, "Jonathan");
        assert!(!contact.extensions.contains_key("NAME"));
    }

    #[test]
    fn test_japanese_name_order() {
        let options = ContactOptions {
            name_order: NameOrder::Japanese,
            address_order: AddressOrder::Japanese,
        };
        let contact = contact_from(
            "BEGIN:VCARD\r\nN:Yamada;Taro\r\nADR:;;Street;City;;;Japan\r\nEND:VCARD\r\n",
            options,
        );
        assert_eq!(contact.name, "Yamada Taro");
        let postal = &contact.contact_methods[0];
        assert_eq!(postal.data, "Japan City Street");
        assert_eq!(postal.method_type, ContactMethodType::Home);
    }

    #[test]
    fn test_custom_labels() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nFN:x\r\nTEL;X-Boat:1234567\r\nEMAIL;CELL:m@x.y\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.phones[0].phone_type, PhoneType::Custom);
        assert_eq!(contact.phones[0].label.as_deref(), Some("Boat"));
        assert_eq!(contact.contact_methods[0].label.as_deref(), Some(MOBILE_EMAIL_TYPE_NAME));
    }

    #[test]
    fn test_phonetic_names() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:x\r\nX-PHONETIC-FIRST-NAME:Taro \r\nX-PHONETIC-LAST-NAME:Yamada\r\nEND:VCARD\r\n",
            ContactOptions {
                name_order: NameOrder::Japanese,
                ..Default::default()
            },
        );
        assert_eq!(contact.phonetic_name.as_deref(), Some("YamadaTaro"));

        let contact = contact_from(
            "BEGIN:VCARD\r\nFN:x\r\nSOUND;X-IRMC-N:Ya;ma;da\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.phonetic_name.as_deref(), Some("Yamada"));
    }

    #[test]
    fn test_photo_and_logo() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nFN:x\r\nLOGO;ENCODING=BASE64;TYPE=GIF:SGVsbG8=\r\n\r\nPHOTO;ENCODING=BASE64;JPEG:SGk=\r\n\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert_eq!(contact.photo_bytes.as_deref(), Some(&b"Hi"[..]));
        assert_eq!(contact.photo_type.as_deref(), Some("JPEG"));
    }

    #[test]
    fn test_defaults_primary_and_skips_empty() {
        let contact = contact_from(
            "BEGIN:VCARD\r\nFN:x\r\nNOTE:\r\nTEL:5551234\r\nTEL:5559999\r\nEND:VCARD\r\n",
            ContactOptions::default(),
        );
        assert!(contact.notes.is_empty());
        assert!(contact.phones[0].is_primary);
        assert!(!contact.phones[1].is_primary);
        assert_eq!(contact.phones[0].phone_type, PhoneType::Home);
    }

    #[test]
    fn test_name_from_n_parts() {
        let parts = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(name_from_n_values(&parts(&["Solo"]), NameOrder::English), "Solo");
        assert_eq!(name_from_n_values(&parts(&["Doe", "Jane"]), NameOrder::English), "Jane Doe");
        assert_eq!(name_from_n_values(&[], NameOrder::English), "");
    }
}
