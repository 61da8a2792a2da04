//! vCard 2.1 / 3.0 composition from a [`Contact`].

use crate::codec::encode_base64_chunked;
use crate::contact::{Contact, ContactKind, ContactMethod, ContactMethodType, PhoneData, PhoneType};
use crate::error::{Result, VCardError};
use crate::parser::Version;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::debug;

/// Labels that may be written as an EMAIL type.
static EMAIL_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "CELL", "AOL", "APPLELINK", "ATTMAIL", "CIS", "EWORLD", "INTERNET", "IBMMAIL", "MCIMAIL",
        "POWERSHARE", "PRODIGY", "TLX", "X400",
    ]
    .into_iter()
    .collect()
});

/// Labels that may be written as a TEL type.
static PHONE_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "PREF", "WORK", "HOME", "VOICE", "FAX", "MSG", "CELL", "PAGER", "BBS", "MODEM", "CAR",
        "ISDN", "VIDEO",
    ]
    .into_iter()
    .collect()
});

/// Writes contacts as vCard text.
#[derive(Debug, Clone, Copy, Default)]
pub struct VCardComposer;

impl VCardComposer {
    /// Compose one `VCARD` record.
    ///
    /// # Arguments
    /// * `contact` - Contact to write; its name must not be blank
    /// * `version` - Output version (CRLF line ends for 2.1, LF for 3.0)
    ///
    /// # Returns
    /// The record text, ending with `END:VCARD` and a line break
    pub fn create_vcard(contact: &Contact, version: Version) -> Result<String> {
        if is_blank(&contact.name) {
            return Err(VCardError::ComposeEmptyName);
        }

        let mut out = Output::new(version);
        out.line("BEGIN:VCARD");
        out.line(&format!("VERSION:{}", version.as_str()));
        out.line(&format!("FN:{}", contact.name));
        out.line(&format!("N:{}", contact.name));

        if let Some(company) = non_blank(contact.company.as_deref()) {
            out.line(&format!("ORG:{company}"));
        }
        if let Some(note) = non_blank(contact.notes.first().map(String::as_str)) {
            out.folded("NOTE:", note);
        }
        if let Some(title) = non_blank(contact.title.as_deref()) {
            out.folded("TITLE:", title);
        }
        if let Some(bytes) = &contact.photo_bytes {
            out.photo(bytes, contact.photo_type.as_deref());
        }

        out.phones(&contact.phones);
        out.contact_methods(&contact.contact_methods);

        if let Some(website) = non_blank(contact.website.as_deref()) {
            out.folded("URL:", website);
        }

        out.line("END:VCARD");
        debug!("Composed vCard {} for {}", version, contact.name);
        Ok(out.buf)
    }
}

struct Output {
    version: Version,
    newline: &'static str,
    buf: String,
}

impl Output {
    fn new(version: Version) -> Self {
        let newline = match version {
            Version::V21 => "\r\n",
            Version::V30 => "\n",
        };
        Self {
            version,
            newline,
            buf: String::new(),
        }
    }

    /// Separator for types of the same number or address.
    fn join_mark(&self) -> &'static str {
        match self.version {
            Version::V21 => ";",
            Version::V30 => ",",
        }
    }

    fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push_str(self.newline);
    }

    fn folded(&mut self, prefix: &str, text: &str) {
        let value = fold(text, self.version);
        self.buf.push_str(prefix);
        self.line(&value);
    }

    fn photo(&mut self, bytes: &[u8], photo_type: Option<&str>) {
        let value = fold(&encode_base64_chunked(bytes), self.version);
        let encoding = match self.version {
            Version::V21 => ";ENCODING=BASE64:",
            Version::V30 => ";ENCODING=b:",
        };
        self.buf.push_str("LOGO;TYPE=");
        self.buf.push_str(&photo_type_token(photo_type));
        self.buf.push_str(encoding);
        self.line(&value);
        if self.version == Version::V21 {
            // 2.1 Base64 values end with a blank line
            self.buf.push_str(self.newline);
        }
    }

    fn phones(&mut self, phones: &[PhoneData]) {
        let mut numbers = TypeGroups::default();
        for phone in phones.iter().filter(|p| !is_blank(&p.data)) {
            let mut token = phone_type_token(phone);
            if self.version == Version::V30 {
                token = token.replace(';', ",");
            }
            numbers.add(&phone.data, token, self.join_mark());
        }

        let prefix = match self.version {
            Version::V21 => "TEL;",
            Version::V30 => "TEL;TYPE=",
        };
        for (number, types) in numbers.entries {
            self.line(&format!("{prefix}{types}:{number}"));
        }
    }

    fn contact_methods(&mut self, methods: &[ContactMethod]) {
        let mut emails = TypeGroups::default();
        for method in methods.iter().filter(|m| !is_blank(&m.data)) {
            match method.kind {
                ContactKind::Email => {
                    emails.add(&method.data, email_type_token(method), self.join_mark());
                }
                ContactKind::Postal => self.folded("ADR;TYPE=POSTAL:", &method.data),
                _ => {}
            }
        }

        let prefix = match self.version {
            Version::V21 => "EMAIL;",
            Version::V30 => "EMAIL;TYPE=",
        };
        for (address, types) in emails.entries {
            self.line(&format!("{prefix}{types}:{address}"));
        }
    }
}

/// Type tokens grouped by value, in first-seen order.
#[derive(Default)]
struct TypeGroups {
    entries: Vec<(String, String)>,
}

impl TypeGroups {
    fn add(&mut self, value: &str, token: String, join_mark: &str) {
        match self.entries.iter_mut().find(|(v, _)| v == value) {
            Some((_, types)) => {
                types.push_str(join_mark);
                types.push_str(&token);
            }
            None => self.entries.push((value.to_string(), token)),
        }
    }
}

/// Drop one trailing line break, then continue each inner line with a
/// leading space.
fn fold(text: &str, version: Version) -> String {
    let text = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text);
    let text = text.replace("\r\n", "\n");
    match version {
        Version::V21 => text.replace('\n', "\r\n "),
        Version::V30 => text.replace('\n', "\n "),
    }
}

fn photo_type_token(photo_type: Option<&str>) -> String {
    let Some(photo_type) = non_blank(photo_type) else {
        return "JPEG".to_string();
    };
    let upper = photo_type.to_uppercase();
    if upper.contains("JPEG") {
        "JPEG".to_string()
    } else if upper.contains("GIF") {
        "GIF".to_string()
    } else if upper.contains("BMP") {
        "BMP".to_string()
    } else {
        // image/tiff -> TIFF
        match photo_type.split_once('/') {
            Some((_, subtype)) => subtype.to_uppercase(),
            None => upper,
        }
    }
}

fn phone_type_token(phone: &PhoneData) -> String {
    let token = match phone.phone_type {
        PhoneType::Home => "HOME",
        PhoneType::Mobile => "CELL",
        PhoneType::Work => "WORK",
        PhoneType::FaxWork => "WORK;FAX",
        PhoneType::FaxHome => "HOME;FAX",
        PhoneType::Pager => "PAGER",
        PhoneType::Other => "X-OTHER",
        PhoneType::Custom => {
            let label = phone.label.as_deref().unwrap_or("").to_uppercase();
            if PHONE_TYPES.contains(label.as_str()) || label.starts_with("X-") {
                return label;
            }
            return format!("X-CUSTOM-{label}");
        }
    };
    token.to_string()
}

fn email_type_token(method: &ContactMethod) -> String {
    match method.method_type {
        ContactMethodType::Home => "HOME".to_string(),
        ContactMethodType::Work => "WORK".to_string(),
        _ => {
            let label = method.label.as_deref().unwrap_or("").to_uppercase();
            if EMAIL_TYPES.contains(label.as_str()) {
                label
            } else {
                "INTERNET".to_string()
            }
        }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !is_blank(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Contact {
        let mut contact = Contact::new("Jane Doe");
        contact.company = Some("Acme".into());
        contact.notes.push("line one\nline two\n".into());
        contact.title = Some("Engineer".into());
        contact.add_phone(PhoneType::Mobile, "5551234567", None, true);
        contact.add_phone(PhoneType::FaxWork, "5551234567", None, false);
        contact.add_phone(PhoneType::Home, "5550000000", None, false);
        contact.add_phone(PhoneType::Home, "   ", None, false);
        contact.add_contact_method(
            ContactKind::Email,
            ContactMethodType::Work,
            "jane@acme.test",
            None,
            true,
        );
        contact.add_contact_method(
            ContactKind::Email,
            ContactMethodType::Custom,
            "jane@aol.test",
            Some("aol".into()),
            false,
        );
        contact.add_contact_method(
            ContactKind::Postal,
            ContactMethodType::Home,
            "1 Main St",
            None,
            true,
        );
        contact.website = Some("https://acme.test".into());
        contact
    }

    #[test]
    fn test_compose_v21() {
        let text = VCardComposer::create_vcard(&sample(), Version::V21).unwrap();
        let expected = "BEGIN:VCARD\r\n\
                        VERSION:2.1\r\n\
                        FN:Jane Doe\r\n\
                        N:Jane Doe\r\n\
                        ORG:Acme\r\n\
                        NOTE:line one\r\n line two\r\n\
                        TITLE:Engineer\r\n\
                        TEL;CELL;WORK;FAX:555-123-4567\r\n\
                        TEL;HOME:555-000-0000\r\n\
                        ADR;TYPE=POSTAL:1 Main St\r\n\
                        EMAIL;WORK:jane@acme.test\r\n\
                        EMAIL;AOL:jane@aol.test\r\n\
                        URL:https://acme.test\r\n\
                        END:VCARD\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_compose_v30_joins_with_commas() {
        let text = VCardComposer::create_vcard(&sample(), Version::V30).unwrap();
        assert!(text.starts_with("BEGIN:VCARD\nVERSION:3.0\n"));
        assert!(text.contains("TEL;TYPE=CELL,WORK,FAX:555-123-4567\n"));
        assert!(text.contains("EMAIL;TYPE=WORK:jane@acme.test\n"));
        assert!(text.contains("NOTE:line one\n line two\n"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_blank_name_rejected() {
        let contact = Contact::new("  ");
        let err = VCardComposer::create_vcard(&contact, Version::V21).unwrap_err();
        assert!(matches!(err, VCardError::ComposeEmptyName));
    }

    #[test]
    fn test_photo() {
        let mut contact = Contact::new("A");
        contact.photo_bytes = Some(b"Hello".to_vec());
        contact.photo_type = Some("image/png".into());

        let v21 = VCardComposer::create_vcard(&contact, Version::V21).unwrap();
        assert!(v21.contains("LOGO;TYPE=PNG;ENCODING=BASE64:SGVsbG8=\r\n\r\nEND:VCARD"));

        contact.photo_type = None;
        let v30 = VCardComposer::create_vcard(&contact, Version::V30).unwrap();
        assert!(v30.contains("LOGO;TYPE=JPEG;ENCODING=b:SGVsbG8=\nEND:VCARD"));
    }

    #[test]
    fn test_photo_type_token() {
        assert_eq!(photo_type_token(Some("image/jpeg")), "JPEG");
        assert_eq!(photo_type_token(Some("gif")), "GIF");
        assert_eq!(photo_type_token(Some("image/x-ms-bmp")), "BMP");
        assert_eq!(photo_type_token(Some("tiff")), "TIFF");
        assert_eq!(photo_type_token(Some(" ")), "JPEG");
    }

    #[test]
    fn test_phone_type_token_custom() {
        let phone = |label: &str| PhoneData {
            phone_type: PhoneType::Custom,
            data: "1".into(),
            label: Some(label.into()),
            is_primary: false,
        };
        assert_eq!(phone_type_token(&phone("car")), "CAR");
        assert_eq!(phone_type_token(&phone("x-boat")), "X-BOAT");
        assert_eq!(phone_type_token(&phone("boat")), "X-CUSTOM-BOAT");
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("a\r\nb\r\n", Version::V21), "a\r\n b");
        assert_eq!(fold("a\nb", Version::V30), "a\n b");
        assert_eq!(fold("plain", Version::V21), "plain");
    }

    #[test]
    fn test_round_trip_through_parser() {
        let mut contact = sample();
        contact.notes.clear();
        let text = VCardComposer::create_vcard(&contact, Version::V21).unwrap();
        let nodes = crate::parser::VCardParser::new().parse(&text).unwrap();
        let contact = Contact::from_vnode(&nodes[0], &Default::default()).unwrap();
        assert_eq!(contact.name, "Jane Doe");
        assert_eq!(contact.phones.len(), 2);
        assert_eq!(contact.website.as_deref(), Some("https://acme.test"));
    }
}
