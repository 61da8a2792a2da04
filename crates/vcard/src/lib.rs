//! vCard 2.1 / 3.0 toolkit for Foodshare contact imports.
//!
//! This crate provides:
//! - Line-oriented parsing into [`VNode`] records through the [`VBuilder`] callbacks
//! - Source device detection with charset estimation
//! - Mapping of records onto the [`Contact`] model, with NANP phone formatting
//! - Composition of contacts back into vCard text
//! - Quoted-printable, Base64 and charset codecs
//!
//! # Example
//!
//! ```
//! use foodshare_vcard::{parse_contacts, ContactOptions, VCardComposer, Version};
//!
//! let input = "BEGIN:VCARD\r\nVERSION:2.1\r\nN:Doe;Jane\r\nTEL;CELL:5551234567\r\nEND:VCARD\r\n";
//! let contacts = parse_contacts(input, &ContactOptions::default()).unwrap();
//! assert_eq!(contacts[0].name, "Jane Doe");
//! assert_eq!(contacts[0].phones[0].data, "555-123-4567");
//!
//! let text = VCardComposer::create_vcard(&contacts[0], Version::V30).unwrap();
//! assert!(text.contains("TEL;TYPE=CELL:555-123-4567"));
//! ```

mod builder;
mod charset;
mod codec;
mod composer;
mod contact;
mod detector;
mod error;
mod node;
mod parser;

pub use builder::{BuilderOptions, VBuilder, VDataBuilder};
pub use charset::Charset;
pub use codec::{decode_base64, decode_quoted_printable, encode_base64_chunked, BASE64_LINE_LENGTH};
pub use composer::VCardComposer;
pub use contact::{
    format_number, AddressOrder, Contact, ContactKind, ContactMethod, ContactMethodType,
    ContactOptions, NameOrder, OrganizationData, OrganizationType, PhoneData, PhoneType,
    MOBILE_EMAIL_TYPE_NAME,
};
pub use detector::{SourceType, VCardSourceDetector};
pub use error::{Result, VCardError, VCardErrorCode};
pub use node::{PropertyNode, VNode};
pub use parser::{ParseStats, ParserOptions, VCardParser, Version, VersionedParser};

/// Parse vCard text and map every `VCARD` record to a contact.
///
/// Records of other types are skipped.
pub fn parse_contacts(input: &str, options: &ContactOptions) -> Result<Vec<Contact>> {
    let nodes = VCardParser::new().parse(input)?;
    Ok(nodes
        .iter()
        .filter_map(|node| Contact::from_vnode(node, options))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contacts_multiple_records() {
        let input = "BEGIN:VCARD\r\nFN:One\r\nEND:VCARD\r\n\
                     BEGIN:VCARD\r\nFN:Two\r\nEMAIL:two@example.com\r\nEND:VCARD\r\n";
        let contacts = parse_contacts(input, &ContactOptions::default()).unwrap();
        let names: Vec<_> = contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert!(contacts[1].contact_methods[0].is_primary);
    }

    #[test]
    fn test_parse_contacts_error() {
        let err = parse_contacts("BEGIN:VCARD\r\nFN:x\r\n", &ContactOptions::default()).unwrap_err();
        assert_eq!(err.code(), VCardErrorCode::ParseFailed);
    }
}
