//! Configuration schema definitions
//!
//! Every field has a default, so an empty file is a valid configuration.

use crate::error::{Error, Result};
use foodshare_vcard::{
    AddressOrder, Charset, ContactOptions, NameOrder, ParserOptions, Version,
};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub contact: ContactConfig,

    #[serde(default)]
    pub composer: ComposerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

impl ConfigSchema {
    /// Check every section, reporting the first invalid value
    pub fn validate(&self) -> Result<()> {
        self.parser.parser_options()?;
        self.contact.contact_options()?;
        self.composer.output_version()?;
        Ok(())
    }
}

/// Parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// `auto`, `2.1` or `3.0`
    #[serde(default = "default_version")]
    pub version: String,

    /// Charset of input files
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Quoted-printable soft breaks on CRLF only
    #[serde(default)]
    pub strict_line_breaks: bool,

    /// Run the source detector before parsing
    #[serde(default = "default_true")]
    pub detect_source: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            charset: default_charset(),
            strict_line_breaks: false,
            detect_source: true,
        }
    }
}

impl ParserConfig {
    /// Convert to library parser options
    pub fn parser_options(&self) -> Result<ParserOptions> {
        let version = parse_version(&self.version, "parser.version")?;
        let charset = Charset::from_label(&self.charset)
            .ok_or_else(|| Error::invalid_config_value("parser.charset", &self.charset))?;

        Ok(ParserOptions {
            version,
            charset,
            strict_line_breaks: self.strict_line_breaks,
            detect_source: self.detect_source,
        })
    }
}

fn default_version() -> String {
    "auto".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_true() -> bool {
    true
}

/// `auto` maps to `None`
fn parse_version(value: &str, key: &str) -> Result<Option<Version>> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    value
        .parse::<Version>()
        .map(Some)
        .map_err(|_| Error::invalid_config_value(key, value).with_suggestion("Use auto, 2.1 or 3.0"))
}

/// Contact mapping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// `english` or `japanese`
    #[serde(default = "default_order")]
    pub name_order: String,

    /// `western` or `japanese`
    #[serde(default = "default_address_order")]
    pub address_order: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            name_order: default_order(),
            address_order: default_address_order(),
        }
    }
}

impl ContactConfig {
    /// Convert to library contact options
    pub fn contact_options(&self) -> Result<ContactOptions> {
        let name_order = match self.name_order.to_ascii_lowercase().as_str() {
            "english" => NameOrder::English,
            "japanese" => NameOrder::Japanese,
            _ => return Err(Error::invalid_config_value("contact.name_order", &self.name_order)),
        };
        let address_order = match self.address_order.to_ascii_lowercase().as_str() {
            "western" => AddressOrder::Western,
            "japanese" => AddressOrder::Japanese,
            _ => {
                return Err(Error::invalid_config_value(
                    "contact.address_order",
                    &self.address_order,
                ));
            }
        };

        Ok(ContactOptions {
            name_order,
            address_order,
        })
    }
}

fn default_order() -> String {
    "english".to_string()
}

fn default_address_order() -> String {
    "western".to_string()
}

/// Composer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// `2.1` or `3.0`
    #[serde(default = "default_output_version")]
    pub version: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            version: default_output_version(),
        }
    }
}

impl ComposerConfig {
    /// Version written by `compose`
    pub fn output_version(&self) -> Result<Version> {
        self.version
            .parse::<Version>()
            .map_err(|_| Error::invalid_config_value("composer.version", &self.version))
    }
}

fn default_output_version() -> String {
    "2.1".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,

    /// Show the module target in log lines
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            show_target: false,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

/// Directory scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions treated as vCards
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns to skip
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["vcf".to_string(), "vcard".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_from_empty_file() {
        let schema: ConfigSchema = toml::from_str("").unwrap();
        assert_eq!(schema.parser.version, "auto");
        assert!(schema.parser.detect_source);
        assert_eq!(schema.scan.extensions, vec!["vcf", "vcard"]);
        assert_eq!(schema.logging.level, "warn");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_parser_options() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [parser]
            version = "3.0"
            charset = "latin1"
            strict_line_breaks = true
            "#,
        )
        .unwrap();

        let options = schema.parser.parser_options().unwrap();
        assert_eq!(options.version, Some(Version::V30));
        assert_eq!(options.charset, Charset::Iso8859_1);
        assert!(options.strict_line_breaks);
        assert!(options.detect_source);
    }

    #[test]
    fn test_contact_options() {
        let config = ContactConfig {
            name_order: "Japanese".into(),
            address_order: "japanese".into(),
        };
        let options = config.contact_options().unwrap();
        assert_eq!(options.name_order, NameOrder::Japanese);
        assert_eq!(options.address_order, AddressOrder::Japanese);
    }

    #[test]
    fn test_invalid_values() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [composer]
            version = "4.0"
            "#,
        )
        .unwrap();
        let err = schema.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);

        let parser = ParserConfig {
            charset: "klingon".into(),
            ..Default::default()
        };
        assert!(parser.parser_options().is_err());

        let parser = ParserConfig {
            version: "auto".into(),
            ..Default::default()
        };
        assert_eq!(parser.parser_options().unwrap().version, None);
    }
}
