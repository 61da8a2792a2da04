//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "fs-vcard.toml";

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path or use defaults
    ///
    /// An explicit path must exist. Without one, the standard locations are
    /// searched and defaults are used when none holds a file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };
        schema.validate()?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Load with defaults only (no file)
    pub fn defaults() -> Self {
        Self {
            schema: ConfigSchema::default(),
            path: None,
        }
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from(".fs-vcard.toml"),
        PathBuf::from(CONFIG_FILE_NAME),
        Path::new(".config").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .chain(dirs::config_dir().map(|dir| dir.join("fs-vcard").join("config.toml")))
        .find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let schema: ConfigSchema = toml::from_str(&content)?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert!(config.path.is_none());
        assert_eq!(config.schema.composer.version, "2.1");
    }

    #[test]
    fn test_config_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[contact]\nname_order = \"japanese\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.schema.contact.name_order, "japanese");
        assert_eq!(config.path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_config_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/fs-vcard.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser\nversion = ").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_config_load_invalid_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser]\ncharset = \"EBCDIC\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }
}
