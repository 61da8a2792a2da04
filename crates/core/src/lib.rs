//! Core utilities for Foodshare vCard tools
//!
//! This crate provides shared functionality used by the `fs-vcard` binary:
//!
//! - **Error handling**: Errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation
//! - **File scanning**: vCard file discovery with filtering
//!
//! # Example
//!
//! ```rust,no_run
//! use foodshare_core::{config::Config, file_scanner::FileScanner};
//!
//! let config = Config::load(None)?;
//! let files = FileScanner::from_config(".", &config.schema.scan)?.scan()?;
//! println!("{} vCard files", files.len());
//! # Ok::<(), foodshare_core::Error>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod file_scanner;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::file_scanner::{scan_vcard_files, FileScanner};
}
