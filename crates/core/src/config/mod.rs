//! Configuration loading and schema definitions
//!
//! `fs-vcard.toml` sections: `[parser]`, `[contact]`, `[composer]`,
//! `[logging]` and `[scan]`.

mod loader;
mod schema;

pub use loader::{Config, CONFIG_FILE_NAME};
pub use schema::*;
