//! Error type shared by the WHS crates
//!
//! Covers local concerns only (config files, the role preference file).
//! Ledger failures have their own type in `whs-scan`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File exists but is not valid TOML for the expected shape
    #[error("Parse TOML failed: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Serialize TOML failed: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Value rejected during resolution (e.g. ledger URL without a scheme)
    #[error("Configuration error: {0}")]
    Config(String),
}
