//! Decoded label identifiers
//!
//! Camera-decoded strings carry a tag prefix naming the kind of label:
//! `BOX:` for box labels, `LOC:` for shelf location labels. The remainder
//! after the prefix is the identifier passed to the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Box label prefix
pub const BOX_PREFIX: &str = "BOX:";

/// Location label prefix
pub const LOCATION_PREFIX: &str = "LOC:";

/// Kind of label a decoded string identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Box,
    Location,
}

impl ScanKind {
    /// Wire prefix for this kind
    pub fn prefix(self) -> &'static str {
        match self {
            ScanKind::Box => BOX_PREFIX,
            ScanKind::Location => LOCATION_PREFIX,
        }
    }

    /// Classify a raw decoded string by prefix
    ///
    /// Returns the kind and the identifier with the prefix stripped, or
    /// `None` when the string carries neither known prefix.
    pub fn classify(raw: &str) -> Option<(ScanKind, &str)> {
        if let Some(rest) = raw.strip_prefix(BOX_PREFIX) {
            Some((ScanKind::Box, rest))
        } else {
            raw.strip_prefix(LOCATION_PREFIX)
                .map(|rest| (ScanKind::Location, rest))
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Box => write!(f, "box"),
            ScanKind::Location => write!(f, "location"),
        }
    }
}

/// A validated scan, consumed exactly once by the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub kind: ScanKind,
    pub id: String,
}

impl ScanResult {
    pub fn new(kind: ScanKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}
