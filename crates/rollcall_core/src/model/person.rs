//! Person model as seen by the check-in engine.
//!
//! # Responsibility
//! - Carry the display payload of a resolved identity.
//! - Normalize raw scanned tokens before lookup.
//!
//! # Invariants
//! - `token` is unique and assigned by the directory, never by core.
//! - Display fields are opaque to check-in logic.

use serde::{Deserialize, Serialize};

/// A known person, resolved from a scanned token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identifier encoded in the printed/displayed code.
    #[serde(rename = "idno")]
    pub token: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    pub course: String,
    pub level: String,
    /// Profile image file name managed by the directory, if any.
    pub image_filename: Option<String>,
}

impl Person {
    /// Returns "First Last" for user-facing messages.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Normalizes a raw scanned token.
///
/// Returns `None` when nothing but whitespace was scanned.
pub fn normalize_token(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
