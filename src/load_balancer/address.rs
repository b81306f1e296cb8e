//! Address key wrapper.
//!
//! The address feed hands out opaque network identifiers. The inventory only
//! relies on equality, so they are wrapped in a dedicated key type that the
//! map can hash without knowing anything about the underlying format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque network address of a candidate server (e.g. "10.0.0.7:5000").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap a raw address string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for Address {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}
