//! Principal identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The authenticated identity that scopes which remote records are
/// visible and owned. Supplied by the caller's auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a principal id from a non-empty string.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidInput(
                "principal id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the string representation of this principal
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_or_blank() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("  \t ").is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = UserId::new("  alice  ").unwrap();
        assert_eq!(id.as_str(), "alice");
    }
}
