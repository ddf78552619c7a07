//! Address types for vault participants
//!
//! Every participant the vault deals with (holders, spenders, the custodian,
//! the owner, operators and the vault itself) is identified by an opaque
//! address string. The vault never interprets the contents beyond equality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing an address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must not be empty")]
    Empty,

    #[error("Address must not contain whitespace: {0:?}")]
    Whitespace(String),
}

/// Opaque participant address
///
/// Format is host-defined (e.g. "0x2260FAC5..." on an EVM host, a bech32
/// string elsewhere). Serialized as a bare string; deserialization applies the
/// same validation as [`Address::try_new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Try to create an address, rejecting empty or whitespace-bearing input
    pub fn try_new(addr: impl Into<String>) -> Result<Self, AddressError> {
        let s = addr.into();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(AddressError::Whitespace(s));
        }
        Ok(Self(s))
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_creation() {
        let addr = Address::try_new("0xabc").unwrap();
        assert_eq!(addr.as_str(), "0xabc");
        assert_eq!(addr.to_string(), "0xabc");
    }

    #[test]
    fn test_address_try_new_rejects_empty() {
        assert_eq!(Address::try_new(""), Err(AddressError::Empty));
    }

    #[test]
    fn test_address_try_new_rejects_whitespace() {
        assert!(matches!(
            Address::try_new("0x ab"),
            Err(AddressError::Whitespace(_))
        ));
    }

    #[test]
    fn test_address_parse() {
        let addr: Address = "custodian".parse().unwrap();
        assert_eq!(addr, Address::try_new("custodian").unwrap());
    }

    #[test]
    fn test_address_serialization() {
        let addr = Address::try_new("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599\"");

        let deserialized: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, deserialized);
    }

    #[test]
    fn test_address_deserialization_validates() {
        assert!(serde_json::from_str::<Address>("\"\"").is_err());
    }

    #[test]
    fn test_address_ordering_is_lexicographic() {
        let mut addrs = vec![Address::try_new("carol").unwrap(), Address::try_new("alice").unwrap(), Address::try_new("bob").unwrap()];
        addrs.sort();
        assert_eq!(addrs[0].as_str(), "alice");
        assert_eq!(addrs[2].as_str(), "carol");
    }
}
