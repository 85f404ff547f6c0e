//! Public accounts and asset references.
//!
//! The asset reference binds a note to one fungible token. It is the token's
//! 20-byte address left-padded with zeros to 32 bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::HASH_LEN;

/// Width of a public ledger address.
pub const ADDRESS_LEN: usize = 20;

const PAD_LEN: usize = HASH_LEN - ADDRESS_LEN;

/// Errors from parsing hex-encoded identifiers
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ParseError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(trimmed)?)
}

/// A public ledger account (token holder, payer, or burn recipient)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse `0x`-prefixed or bare hex
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| ParseError::Length {
            expected: ADDRESS_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Fixed-width identifier of the underlying fungible asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetReference(pub [u8; HASH_LEN]);

impl AssetReference {
    /// Left-pad a token address to the 32-byte reference used in commitments
    pub fn from_address(address: &Address) -> Self {
        let mut arr = [0u8; HASH_LEN];
        arr[PAD_LEN..].copy_from_slice(&address.0);
        Self(arr)
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse either a 20-byte address (padded) or a full 32-byte reference
    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = decode_hex(s)?;
        match bytes.len() {
            ADDRESS_LEN => Address::from_hex(s).map(|a| Self::from_address(&a)),
            HASH_LEN => {
                let mut arr = [0u8; HASH_LEN];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }
            actual => Err(ParseError::Length {
                expected: HASH_LEN,
                actual,
            }),
        }
    }

    /// The token address, if this reference is a padded address
    pub fn address(&self) -> Option<Address> {
        let (pad, tail) = self.0.split_at(PAD_LEN);
        if pad.iter().any(|b| *b != 0) {
            return None;
        }
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(tail);
        Some(Address(arr))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_matches_left_pad() {
        let addr = Address([0xaa; 20]);
        let asset = AssetReference::from_address(&addr);
        assert_eq!(&asset.0[..12], &[0u8; 12]);
        assert_eq!(&asset.0[12..], &[0xaa; 20]);
        assert_eq!(asset.address(), Some(addr));
    }

    #[test]
    fn test_unpadded_reference_has_no_address() {
        let asset = AssetReference([0xff; 32]);
        assert_eq!(asset.address(), None);
    }

    #[test]
    fn test_parse_hex_forms() {
        let short = AssetReference::from_hex("0x00000000000000000000000000000000000000ff").unwrap();
        let long = AssetReference::from_hex(
            "00000000000000000000000000000000000000000000000000000000000000ff",
        )
        .unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_parse_bad_length() {
        let err = Address::from_hex("0x1234").unwrap_err();
        assert_eq!(
            err,
            ParseError::Length {
                expected: 20,
                actual: 2
            }
        );
    }
}
