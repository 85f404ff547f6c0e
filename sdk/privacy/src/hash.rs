//! SHA-256 helpers shared by every primitive.

use sha2::{Digest, Sha256};

/// Width of every hash, key and salt in the protocol.
pub const HASH_LEN: usize = 32;

/// SHA-256 of a single byte string.
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(data).into()
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// First four bytes as hex, for log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(bytes.get(..4).unwrap_or(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_matches_single_buffer() {
        let joined = [b"abc".as_slice(), b"def".as_slice()].concat();
        assert_eq!(sha256_concat(&[b"abc", b"def"]), sha256(&joined));
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&[0xde, 0xad, 0xbe, 0xef, 0x01]), "deadbeef");
        assert_eq!(short_hex(&[0x01]), "01");
    }
}
