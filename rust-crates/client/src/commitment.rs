//! The play secret and its published commitment.
//!
//! A play commits to `sha3_256(key)` on chain and later reveals `key` to claim the
//! reward. Whoever holds the key can claim, so it only ever leaves this type
//! through [`PlayKey::to_hex`] and [`PlayKey::as_bytes`].

use rand::Rng;
use sha3::{
    Digest,
    Sha3_256,
};
use std::fmt;
use thiserror::Error;

pub const KEY_LEN: usize = 16;
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key must be {KEY_HEX_LEN} hex characters, got {0}")]
    WrongLength(usize),
    #[error("key is not valid hex")]
    NotHex,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PlayKey([u8; KEY_LEN]);

impl PlayKey {
    /// Fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accepts exactly 32 hex characters, with or without a `0x` prefix.
    pub fn from_hex(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if body.len() != KEY_HEX_LEN {
            return Err(KeyError::WrongLength(body.len()));
        }
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| KeyError::NotHex)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn commitment(&self) -> Commitment {
        Commitment(Sha3_256::digest(self.0).into())
    }
}

impl fmt::Debug for PlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlayKey(<redacted>)")
    }
}

/// SHA3-256 of a [`PlayKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment([u8; 32]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn commitment__matches_sha3_of_key() {
        // given
        let key = PlayKey::from_bytes([7; KEY_LEN]);

        // when
        let commitment = key.commitment();

        // then
        let expected: [u8; 32] = Sha3_256::digest([7u8; KEY_LEN]).into();
        assert_eq!(commitment.as_bytes(), &expected);
        assert_ne!(&commitment.as_bytes()[..KEY_LEN], key.as_bytes());
    }

    #[test]
    fn commitment__empty_input_vector() {
        let digest: [u8; 32] = Sha3_256::digest(b"").into();
        assert_eq!(
            hex::encode(digest),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn from_hex__round_trips_with_prefix_and_whitespace() {
        let key = PlayKey::from_bytes([0xab; KEY_LEN]);

        let parsed = PlayKey::from_hex(&format!("  0x{} ", key.to_hex())).unwrap();

        assert_eq!(parsed, key);
    }

    #[test]
    fn from_hex__wrong_length__is_rejected() {
        assert_eq!(
            PlayKey::from_hex("abcd"),
            Err(KeyError::WrongLength(4))
        );
        assert_eq!(
            PlayKey::from_hex(&"0".repeat(34)),
            Err(KeyError::WrongLength(34))
        );
    }

    #[test]
    fn from_hex__non_hex__is_rejected() {
        assert_eq!(PlayKey::from_hex(&"z".repeat(32)), Err(KeyError::NotHex));
    }

    #[test]
    fn debug__does_not_reveal_key() {
        let key = PlayKey::from_bytes([0xcd; KEY_LEN]);

        let rendered = format!("{key:?}");

        assert!(!rendered.contains(&key.to_hex()));
        assert!(!rendered.contains("cd"));
    }

    #[test]
    fn generate__produces_distinct_keys() {
        assert_ne!(PlayKey::generate(), PlayKey::generate());
    }
}
