use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

const ID_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id is empty")]
    Empty,
    #[error("id '{0}' is not hex")]
    NotHex(String),
    #[error("id '{0}' is longer than 32 bytes")]
    TooLong(String),
}

fn normalize_hex_id(raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if body.is_empty() {
        return Err(IdError::Empty);
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdError::NotHex(raw.to_string()));
    }
    if body.len() > ID_HEX_LEN {
        return Err(IdError::TooLong(raw.to_string()));
    }
    Ok(format!(
        "0x{:0>width$}",
        body.to_ascii_lowercase(),
        width = ID_HEX_LEN
    ))
}

/// On-chain object identity, always stored in the long `0x` + 64 hex form so that
/// short ids such as `0x8` compare equal to what the chain reports.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

/// Account address. Same encoding as [`ObjectId`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

macro_rules! impl_hex_id {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                normalize_hex_id(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_hex_id!(ObjectId);
impl_hex_id!(Address);

/// Transaction digest as returned by the chain (base58, kept opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxDigest(String);

impl TxDigest {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the world contract assigns to a play once the commit transaction runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayId(pub u64);

impl fmt::Display for PlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PlayId)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn from_str__short_id__pads_to_full_width() {
        // when
        let id: ObjectId = "0x8".parse().unwrap();

        // then
        assert_eq!(
            id.as_str(),
            "0x0000000000000000000000000000000000000000000000000000000000000008"
        );
    }

    #[test]
    fn from_str__mixed_case_with_and_without_prefix__compare_equal() {
        // given
        let upper: Address = "0xABCDEF".parse().unwrap();
        let bare: Address = "abcdef".parse().unwrap();

        // then
        assert_eq!(upper, bare);
    }

    #[test]
    fn from_str__rejects_non_hex_and_empty() {
        assert_eq!("0x".parse::<ObjectId>(), Err(IdError::Empty));
        assert!(matches!(
            "0xnothex".parse::<ObjectId>(),
            Err(IdError::NotHex(_))
        ));
        let too_long = format!("0x{}", "a".repeat(65));
        assert!(matches!(
            too_long.parse::<ObjectId>(),
            Err(IdError::TooLong(_))
        ));
    }
}
