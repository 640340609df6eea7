use anyhow::{
    Context,
    anyhow,
};
use chain::{
    Address,
    ObjectId,
    WORLD_MODULE,
    fields::{
        self,
        Fields,
    },
    rpc::{
        Coin,
        ObjectData,
        ObjectReader,
    },
};
use serde::Serialize;
use std::{
    fmt,
    str::FromStr,
};

pub const FREE_PLAYS_PER_DAY: u64 = 2;
pub const PAID_PLAYS_PER_DAY: u64 = 3;
/// Reward coin base units charged by a paid play.
pub const PLAY_FEE: u64 = 5;
const CHARACTER_STRUCT: &str = "CharacterNFT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayMode {
    /// `play_v1`, no fee
    Free,
    /// `play_v2`, pays [`PLAY_FEE`]
    Paid,
}

impl PlayMode {
    pub fn entry_function(self) -> &'static str {
        match self {
            PlayMode::Free => "play_v1",
            PlayMode::Paid => "play_v2",
        }
    }

    pub fn daily_limit(self) -> u64 {
        match self {
            PlayMode::Free => FREE_PLAYS_PER_DAY,
            PlayMode::Paid => PAID_PLAYS_PER_DAY,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayMode::Free => write!(f, "free"),
            PlayMode::Paid => write!(f, "paid"),
        }
    }
}

impl FromStr for PlayMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" | "v1" => Ok(PlayMode::Free),
            "paid" | "v2" => Ok(PlayMode::Paid),
            other => Err(anyhow!("unknown play mode '{other}', expected free or paid")),
        }
    }
}

/// The player's character object and today's play counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: ObjectId,
    pub name: String,
    pub health: u64,
    pub power: u64,
    pub potential: u64,
    pub free_daily_plays: u64,
    pub daily_plays: u64,
}

impl Character {
    pub fn from_object(object: &ObjectData) -> Self {
        let empty = Fields::new();
        let record = fields::normalize_fields(&object.fields).unwrap_or(&empty);
        let number = |names: &[&str], default: u64| {
            fields::field(record, names)
                .and_then(fields::parse_u64)
                .unwrap_or(default)
        };
        Self {
            id: object.object_id.clone(),
            name: fields::string_field(record, &["name"]).unwrap_or_default(),
            health: number(&["health"], 100),
            power: number(&["power"], 0),
            potential: number(&["potential"], 0),
            free_daily_plays: number(&["free_daily_plays", "freeDailyPlays"], 0),
            daily_plays: number(&["daily_plays", "dailyPlays"], 0),
        }
    }

    pub fn plays_used(&self, mode: PlayMode) -> u64 {
        match mode {
            PlayMode::Free => self.free_daily_plays,
            PlayMode::Paid => self.daily_plays,
        }
    }

    pub fn plays_left(&self, mode: PlayMode) -> u64 {
        mode.daily_limit().saturating_sub(self.plays_used(mode))
    }
}

pub fn character_type(package: &ObjectId) -> String {
    format!("{package}::{WORLD_MODULE}::{CHARACTER_STRUCT}")
}

/// First character owned by `owner`, if any.
pub async fn load_character<R: ObjectReader>(
    reader: &R,
    package: &ObjectId,
    owner: &Address,
) -> anyhow::Result<Option<Character>> {
    let owned = reader
        .owned_objects(owner, &character_type(package))
        .await
        .with_context(|| format!("loading character of {owner}"))?;
    Ok(owned.first().map(Character::from_object))
}

/// A single coin that covers the play fee on its own.
pub async fn fee_coin<R: ObjectReader>(
    reader: &R,
    owner: &Address,
    coin_type: &str,
) -> anyhow::Result<Option<Coin>> {
    let coins = reader
        .coins(owner, coin_type)
        .await
        .with_context(|| format!("loading {coin_type} coins"))?;
    Ok(coins.into_iter().find(|coin| coin.balance >= PLAY_FEE))
}

pub async fn reward_balance<R: ObjectReader>(
    reader: &R,
    owner: &Address,
    coin_type: &str,
) -> anyhow::Result<u128> {
    let coins = reader
        .coins(owner, coin_type)
        .await
        .with_context(|| format!("loading {coin_type} coins"))?;
    Ok(coins.iter().map(|coin| u128::from(coin.balance)).sum())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use chain::test_helpers::object_id;
    use serde_json::json;

    #[test]
    fn from_object__reads_counters_from_wrapped_fields() {
        // given
        let object = ObjectData {
            object_id: object_id(0xc1),
            object_type: None,
            fields: json!({ "fields": {
                "name": "Ada",
                "power": "12",
                "free_daily_plays": 2,
                "daily_plays": "1",
            }}),
        };

        // when
        let character = Character::from_object(&object);

        // then
        assert_eq!(character.name, "Ada");
        assert_eq!(character.health, 100);
        assert_eq!(character.power, 12);
        assert_eq!(character.plays_left(PlayMode::Free), 0);
        assert_eq!(character.plays_left(PlayMode::Paid), 2);
    }

    #[test]
    fn play_mode__parses_aliases() {
        assert_eq!("v1".parse::<PlayMode>().unwrap(), PlayMode::Free);
        assert_eq!("Paid".parse::<PlayMode>().unwrap(), PlayMode::Paid);
        assert!("gold".parse::<PlayMode>().is_err());
    }
}
