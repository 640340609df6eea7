use crate::commitment::PlayKey;
use chain::{
    ObjectId,
    PlayId,
    TxDigest,
};
use indexer::world::TilePosition;
use serde::{
    Deserialize,
    Serialize,
};

/// Where the manager is in the commit-reveal protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Committing,
    /// committed on chain, play id not known yet
    PendingIndex,
    Active { found: bool },
    Redeeming,
    Closed,
    /// an unfinished session was found in the store at startup
    Recovering,
}

/// One play between commit and redemption. Everything needed to claim it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub play_id: Option<PlayId>,
    pub key: PlayKey,
    pub world_id: ObjectId,
    pub found: bool,
    pub digest: Option<TxDigest>,
}

impl Session {
    pub fn pending(key: PlayKey, world_id: ObjectId, digest: TxDigest) -> Self {
        Self {
            play_id: None,
            key,
            world_id,
            found: false,
            digest: Some(digest),
        }
    }

    pub fn active(play_id: PlayId, key: PlayKey, world_id: ObjectId) -> Self {
        Self {
            play_id: Some(play_id),
            key,
            world_id,
            found: false,
            digest: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.play_id {
            None => SessionPhase::PendingIndex,
            Some(_) => SessionPhase::Active { found: self.found },
        }
    }
}

/// The hidden tile the player is looking for in the current play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayTarget {
    pub x: u32,
    pub y: u32,
    pub world_id: ObjectId,
    pub found: bool,
}

impl PlayTarget {
    pub fn new(position: TilePosition, world_id: ObjectId) -> Self {
        Self {
            x: position.x,
            y: position.y,
            world_id,
            found: false,
        }
    }

    pub fn is_at(&self, x: u32, y: u32) -> bool {
        self.x == x && self.y == y
    }
}
