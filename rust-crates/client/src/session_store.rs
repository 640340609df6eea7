use crate::{
    commitment::PlayKey,
    session::{
        PlayTarget,
        Session,
    },
};
use anyhow::{
    Context,
    anyhow,
};
use chain::{
    ObjectId,
    PlayId,
    TxDigest,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const PLAY_STATE_KEY: &[u8] = b"PLAY_STATE";
pub const PLAY_TARGET_KEY: &[u8] = b"PLAY_TARGET";
const PENDING_PLAY_ID: &str = "pending";

/// Durable local copy of the one unfinished play. Unreadable records load as `None`.
pub trait SessionStore {
    fn save(&mut self, session: &Session) -> crate::Result<()>;

    fn load(&self) -> crate::Result<Option<Session>>;

    /// removes both the session and its target
    fn clear(&mut self) -> crate::Result<()>;

    fn save_target(&mut self, target: &PlayTarget) -> crate::Result<()>;

    fn load_target(&self) -> crate::Result<Option<PlayTarget>>;
}

/// On-disk form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlayState {
    /// decimal play id, or `"pending"` until the commit is indexed
    pub play_id: String,
    pub key_hex: String,
    pub world_id: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl From<&Session> for StoredPlayState {
    fn from(session: &Session) -> Self {
        Self {
            play_id: session
                .play_id
                .map_or_else(|| PENDING_PLAY_ID.to_string(), |id| id.to_string()),
            key_hex: session.key.to_hex(),
            world_id: session.world_id.to_string(),
            found: session.found,
            digest: session.digest.as_ref().map(|d| d.to_string()),
        }
    }
}

impl TryFrom<StoredPlayState> for Session {
    type Error = anyhow::Error;

    fn try_from(stored: StoredPlayState) -> Result<Self, Self::Error> {
        let play_id = match stored.play_id.as_str() {
            PENDING_PLAY_ID => None,
            raw => Some(
                raw.parse::<PlayId>()
                    .with_context(|| format!("stored play id '{raw}'"))?,
            ),
        };
        let key = PlayKey::from_hex(&stored.key_hex).context("stored key")?;
        let world_id: ObjectId = stored.world_id.parse().context("stored world id")?;
        let digest = stored.digest.filter(|d| !d.is_empty()).map(TxDigest::new);
        if play_id.is_none() && digest.is_none() {
            return Err(anyhow!("pending play has no transaction digest"));
        }
        Ok(Session {
            play_id,
            key,
            world_id,
            found: stored.found && play_id.is_some(),
            digest,
        })
    }
}

pub(crate) fn encode_session(session: &Session) -> crate::Result<Vec<u8>> {
    serde_json::to_vec(&StoredPlayState::from(session)).context("serialize play state")
}

/// `None` (with a warning) for anything that does not decode into a usable session.
pub(crate) fn decode_session(bytes: &[u8]) -> Option<Session> {
    let decoded = serde_json::from_slice::<StoredPlayState>(bytes)
        .context("deserialize play state")
        .and_then(Session::try_from);
    match decoded {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("ignoring unreadable play state: {e:#}");
            None
        }
    }
}

pub(crate) fn decode_target(bytes: &[u8]) -> Option<PlayTarget> {
    match serde_json::from_slice::<PlayTarget>(bytes) {
        Ok(target) => Some(target),
        Err(e) => {
            tracing::warn!("ignoring unreadable play target: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use chain::test_helpers::object_id;
    use serde_json::json;

    fn key() -> PlayKey {
        PlayKey::from_bytes([0x11; 16])
    }

    #[test]
    fn encode_session__pending_play__stores_pending_marker_and_digest() {
        // given
        let session = Session::pending(key(), object_id(0xee), TxDigest::new("0xAA"));

        // when
        let bytes = encode_session(&session).unwrap();

        // then
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["playId"], json!("pending"));
        assert_eq!(value["keyHex"], json!("11".repeat(16)));
        assert_eq!(value["worldId"], json!(object_id(0xee).to_string()));
        assert_eq!(value["found"], json!(false));
        assert_eq!(value["digest"], json!("0xAA"));
        assert_eq!(decode_session(&bytes), Some(session));
    }

    #[test]
    fn decode_session__active_play_without_digest__loads() {
        let bytes = serde_json::to_vec(&json!({
            "playId": "7",
            "keyHex": "11".repeat(16),
            "worldId": object_id(0xee).to_string(),
            "found": true,
        }))
        .unwrap();

        let session = decode_session(&bytes).unwrap();

        assert_eq!(session.play_id, Some(PlayId(7)));
        assert!(session.found);
        assert_eq!(session.digest, None);
    }

    #[test]
    fn decode_session__malformed_records__are_none() {
        let bad_key = json!({
            "playId": "7",
            "keyHex": "abc",
            "worldId": object_id(0xee).to_string(),
            "found": false,
        });
        let pending_without_digest = json!({
            "playId": "pending",
            "keyHex": "11".repeat(16),
            "worldId": object_id(0xee).to_string(),
            "found": false,
        });

        assert_eq!(decode_session(b"{not json"), None);
        assert_eq!(decode_session(&serde_json::to_vec(&bad_key).unwrap()), None);
        assert_eq!(
            decode_session(&serde_json::to_vec(&pending_without_digest).unwrap()),
            None
        );
    }

    #[test]
    fn decode_target__camel_case_layout() {
        let bytes = serde_json::to_vec(&json!({
            "x": 3,
            "y": 4,
            "worldId": object_id(0xee).to_string(),
            "found": false,
        }))
        .unwrap();

        let target = decode_target(&bytes).unwrap();

        assert!(target.is_at(3, 4));
        assert_eq!(decode_target(b"[]"), None);
    }
}
