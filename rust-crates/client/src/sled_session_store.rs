// Sled-backed play session store. Shares the database with the world map cache,
// in its own tree.
use crate::{
    session::{
        PlayTarget,
        Session,
    },
    session_store::{
        PLAY_STATE_KEY,
        PLAY_TARGET_KEY,
        SessionStore,
        decode_session,
        decode_target,
        encode_session,
    },
};
use anyhow::Context;
use sled::{
    Db,
    Tree,
};

const SESSION_TREE: &str = "play_session";

#[derive(Clone)]
pub struct SledSessionStore {
    tree: Tree,
}

impl SledSessionStore {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let tree = db
            .open_tree(SESSION_TREE)
            .context("open play_session tree")?;
        Ok(Self { tree })
    }

    fn write(&self, key: &[u8], bytes: Vec<u8>, label: &str) -> crate::Result<()> {
        self.tree
            .insert(key, bytes)
            .with_context(|| format!("persist {label}"))?;
        self.tree.flush().with_context(|| format!("flush {label}"))?;
        Ok(())
    }
}

impl SessionStore for SledSessionStore {
    fn save(&mut self, session: &Session) -> crate::Result<()> {
        self.write(PLAY_STATE_KEY, encode_session(session)?, "play state")
    }

    fn load(&self) -> crate::Result<Option<Session>> {
        let value = self.tree.get(PLAY_STATE_KEY).context("read play state")?;
        Ok(value.and_then(|bytes| decode_session(bytes.as_ref())))
    }

    fn clear(&mut self) -> crate::Result<()> {
        self.tree
            .remove(PLAY_STATE_KEY)
            .context("remove play state")?;
        self.tree
            .remove(PLAY_TARGET_KEY)
            .context("remove play target")?;
        self.tree.flush().context("flush play session")?;
        Ok(())
    }

    fn save_target(&mut self, target: &PlayTarget) -> crate::Result<()> {
        let bytes = serde_json::to_vec(target).context("serialize play target")?;
        self.write(PLAY_TARGET_KEY, bytes, "play target")
    }

    fn load_target(&self) -> crate::Result<Option<PlayTarget>> {
        let value = self.tree.get(PLAY_TARGET_KEY).context("read play target")?;
        Ok(value.and_then(|bytes| decode_target(bytes.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::commitment::PlayKey;
    use chain::{
        PlayId,
        test_helpers::object_id,
    };
    use indexer::app::{
        sled_storage::{
            SledSnapshotStorage,
            open_db,
        },
        snapshot_storage::SnapshotStorage,
    };
    use tempdir::TempDir;

    fn session() -> Session {
        Session::active(PlayId(7), PlayKey::from_bytes([3; 16]), object_id(0xee))
    }

    #[test]
    fn sut__when_saving_session_then_fresh_handle_loads_it() {
        // given
        let temp_dir = TempDir::new("sled_session").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        SledSessionStore::new(&db).unwrap().save(&session()).unwrap();

        // when
        let store = SledSessionStore::new(&db).unwrap();

        // then
        assert_eq!(store.load().unwrap(), Some(session()));
    }

    #[test]
    fn sut__when_clearing_then_session_and_target_are_gone() {
        // given
        let temp_dir = TempDir::new("sled_session_clear").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        let mut store = SledSessionStore::new(&db).unwrap();
        store.save(&session()).unwrap();
        store
            .save_target(&PlayTarget {
                x: 1,
                y: 2,
                world_id: object_id(0xee),
                found: false,
            })
            .unwrap();

        // when
        store.clear().unwrap();

        // then
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load_target().unwrap(), None);
    }

    #[test]
    fn sut__when_stored_bytes_are_corrupt_then_load_is_none() {
        // given
        let temp_dir = TempDir::new("sled_session_corrupt").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        let store = SledSessionStore::new(&db).unwrap();
        db.open_tree(SESSION_TREE)
            .unwrap()
            .insert(PLAY_STATE_KEY, b"{\"playId\": 7".as_slice())
            .unwrap();

        // when
        let loaded = store.load().unwrap();

        // then
        assert!(loaded.is_none());
    }

    #[test]
    fn sut__when_clearing_session_then_world_cache_is_kept() {
        // given
        let temp_dir = TempDir::new("sled_session_shared").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        let mut store = SledSessionStore::new(&db).unwrap();
        let mut cache = SledSnapshotStorage::new(&db).unwrap();
        let map = indexer::world::WorldMap {
            world_id: object_id(0xee),
            grid: indexer::world::WorldGrid::compose(&[]),
            difficulty: 1,
            chunk_count: 0,
        };
        cache.update_world_map(&map).unwrap();
        store.save(&session()).unwrap();

        // when
        store.clear().unwrap();

        // then
        assert_eq!(cache.latest_world_map().unwrap(), Some(map));
    }
}
