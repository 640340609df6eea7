// Sled-backed storage for reconciled snapshots and the world map cache.
use crate::{
    app::snapshot_storage::SnapshotStorage,
    snapshot::MarketplaceSnapshot,
    world::WorldMap,
};
use anyhow::Context;
use chain::ObjectId;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::path::Path;

const MARKETPLACE_KEY: &[u8] = b"marketplace";
const LATEST_WORLD_KEY: &[u8] = b"latest_world";

#[derive(Clone)]
pub struct SledSnapshotStorage {
    marketplace_tree: Tree,
    world_tree: Tree,
    world_meta: Tree,
}

impl SledSnapshotStorage {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let marketplace_tree = db
            .open_tree("marketplace_snapshot")
            .context("open marketplace_snapshot tree")?;
        let world_tree = db
            .open_tree("world_map_cache")
            .context("open world_map_cache tree")?;
        let world_meta = db
            .open_tree("world_map_cache_meta")
            .context("open world_map_cache_meta tree")?;

        Ok(Self {
            marketplace_tree,
            world_tree,
            world_meta,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let db = open_db(path)?;
        Self::new(&db)
    }

    fn serialize_record<T: Serialize>(value: &T, label: &str) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(value).with_context(|| format!("serialize {label}"))
    }

    /// Cached data that no longer decodes is treated as absent.
    fn cached<T: DeserializeOwned>(tree: &Tree, key: &[u8], label: &str) -> crate::Result<Option<T>> {
        let Some(value) = tree.get(key).with_context(|| format!("read {label}"))? else {
            return Ok(None);
        };
        match deserialize::<T>(value.as_ref()) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("ignoring unreadable {label}: {e:#}");
                Ok(None)
            }
        }
    }
}

pub fn open_db<P: AsRef<Path>>(path: P) -> crate::Result<Db> {
    Config::default()
        .path(path)
        .open()
        .context("open sled database")
}

impl SnapshotStorage for SledSnapshotStorage {
    fn latest_marketplace(&self) -> crate::Result<Option<MarketplaceSnapshot>> {
        Self::cached(&self.marketplace_tree, MARKETPLACE_KEY, "marketplace snapshot")
    }

    fn update_marketplace(&mut self, snapshot: &MarketplaceSnapshot) -> crate::Result<()> {
        let bytes = Self::serialize_record(snapshot, "marketplace snapshot")?;
        self.marketplace_tree
            .insert(MARKETPLACE_KEY, bytes)
            .context("persist marketplace snapshot")?;
        self.marketplace_tree
            .flush()
            .context("flush marketplace snapshot")?;
        Ok(())
    }

    fn world_map(&self, world_id: &ObjectId) -> crate::Result<Option<WorldMap>> {
        Self::cached(&self.world_tree, world_id.as_str().as_bytes(), "world map")
    }

    fn latest_world_map(&self) -> crate::Result<Option<WorldMap>> {
        let Some(key) = self
            .world_meta
            .get(LATEST_WORLD_KEY)
            .context("read latest world key")?
        else {
            return Ok(None);
        };
        Self::cached(&self.world_tree, key.as_ref(), "world map")
    }

    fn update_world_map(&mut self, map: &WorldMap) -> crate::Result<()> {
        let key = map.world_id.as_str().as_bytes();
        let bytes = Self::serialize_record(map, "world map")?;
        self.world_tree
            .insert(key, bytes)
            .context("persist world map")?;
        self.world_tree.flush().context("flush world maps")?;
        self.world_meta
            .insert(LATEST_WORLD_KEY, key)
            .context("write latest world key")?;
        self.world_meta
            .flush()
            .context("flush latest world key")?;
        Ok(())
    }
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(bytes).context("deserialize sled record")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        snapshot::Listing,
        world::{
            Chunk,
            ChunkCoords,
            WorldGrid,
        },
    };
    use chain::{
        events::Recency,
        test_helpers::object_id,
    };
    use tempdir::TempDir;

    fn world_map(world: u8, tile: u8) -> WorldMap {
        let chunk = Chunk {
            coords: ChunkCoords { cx: 0, cy: 0 },
            tiles: [tile; 25],
            decorations: [0; 25],
        };
        WorldMap {
            world_id: object_id(world),
            grid: WorldGrid::compose(&[chunk]),
            difficulty: 3,
            chunk_count: 1,
        }
    }

    #[test]
    fn sut__when_updating_marketplace_then_snapshot_is_persisted() {
        // given
        let temp_dir = TempDir::new("sled_marketplace").unwrap();
        let mut storage = SledSnapshotStorage::open(temp_dir.path()).unwrap();
        let snapshot = MarketplaceSnapshot {
            listings: vec![Listing {
                chunk_id: object_id(1),
                world_id: object_id(2),
                seller: None,
                price: 18_446_744_073_709_551_615,
                listed_at: Recency::default(),
            }],
            ..MarketplaceSnapshot::default()
        };

        // when
        storage.update_marketplace(&snapshot).unwrap();

        // then
        let loaded = storage.latest_marketplace().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn sut__when_caching_two_worlds_then_latest_points_at_last_write() {
        // given
        let temp_dir = TempDir::new("sled_world_cache").unwrap();
        let mut storage = SledSnapshotStorage::open(temp_dir.path()).unwrap();

        // when
        storage.update_world_map(&world_map(1, 1)).unwrap();
        storage.update_world_map(&world_map(2, 2)).unwrap();

        // then
        assert_eq!(storage.latest_world_map().unwrap().unwrap().world_id, object_id(2));
        assert_eq!(storage.world_map(&object_id(1)).unwrap(), Some(world_map(1, 1)));
        assert_eq!(storage.world_map(&object_id(3)).unwrap(), None);
    }

    #[test]
    fn sut__when_cached_grid_does_not_match_its_dimensions_then_world_is_a_miss() {
        // given
        let temp_dir = TempDir::new("sled_world_cache_bad_grid").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        let storage = SledSnapshotStorage::new(&db).unwrap();
        let mut record = serde_json::to_value(world_map(1, 1)).unwrap();
        record["grid"]["width"] = serde_json::json!(0);
        db.open_tree("world_map_cache")
            .unwrap()
            .insert(
                object_id(1).as_str().as_bytes(),
                serde_json::to_vec(&record).unwrap(),
            )
            .unwrap();

        // when
        let loaded = storage.world_map(&object_id(1)).unwrap();

        // then
        assert!(loaded.is_none());
    }

    #[test]
    fn sut__when_cached_bytes_are_corrupt_then_cache_reads_empty() {
        // given
        let temp_dir = TempDir::new("sled_world_cache_corrupt").unwrap();
        let db = open_db(temp_dir.path()).unwrap();
        let storage = SledSnapshotStorage::new(&db).unwrap();
        db.open_tree("marketplace_snapshot")
            .unwrap()
            .insert(MARKETPLACE_KEY, b"{not json".as_slice())
            .unwrap();

        // when
        let loaded = storage.latest_marketplace().unwrap();

        // then
        assert!(loaded.is_none());
    }
}
