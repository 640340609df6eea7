use crate::{
    app::snapshot_storage::SnapshotStorage,
    snapshot::MarketplaceSnapshot,
    world::WorldMap,
};
use chain::ObjectId;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Clone, Default)]
pub struct InMemorySnapshotStorage {
    marketplace: Arc<Mutex<Option<MarketplaceSnapshot>>>,
    world_maps: Arc<Mutex<HashMap<ObjectId, WorldMap>>>,
    latest_world: Arc<Mutex<Option<ObjectId>>>,
}

impl InMemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marketplace(&self) -> Arc<Mutex<Option<MarketplaceSnapshot>>> {
        self.marketplace.clone()
    }

    pub fn world_maps(&self) -> Arc<Mutex<HashMap<ObjectId, WorldMap>>> {
        self.world_maps.clone()
    }
}

impl SnapshotStorage for InMemorySnapshotStorage {
    fn latest_marketplace(&self) -> crate::Result<Option<MarketplaceSnapshot>> {
        let guard = self.marketplace.lock().unwrap();
        Ok(guard.clone())
    }

    fn update_marketplace(&mut self, snapshot: &MarketplaceSnapshot) -> crate::Result<()> {
        let mut guard = self.marketplace.lock().unwrap();
        *guard = Some(snapshot.clone());
        Ok(())
    }

    fn world_map(&self, world_id: &ObjectId) -> crate::Result<Option<WorldMap>> {
        let guard = self.world_maps.lock().unwrap();
        Ok(guard.get(world_id).cloned())
    }

    fn latest_world_map(&self) -> crate::Result<Option<WorldMap>> {
        let latest = self.latest_world.lock().unwrap().clone();
        match latest {
            Some(world_id) => self.world_map(&world_id),
            None => Ok(None),
        }
    }

    fn update_world_map(&mut self, map: &WorldMap) -> crate::Result<()> {
        self.world_maps
            .lock()
            .unwrap()
            .insert(map.world_id.clone(), map.clone());
        *self.latest_world.lock().unwrap() = Some(map.world_id.clone());
        Ok(())
    }
}
