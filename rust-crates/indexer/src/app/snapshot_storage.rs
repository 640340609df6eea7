use crate::{
    snapshot::MarketplaceSnapshot,
    world::WorldMap,
};
use chain::ObjectId;

pub trait SnapshotStorage {
    /// retrieve the last stored marketplace snapshot
    fn latest_marketplace(&self) -> crate::Result<Option<MarketplaceSnapshot>>;

    /// write or overwrite the marketplace snapshot
    fn update_marketplace(&mut self, snapshot: &MarketplaceSnapshot) -> crate::Result<()>;

    /// retrieve the cached map of one world
    fn world_map(&self, world_id: &ObjectId) -> crate::Result<Option<WorldMap>>;

    /// retrieve the most recently cached world map, whichever world it belongs to
    fn latest_world_map(&self) -> crate::Result<Option<WorldMap>>;

    /// write or overwrite the cached map of `map.world_id` and mark it as latest
    fn update_world_map(&mut self, map: &WorldMap) -> crate::Result<()>;
}
