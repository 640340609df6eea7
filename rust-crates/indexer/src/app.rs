use crate::{
    Result,
    app::{
        event_pages::{
            EventPager,
            UNCLAIMED_PLAYS_MAX_ROUNDS,
        },
        snapshot_storage::SnapshotStorage,
        world_loader::{
            WorldList,
            WorldLoader,
        },
    },
    reconcile,
    snapshot::{
        MarketplaceSnapshot,
        UnclaimedPlays,
    },
    world::WorldMap,
};
use anyhow::{
    Context,
    anyhow,
};
use chain::{
    Address,
    ObjectId,
    PlayId,
    events::{
        EventKind,
        RewardClaimedEvent,
        Timed,
    },
    rpc::{
        EventReader,
        ObjectReader,
    },
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub mod event_pages;
pub mod in_memory_snapshot_storage;
pub mod sled_storage;
pub mod snapshot_storage;
pub mod world_loader;

#[cfg(test)]
mod tests;

/// Outcome of looking for a reward claim in the bounded claim history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimLookup {
    pub claim: Option<Timed<RewardClaimedEvent>>,
    /// no claim was seen, but older history exists past the round limit
    pub truncated: bool,
}

/// Replays the play and claim feeds for `creator`'s plays that were never redeemed.
pub async fn unclaimed_plays<R: EventReader>(
    reader: &R,
    package: &ObjectId,
    creator: &Address,
) -> Result<UnclaimedPlays> {
    let plays = EventPager::for_kind(reader, package, EventKind::PlayCreated)
        .max_rounds(UNCLAIMED_PLAYS_MAX_ROUNDS);
    let claims = EventPager::for_kind(reader, package, EventKind::RewardClaimed)
        .max_rounds(UNCLAIMED_PLAYS_MAX_ROUNDS);
    let (plays, claims) = futures::try_join!(plays.fetch_all(), claims.fetch_all())
        .context("replaying play history")?;
    let mut result = reconcile::unclaimed_plays(&plays.events, &claims.events, creator);
    result.truncated = plays.truncated || claims.truncated;
    tracing::info!(
        %creator,
        unclaimed = result.plays.len(),
        dropped = result.dropped,
        truncated = result.truncated,
        "replayed play history"
    );
    Ok(result)
}

/// Searches the most recent reward claims for one play, newest first.
pub async fn find_claim<R: EventReader>(
    reader: &R,
    package: &ObjectId,
    play_id: PlayId,
) -> Result<ClaimLookup> {
    let scan = EventPager::for_kind(reader, package, EventKind::RewardClaimed)
        .find_map(|event| reconcile::claim_recorded(std::slice::from_ref(event), play_id))
        .await
        .with_context(|| format!("looking up claims for play {play_id}"))?;
    Ok(ClaimLookup {
        claim: scan.found,
        truncated: scan.truncated,
    })
}

pub struct App<Chain, Snapshots> {
    chain: Chain,
    snapshots: Snapshots,
    package: ObjectId,
    registry: Option<ObjectId>,
}

impl<Chain, Snapshots> App<Chain, Snapshots> {
    pub fn new(
        chain: Chain,
        snapshots: Snapshots,
        package: ObjectId,
        registry: Option<ObjectId>,
    ) -> Self {
        Self {
            chain,
            snapshots,
            package,
            registry,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn package(&self) -> &ObjectId {
        &self.package
    }
}

impl<Chain, Snapshots> App<Chain, Snapshots>
where
    Chain: ObjectReader + EventReader,
    Snapshots: SnapshotStorage,
{
    /// Replays the listing feeds and stores the reconciled marketplace.
    pub async fn refresh_marketplace(&mut self) -> Result<MarketplaceSnapshot> {
        let listed = EventPager::for_kind(&self.chain, &self.package, EventKind::ChunkListed);
        let sold = EventPager::for_kind(&self.chain, &self.package, EventKind::ChunkSold);
        let delisted = EventPager::for_kind(&self.chain, &self.package, EventKind::ChunkDelisted);
        let (listed, sold, delisted) =
            futures::try_join!(listed.fetch_all(), sold.fetch_all(), delisted.fetch_all())
                .context("replaying marketplace history")?;

        let mut snapshot = reconcile::marketplace(&listed.events, &sold.events, &delisted.events);
        snapshot.truncated = listed.truncated || sold.truncated || delisted.truncated;
        if snapshot.truncated {
            tracing::warn!("marketplace replay hit the round limit; older listings are not shown");
        }
        tracing::info!(
            listings = snapshot.listings.len(),
            sales = snapshot.recent_sales.len(),
            dropped = snapshot.dropped,
            "marketplace reconciled"
        );
        self.snapshots.update_marketplace(&snapshot)?;
        Ok(snapshot)
    }

    pub fn latest_marketplace(&self) -> Result<Option<MarketplaceSnapshot>> {
        self.snapshots.latest_marketplace()
    }

    pub async fn world_list(&self) -> Result<WorldList> {
        WorldLoader::new(&self.chain, &self.package)
            .world_ids(self.registry.as_ref())
            .await
    }

    /// Loads `world` (or the first known world) from chain and caches it.
    pub async fn refresh_world(&mut self, world: Option<&ObjectId>) -> Result<WorldMap> {
        let world_id = match world {
            Some(world) => world.clone(),
            None => self
                .world_list()
                .await?
                .world_ids
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no worlds have been created yet"))?,
        };
        let map = WorldLoader::new(&self.chain, &self.package)
            .load_world(&world_id)
            .await
            .with_context(|| format!("loading world {world_id}"))?;
        self.snapshots.update_world_map(&map)?;
        Ok(map)
    }

    pub fn cached_world(&self, world: Option<&ObjectId>) -> Result<Option<WorldMap>> {
        match world {
            Some(world) => self.snapshots.world_map(world),
            None => self.snapshots.latest_world_map(),
        }
    }

    pub async fn unclaimed_plays(&self, creator: &Address) -> Result<UnclaimedPlays> {
        unclaimed_plays(&self.chain, &self.package, creator).await
    }

    pub async fn find_claim(&self, play_id: PlayId) -> Result<ClaimLookup> {
        find_claim(&self.chain, &self.package, play_id).await
    }

    pub async fn seller_proceeds(&self, world: &ObjectId, owner: &Address) -> Result<u64> {
        WorldLoader::new(&self.chain, &self.package)
            .seller_proceeds(world, owner)
            .await
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
