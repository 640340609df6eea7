use chain::{
    Address,
    ObjectId,
    PlayId,
    events::Recency,
};
use serde::{
    Deserialize,
    Serialize,
};

/// How many of a seller's own sales are surfaced to them.
pub const RECENT_SALES_PER_SELLER: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub chunk_id: ObjectId,
    pub world_id: ObjectId,
    pub seller: Option<Address>,
    pub price: u64,
    pub listed_at: Recency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub chunk_id: ObjectId,
    pub world_id: ObjectId,
    pub seller: Option<Address>,
    pub buyer: Option<Address>,
    pub price: u64,
    pub sold_at: Recency,
}

/// Open marketplace offers as of the last replay, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketplaceSnapshot {
    pub listings: Vec<Listing>,
    pub recent_sales: Vec<Sale>,
    /// events skipped because their payload did not decode
    pub dropped: usize,
    /// set when the replay stopped at its round limit with history left unread
    pub truncated: bool,
}

impl MarketplaceSnapshot {
    pub fn listing(&self, chunk_id: &ObjectId) -> Option<&Listing> {
        self.listings
            .iter()
            .find(|listing| &listing.chunk_id == chunk_id)
    }

    pub fn listings_in_world<'a>(
        &'a self,
        world_id: &'a ObjectId,
    ) -> impl Iterator<Item = &'a Listing> + 'a {
        self.listings
            .iter()
            .filter(move |listing| &listing.world_id == world_id)
    }

    pub fn recent_sales_by(&self, seller: &Address) -> Vec<&Sale> {
        self.recent_sales
            .iter()
            .filter(|sale| sale.seller.as_ref() == Some(seller))
            .take(RECENT_SALES_PER_SELLER)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclaimedPlay {
    pub play_id: PlayId,
    pub world_id: Option<ObjectId>,
    pub min_reward: u64,
    pub max_reward: u64,
    pub created_at: Recency,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnclaimedPlays {
    pub plays: Vec<UnclaimedPlay>,
    pub dropped: usize,
    pub truncated: bool,
}
