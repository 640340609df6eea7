//! Rebuilds current state by replaying opening and closing events.
//!
//! An opening event (a listing, a play) stays open only while no closing event for
//! the same key is at least as recent. Recency, not feed order, decides everything
//! here, so the inputs may arrive in any order and in any page split.

use crate::snapshot::{
    Listing,
    MarketplaceSnapshot,
    Sale,
    UnclaimedPlay,
    UnclaimedPlays,
};
use chain::{
    Address,
    PlayId,
    events::{
        ChainEvent,
        ChunkDelistedEvent,
        ChunkListedEvent,
        ChunkSoldEvent,
        DecodeEvent,
        PlayCreatedEvent,
        Recency,
        RewardClaimedEvent,
        Timed,
    },
};
use std::{
    collections::{
        HashMap,
        HashSet,
        hash_map::Entry,
    },
    hash::Hash,
};

/// Returns the surviving opens, one per key, most recent first. An open survives
/// only if it happened after every close of its key; a close in the same checkpoint
/// wins.
pub fn reconcile<K, T>(
    opens: impl IntoIterator<Item = (K, Timed<T>)>,
    closes: impl IntoIterator<Item = (K, Recency)>,
) -> Vec<Timed<T>>
where
    K: Eq + Hash,
{
    let mut closes_by_key: HashMap<K, Vec<Recency>> = HashMap::new();
    for (key, recency) in closes {
        closes_by_key.entry(key).or_default().push(recency);
    }

    let mut latest_open: HashMap<K, Timed<T>> = HashMap::new();
    for (key, open) in opens {
        match latest_open.entry(key) {
            Entry::Occupied(mut slot) => {
                if open.recency > slot.get().recency {
                    slot.insert(open);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(open);
            }
        }
    }

    let mut surviving: Vec<Timed<T>> = latest_open
        .into_iter()
        .filter(|(key, open)| {
            closes_by_key.get(key).is_none_or(|closes| {
                closes
                    .iter()
                    .all(|closed| open.recency.happened_after(closed))
            })
        })
        .map(|(_, open)| open)
        .collect();
    surviving.sort_by(|a, b| b.recency.cmp(&a.recency));
    surviving
}

/// Decodes every event of one kind, skipping (and counting) the ones that do not
/// decode.
pub fn decode_all<T: DecodeEvent>(events: &[ChainEvent], dropped: &mut usize) -> Vec<Timed<T>> {
    let mut decoded = Vec::with_capacity(events.len());
    for event in events {
        match T::decode(event) {
            Ok(timed) => decoded.push(timed),
            Err(e) => {
                *dropped += 1;
                tracing::warn!(
                    tx_digest = %event.id.tx_digest,
                    event_seq = %event.id.event_seq,
                    "dropping malformed event: {e}"
                );
            }
        }
    }
    decoded
}

pub fn marketplace(
    listed: &[ChainEvent],
    sold: &[ChainEvent],
    delisted: &[ChainEvent],
) -> MarketplaceSnapshot {
    let mut dropped = 0;
    let listed = decode_all::<ChunkListedEvent>(listed, &mut dropped);
    let sold = decode_all::<ChunkSoldEvent>(sold, &mut dropped);
    let delisted = decode_all::<ChunkDelistedEvent>(delisted, &mut dropped);

    let closes = sold
        .iter()
        .map(|sale| (sale.event.chunk_id.clone(), sale.recency.clone()))
        .chain(
            delisted
                .iter()
                .map(|delist| (delist.event.chunk_id.clone(), delist.recency.clone())),
        );
    let opens = listed
        .into_iter()
        .map(|listing| (listing.event.chunk_id.clone(), listing));

    let listings = reconcile(opens, closes)
        .into_iter()
        .map(|Timed { recency, event }| Listing {
            chunk_id: event.chunk_id,
            world_id: event.world_id,
            seller: event.seller,
            price: event.price,
            listed_at: recency,
        })
        .collect();

    let mut recent_sales: Vec<Sale> = sold
        .into_iter()
        .map(|Timed { recency, event }| Sale {
            chunk_id: event.chunk_id,
            world_id: event.world_id,
            seller: event.seller,
            buyer: event.buyer,
            price: event.price,
            sold_at: recency,
        })
        .collect();
    recent_sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at));

    MarketplaceSnapshot {
        listings,
        recent_sales,
        dropped,
        truncated: false,
    }
}

/// Plays started by `creator` for which no reward claim exists anywhere in `claims`.
pub fn unclaimed_plays(
    plays: &[ChainEvent],
    claims: &[ChainEvent],
    creator: &Address,
) -> UnclaimedPlays {
    let mut dropped = 0;
    let claimed: HashSet<PlayId> = decode_all::<RewardClaimedEvent>(claims, &mut dropped)
        .into_iter()
        .map(|claim| claim.event.play_id)
        .collect();
    let opens = decode_all::<PlayCreatedEvent>(plays, &mut dropped)
        .into_iter()
        .filter(|play| play.event.creator.as_ref() == Some(creator))
        .filter(|play| !claimed.contains(&play.event.play_id))
        .map(|play| (play.event.play_id, play));

    let plays = reconcile(opens, std::iter::empty::<(PlayId, Recency)>())
        .into_iter()
        .map(|Timed { recency, event }| UnclaimedPlay {
            play_id: event.play_id,
            world_id: event.world_id,
            min_reward: event.min_reward,
            max_reward: event.max_reward,
            created_at: recency,
        })
        .collect();

    UnclaimedPlays {
        plays,
        dropped,
        truncated: false,
    }
}

/// Most recent reward claim recorded for `play_id`, if any.
pub fn claim_recorded(
    claims: &[ChainEvent],
    play_id: PlayId,
) -> Option<Timed<RewardClaimedEvent>> {
    claims
        .iter()
        .filter_map(|event| RewardClaimedEvent::decode(event).ok())
        .filter(|claim| claim.event.play_id == play_id)
        .max_by(|a, b| a.recency.cmp(&b.recency))
}
