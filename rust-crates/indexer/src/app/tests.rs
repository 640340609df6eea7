#![allow(non_snake_case)]

use super::*;
use crate::app::in_memory_snapshot_storage::InMemorySnapshotStorage;
use chain::{
    events::ChainEvent,
    rpc::{
        Coin,
        DynamicFieldInfo,
        DynamicFieldName,
        EventCursor,
        EventOrder,
        EventPage,
        EventQuery,
        ObjectData,
        Page,
    },
    test_helpers::{
        chain_event,
        object_id,
        test_package,
    },
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::HashMap,
    sync::Mutex,
};

/// In-memory chain: objects, dynamic fields and per-type event feeds (newest first).
#[derive(Default)]
pub struct FakeChain {
    objects: HashMap<ObjectId, Value>,
    dynamic_fields: HashMap<ObjectId, Vec<(DynamicFieldInfo, Value)>>,
    feeds: HashMap<String, Vec<ChainEvent>>,
    event_queries: Mutex<Vec<String>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, id: ObjectId, fields: Value) -> Self {
        self.objects.insert(id, fields);
        self
    }

    pub fn with_dynamic_field(
        mut self,
        parent: ObjectId,
        name: DynamicFieldName,
        field_object: ObjectId,
        fields: Value,
    ) -> Self {
        let info = DynamicFieldInfo {
            name,
            object_id: field_object,
        };
        self.dynamic_fields
            .entry(parent)
            .or_default()
            .push((info, fields));
        self
    }

    pub fn with_events(mut self, kind: EventKind, events: Vec<ChainEvent>) -> Self {
        self.feeds
            .entry(kind.type_name(&test_package()))
            .or_default()
            .extend(events);
        self
    }

    pub fn event_queries(&self) -> Vec<String> {
        self.event_queries.lock().unwrap().clone()
    }
}

fn page_start(cursor: Option<String>) -> usize {
    cursor.and_then(|c| c.parse().ok()).unwrap_or(0)
}

impl ObjectReader for FakeChain {
    async fn get_object(&self, id: &ObjectId) -> anyhow::Result<Option<ObjectData>> {
        Ok(self.objects.get(id).map(|fields| ObjectData {
            object_id: id.clone(),
            object_type: None,
            fields: fields.clone(),
        }))
    }

    async fn multi_get_objects(
        &self,
        ids: &[ObjectId],
    ) -> anyhow::Result<Vec<Option<ObjectData>>> {
        let mut objects = Vec::new();
        for id in ids {
            objects.push(self.get_object(id).await?);
        }
        Ok(objects)
    }

    async fn dynamic_fields(
        &self,
        parent: &ObjectId,
        cursor: Option<String>,
        limit: usize,
    ) -> anyhow::Result<Page<DynamicFieldInfo>> {
        let all = self.dynamic_fields.get(parent).cloned().unwrap_or_default();
        let start = page_start(cursor);
        let end = (start + limit).min(all.len());
        Ok(Page {
            data: all[start..end].iter().map(|(info, _)| info.clone()).collect(),
            next_cursor: Some(end.to_string()),
            has_next_page: end < all.len(),
        })
    }

    async fn dynamic_field_object(
        &self,
        parent: &ObjectId,
        name: &DynamicFieldName,
    ) -> anyhow::Result<Option<ObjectData>> {
        let found = self
            .dynamic_fields
            .get(parent)
            .and_then(|fields| fields.iter().find(|(info, _)| &info.name == name));
        Ok(found.map(|(info, fields)| ObjectData {
            object_id: info.object_id.clone(),
            object_type: Some(info.name.type_name.clone()),
            fields: fields.clone(),
        }))
    }

    async fn owned_objects(
        &self,
        _owner: &Address,
        _struct_type: &str,
    ) -> anyhow::Result<Vec<ObjectData>> {
        Ok(Vec::new())
    }

    async fn coins(&self, _owner: &Address, _coin_type: &str) -> anyhow::Result<Vec<Coin>> {
        Ok(Vec::new())
    }
}

impl EventReader for FakeChain {
    async fn query_events(
        &self,
        query: &EventQuery,
        cursor: Option<EventCursor>,
        limit: usize,
        _order: EventOrder,
    ) -> anyhow::Result<EventPage> {
        self.event_queries
            .lock()
            .unwrap()
            .push(query.move_event_type.clone());
        let feed = self
            .feeds
            .get(&query.move_event_type)
            .cloned()
            .unwrap_or_default();
        let start = page_start(cursor.map(|c| c.event_seq));
        let end = (start + limit).min(feed.len());
        Ok(EventPage {
            data: feed[start..end].to_vec(),
            next_cursor: Some(EventCursor {
                tx_digest: format!("page-{end}"),
                event_seq: end.to_string(),
            }),
            has_next_page: end < feed.len(),
        })
    }
}

fn address(byte: u8) -> Address {
    object_id(byte).to_string().parse().unwrap()
}

fn listed(chunk: u8, price: u64, timestamp_ms: u64) -> ChainEvent {
    chain_event(
        EventKind::ChunkListed,
        json!({
            "chunk_id": object_id(chunk).to_string(),
            "world_id": object_id(0xee).to_string(),
            "seller": address(0x51).to_string(),
            "price": price.to_string(),
        }),
        Some(timestamp_ms),
        timestamp_ms,
    )
}

#[tokio::test]
async fn refresh_marketplace__reconciles_and_stores_snapshot() {
    // given
    let chain = FakeChain::new()
        .with_events(EventKind::ChunkListed, vec![listed(1, 10, 30), listed(2, 20, 20)])
        .with_events(
            EventKind::ChunkSold,
            vec![chain_event(
                EventKind::ChunkSold,
                json!({
                    "chunk_id": object_id(2).to_string(),
                    "world_id": object_id(0xee).to_string(),
                    "seller": address(0x51).to_string(),
                    "price": 20,
                }),
                Some(25),
                25,
            )],
        );
    let storage = InMemorySnapshotStorage::new();
    let stored = storage.marketplace();
    let mut app = App::new(chain, storage, test_package(), None);

    // when
    let snapshot = app.refresh_marketplace().await.unwrap();

    // then
    assert_eq!(snapshot.listings.len(), 1);
    assert_eq!(snapshot.listings[0].chunk_id, object_id(1));
    assert_eq!(snapshot.recent_sales_by(&address(0x51)).len(), 1);
    assert_eq!(stored.lock().unwrap().as_ref(), Some(&snapshot));
    assert!(!snapshot.truncated);
}

#[tokio::test]
async fn refresh_marketplace__long_history__is_flagged_truncated() {
    // given
    let many: Vec<ChainEvent> = (0..400).map(|i| listed((i % 200) as u8, 5, 1_000 - i)).collect();
    let chain = FakeChain::new().with_events(EventKind::ChunkListed, many);
    let mut app = App::new(chain, InMemorySnapshotStorage::new(), test_package(), None);

    // when
    let snapshot = app.refresh_marketplace().await.unwrap();

    // then
    assert!(snapshot.truncated);
}

#[tokio::test]
async fn unclaimed_plays__uses_wider_round_limit() {
    // given
    let me = address(0x01);
    let plays: Vec<ChainEvent> = (0..400)
        .map(|i| {
            chain_event(
                EventKind::PlayCreated,
                json!({ "play_id": i, "creator": me.to_string() }),
                Some(10_000 - i),
                i,
            )
        })
        .collect();
    let chain = FakeChain::new().with_events(EventKind::PlayCreated, plays);

    // when
    let result = unclaimed_plays(&chain, &test_package(), &me).await.unwrap();

    // then
    assert_eq!(result.plays.len(), 400);
    assert!(!result.truncated);
    let play_queries = chain
        .event_queries()
        .iter()
        .filter(|q| q.ends_with("PlayCreatedEvent"))
        .count();
    assert_eq!(play_queries, 8);
}

#[tokio::test]
async fn find_claim__reports_matching_claim() {
    // given
    let claims = vec![
        chain_event(
            EventKind::RewardClaimed,
            json!({ "play_id": "3", "reward": "12" }),
            Some(5),
            5,
        ),
        chain_event(
            EventKind::RewardClaimed,
            json!({ "play_id": "7", "reward": "40" }),
            Some(4),
            4,
        ),
    ];
    let chain = FakeChain::new().with_events(EventKind::RewardClaimed, claims);

    // when
    let lookup = find_claim(&chain, &test_package(), PlayId(7)).await.unwrap();
    let missing = find_claim(&chain, &test_package(), PlayId(8)).await.unwrap();

    // then
    assert_eq!(lookup.claim.unwrap().event.reward, Some(40));
    assert!(missing.claim.is_none());
    assert!(!missing.truncated);
}

#[tokio::test]
async fn refresh_world__without_worlds__is_error() {
    let mut app = App::new(
        FakeChain::new(),
        InMemorySnapshotStorage::new(),
        test_package(),
        None,
    );

    let result = app.refresh_world(None).await;

    assert!(result.is_err());
}
