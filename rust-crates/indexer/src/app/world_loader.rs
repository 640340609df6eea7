// Reads worlds and their chunks straight from chain objects and dynamic fields.
use crate::{
    app::event_pages::EventPager,
    world::{
        Chunk,
        ChunkCoords,
        WorldGrid,
        WorldMap,
        clamp_difficulty,
    },
};
use anyhow::Context;
use chain::{
    Address,
    ObjectId,
    events::{
        ChainEvent,
        DecodeEvent,
        EventKind,
        WorldCreatedEvent,
    },
    fields,
    rpc::{
        DynamicFieldInfo,
        DynamicFieldName,
        EventReader,
        ObjectReader,
    },
};
use futures::future::join_all;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Value,
    json,
};

const DYNAMIC_FIELD_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub coords: ChunkCoords,
    pub chunk_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldList {
    /// registry world first, then creation events newest first
    pub world_ids: Vec<ObjectId>,
    pub truncated: bool,
}

pub struct WorldLoader<'a, R> {
    chain: &'a R,
    package: ObjectId,
}

impl<'a, R> WorldLoader<'a, R>
where
    R: ObjectReader + EventReader,
{
    pub fn new(chain: &'a R, package: &ObjectId) -> Self {
        Self {
            chain,
            package: package.clone(),
        }
    }

    fn struct_type(&self, name: &str) -> String {
        format!("{}::{}::{name}", self.package, chain::WORLD_MODULE)
    }

    /// The world the registry currently points at, if any.
    pub async fn registry_world(&self, registry: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let Some(object) = self
            .chain
            .get_object(registry)
            .await
            .context("reading world registry")?
        else {
            return Ok(None);
        };
        let Some(record) = fields::normalize_fields(&object.fields) else {
            return Ok(None);
        };
        let world = fields::field(record, &["world_id", "worldId", "world"])
            .map(fields::vector)
            .and_then(|items| items.first())
            .and_then(fields::object_id);
        Ok(world)
    }

    pub async fn world_ids(&self, registry: Option<&ObjectId>) -> anyhow::Result<WorldList> {
        let mut list = WorldList::default();
        if let Some(registry) = registry {
            if let Some(world) = self.registry_world(registry).await? {
                list.world_ids.push(world);
            }
        }
        let history = EventPager::for_kind(self.chain, &self.package, EventKind::WorldCreated)
            .fetch_all()
            .await
            .context("reading world creation history")?;
        for event in &history.events {
            let Ok(created) = event_world(event) else {
                continue;
            };
            if !list.world_ids.contains(&created) {
                list.world_ids.push(created);
            }
        }
        list.truncated = history.truncated;
        Ok(list)
    }

    async fn all_dynamic_fields(&self, parent: &ObjectId) -> anyhow::Result<Vec<DynamicFieldInfo>> {
        let mut all = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .chain
                .dynamic_fields(parent, cursor.take(), DYNAMIC_FIELD_PAGE_SIZE)
                .await
                .with_context(|| format!("listing dynamic fields of {parent}"))?;
            all.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(all),
            }
        }
    }

    async fn chunk_entry(
        &self,
        world: &ObjectId,
        field: &DynamicFieldInfo,
    ) -> anyhow::Result<Option<ChunkEntry>> {
        if !field.name.type_name.contains("ChunkKey") {
            return Ok(None);
        }
        let Some(coords) = ChunkCoords::from_key(&field.name.value) else {
            return Ok(None);
        };
        let Some(object) = self.chain.dynamic_field_object(world, &field.name).await? else {
            return Ok(None);
        };
        let chunk_id = fields::normalize_fields(&object.fields)
            .and_then(|record| record.get("value"))
            .and_then(fields::object_id);
        Ok(chunk_id.map(|chunk_id| ChunkEntry { coords, chunk_id }))
    }

    /// Chunk placements of a world. Entries that fail to resolve are skipped.
    pub async fn chunk_entries(&self, world: &ObjectId) -> anyhow::Result<Vec<ChunkEntry>> {
        let dynamic_fields = self.all_dynamic_fields(world).await?;
        let lookups = dynamic_fields.iter().map(|field| self.chunk_entry(world, field));
        let mut entries = Vec::new();
        for result in join_all(lookups).await {
            match result {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => tracing::warn!(%world, "skipping unreadable chunk entry: {e:#}"),
            }
        }
        Ok(entries)
    }

    async fn listing_content(
        &self,
        world: &ObjectId,
        name: &DynamicFieldName,
    ) -> anyhow::Result<Option<Value>> {
        let Some(object) = self.chain.dynamic_field_object(world, name).await? else {
            return Ok(None);
        };
        Ok(fields::normalize_fields(&object.fields)
            .and_then(|record| record.get("chunk"))
            .cloned())
    }

    /// A chunk escrowed in a marketplace listing is wrapped inside the listing and
    /// has no standalone content, so it is read through its `ListingKey` field.
    pub async fn listed_chunk(
        &self,
        world: &ObjectId,
        chunk_id: &ObjectId,
    ) -> anyhow::Result<Option<Value>> {
        let key_type = self.struct_type("ListingKey");
        let id = chunk_id.to_string();
        let key_shapes = [
            json!({ "chunk_id": id }),
            json!({ "chunk_id": { "id": id } }),
            json!({ "chunk_id": { "bytes": id } }),
            json!({ "chunk_id": { "id": { "bytes": id } } }),
        ];
        for value in key_shapes {
            let name = DynamicFieldName {
                type_name: key_type.clone(),
                value,
            };
            if let Some(content) = self.listing_content(world, &name).await? {
                return Ok(Some(content));
            }
        }

        for field in self.all_dynamic_fields(world).await? {
            if !field.name.type_name.contains("ListingKey") {
                continue;
            }
            let listed_id = fields::normalize_fields(&field.name.value)
                .and_then(|key| fields::field(key, &["chunk_id", "chunkId"]))
                .and_then(fields::object_id);
            if listed_id.as_ref() == Some(chunk_id) {
                return self.listing_content(world, &field.name).await;
            }
        }
        Ok(None)
    }

    /// Difficulty stored on the world object, 1 when unreadable.
    pub async fn difficulty(&self, world: &ObjectId) -> u8 {
        match self.chain.get_object(world).await {
            Ok(Some(object)) => clamp_difficulty(
                fields::normalize_fields(&object.fields)
                    .and_then(|record| record.get("difficulty"))
                    .and_then(fields::parse_u64),
            ),
            Ok(None) => clamp_difficulty(None),
            Err(e) => {
                tracing::warn!(%world, "could not read world difficulty: {e:#}");
                clamp_difficulty(None)
            }
        }
    }

    pub async fn load_world(&self, world: &ObjectId) -> anyhow::Result<WorldMap> {
        let entries = self.chunk_entries(world).await?;
        let ids: Vec<ObjectId> = entries.iter().map(|entry| entry.chunk_id.clone()).collect();
        let objects = self
            .chain
            .multi_get_objects(&ids)
            .await
            .context("reading chunk objects")?;

        let mut chunks = Vec::with_capacity(entries.len());
        for (entry, object) in entries.iter().zip(objects) {
            let content = match object {
                Some(object) => Some(object.fields),
                None => self.listed_chunk(world, &entry.chunk_id).await?,
            };
            match content {
                Some(content) => chunks.push(Chunk::from_fields(entry.coords, &content)),
                None => tracing::warn!(
                    %world,
                    chunk_id = %entry.chunk_id,
                    "chunk has no readable content"
                ),
            }
        }

        let difficulty = self.difficulty(world).await;
        tracing::info!(%world, chunks = chunks.len(), difficulty, "world loaded");
        Ok(WorldMap {
            world_id: world.clone(),
            grid: WorldGrid::compose(&chunks),
            difficulty,
            chunk_count: entries.len(),
        })
    }

    /// Sale proceeds waiting for `owner` to withdraw from `world`.
    pub async fn seller_proceeds(&self, world: &ObjectId, owner: &Address) -> anyhow::Result<u64> {
        let name = DynamicFieldName {
            type_name: self.struct_type("SellerPayoutKey"),
            value: json!({ "owner": owner }),
        };
        let Some(object) = self
            .chain
            .dynamic_field_object(world, &name)
            .await
            .context("reading seller payout")?
        else {
            return Ok(0);
        };
        let balance = fields::normalize_fields(&object.fields)
            .and_then(|record| record.get("value"))
            .and_then(fields::normalize_fields)
            .and_then(|value| value.get("balance"))
            .and_then(fields::parse_u64)
            .unwrap_or(0);
        Ok(balance)
    }
}

fn event_world(event: &ChainEvent) -> anyhow::Result<ObjectId> {
    Ok(WorldCreatedEvent::decode(event)?.event.world_id)
}

#[cfg(test)]
mod tests;
