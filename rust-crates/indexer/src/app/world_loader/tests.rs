#![allow(non_snake_case)]

use super::*;
use crate::{
    app::tests::FakeChain,
    tiles::VOID_TILE,
};
use chain::test_helpers::{
    chain_event,
    object_id,
    test_package,
};

fn chunk_key(cx: u32, cy: u32) -> DynamicFieldName {
    DynamicFieldName {
        type_name: format!("{}::world::ChunkKey", test_package()),
        value: json!({ "cx": cx, "cy": cy }),
    }
}

fn chunk_fields(tile: u8) -> Value {
    json!({ "tiles": vec![tile; 25], "decorations": vec![0; 25] })
}

fn world_with_chunks() -> FakeChain {
    let world = object_id(0xee);
    FakeChain::new()
        .with_dynamic_field(
            world.clone(),
            chunk_key(0, 0),
            object_id(0xf0),
            json!({ "name": { "cx": 0, "cy": 0 }, "value": object_id(0x10).to_string() }),
        )
        .with_dynamic_field(
            world.clone(),
            chunk_key(1, 1),
            object_id(0xf1),
            json!({ "fields": { "value": { "id": object_id(0x11).to_string() } } }),
        )
        .with_dynamic_field(
            world.clone(),
            DynamicFieldName {
                type_name: format!("{}::world::SomethingElse", test_package()),
                value: json!({ "cx": 9, "cy": 9 }),
            },
            object_id(0xf2),
            json!({ "value": object_id(0x12).to_string() }),
        )
        .with_object(object_id(0x10), chunk_fields(1))
        .with_object(world, json!({ "difficulty": "12" }))
}

#[tokio::test]
async fn chunk_entries__only_follows_chunk_keys() {
    // given
    let chain = world_with_chunks();
    let loader = WorldLoader::new(&chain, &test_package());

    // when
    let entries = loader.chunk_entries(&object_id(0xee)).await.unwrap();

    // then
    assert_eq!(
        entries,
        vec![
            ChunkEntry {
                coords: ChunkCoords { cx: 0, cy: 0 },
                chunk_id: object_id(0x10),
            },
            ChunkEntry {
                coords: ChunkCoords { cx: 1, cy: 1 },
                chunk_id: object_id(0x11),
            },
        ]
    );
}

#[tokio::test]
async fn load_world__listed_chunk_is_read_through_listing_key() {
    // given
    let world = object_id(0xee);
    let listing_key = DynamicFieldName {
        type_name: format!("{}::world::ListingKey", test_package()),
        value: json!({ "chunk_id": object_id(0x11).to_string() }),
    };
    let chain = world_with_chunks().with_dynamic_field(
        world.clone(),
        listing_key,
        object_id(0xf3),
        json!({ "chunk": { "fields": chunk_fields(2) }, "price": "9" }),
    );
    let loader = WorldLoader::new(&chain, &test_package());

    // when
    let map = loader.load_world(&world).await.unwrap();

    // then
    assert_eq!(map.chunk_count, 2);
    assert_eq!(map.grid.width(), 10);
    assert_eq!(map.grid.tile(0, 0), 1);
    assert_eq!(map.grid.tile(5, 5), 2);
    assert_eq!(map.grid.tile(5, 0), VOID_TILE);
    assert_eq!(map.difficulty, 9);
}

#[tokio::test]
async fn load_world__unreadable_chunk__is_left_void() {
    // given
    let world = object_id(0xee);
    let chain = world_with_chunks();
    let loader = WorldLoader::new(&chain, &test_package());

    // when
    let map = loader.load_world(&world).await.unwrap();

    // then
    assert_eq!(map.grid.tile(5, 5), VOID_TILE);
    assert_eq!(map.chunk_count, 2);
}

#[tokio::test]
async fn world_ids__registry_world_comes_first_without_duplicates() {
    // given
    let registry = object_id(0xaa);
    let chain = FakeChain::new()
        .with_object(
            registry.clone(),
            json!({ "world_id": { "vec": [object_id(0xee).to_string()] } }),
        )
        .with_events(
            EventKind::WorldCreated,
            vec![
                chain_event(
                    EventKind::WorldCreated,
                    json!({ "world_id": object_id(0xe1).to_string() }),
                    Some(2),
                    2,
                ),
                chain_event(
                    EventKind::WorldCreated,
                    json!({ "world_id": object_id(0xee).to_string() }),
                    Some(1),
                    1,
                ),
            ],
        );
    let loader = WorldLoader::new(&chain, &test_package());

    // when
    let list = loader.world_ids(Some(&registry)).await.unwrap();

    // then
    assert_eq!(list.world_ids, vec![object_id(0xee), object_id(0xe1)]);
}

#[tokio::test]
async fn registry_world__empty_option__is_none() {
    let registry = object_id(0xaa);
    let chain = FakeChain::new().with_object(registry.clone(), json!({ "world_id": { "vec": [] } }));
    let loader = WorldLoader::new(&chain, &test_package());

    assert_eq!(loader.registry_world(&registry).await.unwrap(), None);
}

#[tokio::test]
async fn seller_proceeds__reads_nested_balance_or_zero() {
    // given
    let world = object_id(0xee);
    let owner: Address = object_id(0x51).to_string().parse().unwrap();
    let name = DynamicFieldName {
        type_name: format!("{}::world::SellerPayoutKey", test_package()),
        value: json!({ "owner": owner }),
    };
    let chain = FakeChain::new().with_dynamic_field(
        world.clone(),
        name,
        object_id(0xf4),
        json!({ "value": { "fields": { "balance": "1250" } } }),
    );
    let loader = WorldLoader::new(&chain, &test_package());
    let stranger: Address = object_id(0x52).to_string().parse().unwrap();

    // when
    let proceeds = loader.seller_proceeds(&world, &owner).await.unwrap();
    let nothing = loader.seller_proceeds(&world, &stranger).await.unwrap();

    // then
    assert_eq!(proceeds, 1250);
    assert_eq!(nothing, 0);
}
