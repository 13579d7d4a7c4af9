//! Integration tests: scene session against the in-memory backend (pm-remote).
//!
//! Covers scene switching, stale load rejection, save echo adoption, and
//! the server rules the backend mirrors.

use pm_core::{Document, Meta, Node, NodeId, Position, PrimaryData};
use pm_editor::ops::Edit;
use pm_editor::sync::SyncEngine;
use pm_remote::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn graph(ids: &[&str]) -> Document {
    let nodes = ids
        .iter()
        .map(|id| {
            let mut data = PrimaryData::titled(*id);
            data.detail_text = Some(format!("about {id}"));
            data.detail_visible = true;
            Node::primary(NodeId::intern(id), Position::default(), data)
        })
        .collect();
    Document::new(nodes, vec![], Meta::new())
}

async fn setup() -> (Arc<MemorySceneApi>, SceneSession, SyncEngine) {
    init_logger();
    let api = Arc::new(MemorySceneApi::new());
    api.seed_scene("Overworld", graph(&["ore", "ingot"])).await;
    api.seed_scene("Nether", graph(&["quartz"])).await;
    let session = SceneSession::new(api.clone());
    (api, session, SyncEngine::default())
}

// ─── Loading ────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_reconciles_and_resets_history() {
    let (_api, mut session, mut engine) = setup().await;
    assert!(session.open(&mut engine, 1).await.unwrap());
    engine.settle_all();

    assert_eq!(session.scene_id(), Some(1));
    // Two primaries plus their detail cards.
    assert_eq!(engine.document().nodes().len(), 4);
    assert_eq!(engine.history().len(), 1);
    assert!(!engine.history().can_undo());
}

#[tokio::test]
async fn open_first_picks_newest_scene() {
    let (_api, mut session, mut engine) = setup().await;
    assert_eq!(session.open_first(&mut engine).await.unwrap(), Some(2));
}

#[tokio::test]
async fn late_load_of_previous_scene_is_dropped() {
    let (api, mut session, mut engine) = setup().await;
    api.delay_graph(1, Duration::from_millis(30)).await;

    let (slow, fast) = tokio::join!(session.fetch(1), session.fetch(2));
    let (slow, fast) = (slow.unwrap(), fast.unwrap());
    assert!(slow.generation < fast.generation);

    assert!(session.apply(&mut engine, fast));
    assert!(!session.apply(&mut engine, slow));
    engine.settle_all();

    assert_eq!(session.scene_id(), Some(2));
    assert!(engine.document().contains_node(NodeId::intern("quartz")));
    assert!(!engine.document().contains_node(NodeId::intern("ore")));
}

#[tokio::test]
async fn missing_scene_is_not_found() {
    let (_api, mut session, mut engine) = setup().await;
    let err = session.open(&mut engine, 99).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(engine.document().is_empty());
}

#[tokio::test]
async fn never_saved_scene_has_empty_graph() {
    let (_api, mut session, mut engine) = setup().await;
    let scene = session.create_scene(&mut engine, "  Fresh  ").await.unwrap();
    assert_eq!(scene.name, "Fresh");
    assert_eq!(session.scene_id(), Some(scene.id));
    assert!(engine.document().is_empty());
}

// ─── Saving ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_round_trips_and_keeps_history() {
    let (api, mut session, mut engine) = setup().await;
    session.open(&mut engine, 2).await.unwrap();
    engine.settle_all();
    engine
        .apply(Edit::MoveNode {
            id: NodeId::intern("quartz"),
            position: Position::new(80.0, 40.0),
        })
        .unwrap();

    let echo = session.save(&mut engine).await.unwrap();
    assert_eq!(&echo, engine.document());
    // The echo equals what we sent, so the edit can still be undone.
    assert!(engine.history().can_undo());

    let stored = api.get_graph(2).await.unwrap();
    assert_eq!(stored, echo);
    let card = stored.node(NodeId::intern("d-quartz")).unwrap();
    assert_eq!(card.position, Position::new(230.0, 50.0));
}

#[tokio::test]
async fn save_invalidates_in_flight_loads() {
    let (_api, mut session, mut engine) = setup().await;
    session.open(&mut engine, 1).await.unwrap();
    let stale = session.fetch(1).await.unwrap();
    session.save(&mut engine).await.unwrap();
    assert!(!session.apply(&mut engine, stale));
}

#[tokio::test]
async fn save_without_open_scene_fails_locally() {
    let (_api, mut session, mut engine) = setup().await;
    let err = session.save(&mut engine).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

// ─── Scene management ───────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_scene_names_are_rejected() {
    let (_api, mut session, mut engine) = setup().await;
    let err = session.create_scene(&mut engine, "Nether").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    let err = session.rename_scene(1, "Nether").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    // Renaming to its own name is fine.
    assert_eq!(session.rename_scene(2, "Nether").await.unwrap().name, "Nether");
}

#[tokio::test]
async fn blank_names_never_reach_the_server() {
    let (api, mut session, mut engine) = setup().await;
    let err = session.create_scene(&mut engine, "   ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(api.list_scenes().await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_open_scene_switches_to_remaining() {
    let (_api, mut session, mut engine) = setup().await;
    session.open(&mut engine, 2).await.unwrap();
    let now_open = session.delete_scene(&mut engine, 2).await.unwrap();
    assert_eq!(now_open, Some(1));
    engine.settle_all();
    assert!(engine.document().contains_node(NodeId::intern("ore")));

    let now_open = session.delete_scene(&mut engine, 1).await.unwrap();
    assert_eq!(now_open, None);
    assert!(engine.document().is_empty());
}

// ─── Library ────────────────────────────────────────────────────────────

#[tokio::test]
async fn items_and_categories() {
    let (api, session, _engine) = setup().await;
    session.create_category("Gems").await.unwrap();
    let err = api.create_category("Gems").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));

    let ruby = api
        .create_item(&NewItem {
            category: "Gems".into(),
            ..NewItem::named("Ruby")
        })
        .await
        .unwrap();
    api.create_item(&NewItem::named("Stick")).await.unwrap();

    let gems = api
        .list_items(&ItemQuery {
            q: None,
            category: Some("Gems".into()),
        })
        .await
        .unwrap();
    assert_eq!(gems, vec![ruby.clone()]);

    api.delete_category("Gems").await.unwrap();
    let moved = api
        .list_items(&ItemQuery {
            q: Some("ruby".into()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(moved[0].category, DEFAULT_CATEGORY);

    let renamed = api
        .update_item(
            ruby.id,
            &ItemPatch {
                name: Some("Red Gem".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Red Gem");
    api.delete_item(ruby.id).await.unwrap();
    assert!(matches!(api.delete_item(ruby.id).await, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn upload_creates_item_when_named() {
    let (api, _session, _engine) = setup().await;
    let bare = api
        .upload_icon(IconUpload {
            file_name: "gear.svg".into(),
            bytes: b"<svg/>".to_vec(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(bare.item.is_none());
    assert!(bare.icon_url.ends_with(".svg"));

    let named = api
        .upload_icon(IconUpload {
            file_name: "pick.png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
            name: Some("Pickaxe".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let item = named.item.unwrap();
    assert_eq!(item.category, DEFAULT_CATEGORY);
    assert_eq!(item.icon_path, named.icon_url);

    let err = api
        .upload_icon(IconUpload {
            file_name: "notes.txt".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
}

#[tokio::test]
async fn dropped_library_item_becomes_node() {
    let (api, mut session, mut engine) = setup().await;
    session.open(&mut engine, 1).await.unwrap();
    engine.settle_all();
    let item = api
        .create_item(&NewItem {
            icon_path: "/uploads/ruby.png".into(),
            ..NewItem::named("Ruby")
        })
        .await
        .unwrap();

    let created = engine
        .apply(Edit::DropItem {
            item: (&item).into(),
            position: Position::new(10.0, 10.0),
        })
        .unwrap();
    engine.settle_all();
    let data = engine.document().node(created[0]).unwrap().primary_data().unwrap().clone();
    assert_eq!(data.item_ref, Some(item.id));
    assert_eq!(data.icon_ref.as_deref(), Some("/uploads/ruby.png"));
}

// ─── Archives ───────────────────────────────────────────────────────────

#[tokio::test]
async fn export_then_import_copies_scene() {
    let (api, mut session, mut engine) = setup().await;
    session.open(&mut engine, 1).await.unwrap();
    session.save(&mut engine).await.unwrap();

    let archive = api.export_scene_zip(1).await.unwrap();
    let imported = api.import_scene_zip("Overworld.zip", archive).await.unwrap();
    assert!(imported.ok);

    let scenes = api.list_scenes().await.unwrap();
    assert_eq!(scenes[0].name, "Overworld (2)");
    assert_eq!(
        api.get_graph(imported.scene_id).await.unwrap(),
        api.get_graph(1).await.unwrap()
    );
}
