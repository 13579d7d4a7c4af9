//! Integration tests: history tracking through the sync engine (pm-editor).
//!
//! Drives edits through `SyncEngine::apply` and checks that undo/redo walk
//! the snapshot stacks, that loads reset history, and that the past stack
//! stays bounded.

use pm_core::{Document, Meta, Node, NodeId, Position, PrimaryData};
use pm_editor::ops::Edit;
use pm_editor::sync::SyncEngine;
use pretty_assertions::assert_eq;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn loaded(nodes: Vec<Node>) -> SyncEngine {
    let mut engine = SyncEngine::default();
    engine.load(Document::new(nodes, vec![], Meta::new()));
    engine.settle_all();
    engine
}

fn node(id: &str, x: f32, y: f32) -> Node {
    Node::primary(NodeId::intern(id), Position::new(x, y), PrimaryData::titled(id))
}

fn move_to(engine: &mut SyncEngine, id: &str, x: f32) {
    engine
        .apply(Edit::MoveNode {
            id: NodeId::intern(id),
            position: Position::new(x, 0.0),
        })
        .unwrap();
    engine.settle_all();
}

// ─── Round trip ─────────────────────────────────────────────────────────

#[test]
fn undo_redo_round_trip() {
    init_logger();
    let mut engine = loaded(vec![node("a", 0.0, 0.0)]);
    let s0 = engine.document().clone();

    engine
        .apply(Edit::SetTitle {
            id: NodeId::intern("a"),
            title: "Renamed".into(),
        })
        .unwrap();
    engine.settle_all();
    let s1 = engine.document().clone();
    assert_ne!(s0, s1);

    assert!(engine.undo());
    let notified = engine.settle_all();
    assert_eq!(engine.document(), &s0);
    assert_eq!(notified.as_ref(), Some(&s0));

    assert!(engine.redo());
    engine.settle_all();
    assert_eq!(engine.document(), &s1);
}

#[test]
fn restore_is_not_recorded() {
    let mut engine = loaded(vec![node("a", 0.0, 0.0)]);
    move_to(&mut engine, "a", 10.0);
    move_to(&mut engine, "a", 20.0);
    assert_eq!(engine.history().len(), 3);

    engine.undo();
    engine.settle_all();
    assert_eq!(engine.history().len(), 2);
    assert_eq!(engine.history().future_len(), 1);
}

#[test]
fn undo_restores_companion_cards() {
    let mut engine = loaded(vec![node("a", 0.0, 0.0)]);
    let a = NodeId::intern("a");
    engine
        .apply(Edit::SetDetailText {
            id: a,
            text: "hello".into(),
        })
        .unwrap();
    engine.apply(Edit::SetDetailVisible { id: a, visible: true }).unwrap();
    engine.settle_all();
    assert_eq!(engine.document().nodes().len(), 2);

    engine.undo();
    engine.settle_all();
    assert_eq!(engine.document().nodes().len(), 1);

    engine.redo();
    engine.settle_all();
    assert!(engine.document().contains_node(NodeId::intern("d-a")));
}

// ─── Edge cases ─────────────────────────────────────────────────────────

#[test]
fn undo_on_fresh_load_is_noop() {
    let mut engine = loaded(vec![node("a", 5.0, 5.0)]);
    let before = engine.document().clone();
    assert!(!engine.undo());
    assert_eq!(engine.settle_all(), None);
    assert_eq!(engine.document(), &before);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn redo_with_empty_future_is_noop() {
    let mut engine = loaded(vec![node("a", 5.0, 5.0)]);
    move_to(&mut engine, "a", 50.0);
    assert!(!engine.redo());
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn new_edit_after_undo_clears_redo() {
    let mut engine = loaded(vec![node("a", 0.0, 0.0)]);
    move_to(&mut engine, "a", 10.0);
    engine.undo();
    engine.settle_all();
    move_to(&mut engine, "a", 99.0);
    assert!(!engine.history().can_redo());
    assert!(!engine.redo());
}

#[test]
fn load_resets_history() {
    let mut engine = loaded(vec![node("a", 0.0, 0.0)]);
    move_to(&mut engine, "a", 10.0);
    move_to(&mut engine, "a", 20.0);
    engine.undo();
    engine.settle_all();

    let mut data = PrimaryData::titled("g");
    data.detail_text = Some("note".into());
    data.detail_visible = true;
    let g = Document::new(
        vec![Node::primary(NodeId::intern("g"), Position::default(), data)],
        vec![],
        Meta::new(),
    );
    engine.load(g);
    engine.settle_all();

    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.history().future_len(), 0);
    // The single entry is the loaded graph after reconciliation.
    assert_eq!(engine.history().current(), Some(&engine.document().snapshot()));
    assert_eq!(engine.document().nodes().len(), 2);
}

#[test]
fn history_is_bounded() {
    let mut engine = SyncEngine::default();
    engine
        .apply(Edit::DropItem {
            item: Default::default(),
            position: Position::default(),
        })
        .unwrap();
    engine.settle_all();
    let id = engine.document().nodes()[0].id;

    for i in 1..150 {
        engine
            .apply(Edit::MoveNode {
                id,
                position: Position::new(i as f32, 0.0),
            })
            .unwrap();
        engine.settle_all();
    }
    assert_eq!(engine.history().len(), 100);

    let mut undone = 0;
    while engine.undo() {
        engine.settle_all();
        undone += 1;
    }
    assert_eq!(undone, 99);
    assert_eq!(engine.document().nodes()[0].position, Position::new(50.0, 0.0));
}
