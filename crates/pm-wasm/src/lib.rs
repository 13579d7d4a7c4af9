//! WASM bridge for progress maps: exposes the sync engine to the browser.
//!
//! Compiled via `wasm-pack build --target web`. The JS canvas owns one
//! `PmCanvas` per editor view and talks to it with JSON strings.

use pm_core::{Document, EdgeStyle, NodeId};
use pm_editor::export::{export_json, export_svg};
use pm_editor::ops::Edit;
use pm_editor::shortcuts::{ShortcutAction, ShortcutMap};
use pm_editor::sync::{EditorSettings, Settled, SyncEngine};
use serde_json::json;
use wasm_bindgen::prelude::*;

/// The WASM-facing canvas controller.
///
/// The host calls [`settle`](PmCanvas::settle) after it has rendered each
/// update and forwards any returned document to the scene owner.
#[wasm_bindgen]
pub struct PmCanvas {
    engine: SyncEngine,
}

impl Default for PmCanvas {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl PmCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook_setup();
        Self {
            engine: SyncEngine::new(EditorSettings::default()),
        }
    }

    // ─── Owner ↔ canvas ──────────────────────────────────────────────────

    /// Push a document from the owner. An echo of the current document is
    /// ignored. Returns `{"ok":true,"applied":bool}` or an error object.
    pub fn load_json(&mut self, json: &str) -> String {
        match serde_json::from_str::<Document>(json) {
            Ok(doc) => {
                let applied = self.engine.accept_from_owner(doc);
                json!({ "ok": true, "applied": applied }).to_string()
            }
            Err(e) => error_json(&e.to_string()),
        }
    }

    /// The current document in wire shape.
    pub fn document_json(&self) -> String {
        export_json(self.engine.document()).unwrap_or_else(|e| error_json(&e.to_string()))
    }

    /// Settle one pending update. Returns
    /// `{"settled":"<kind>","document":{...}|null}`; a non-null document
    /// must be forwarded to the owner.
    pub fn settle(&mut self) -> String {
        settled_json(&self.engine.settle())
    }

    /// Settle until quiet. Returns the document to forward, or `""`.
    pub fn flush(&mut self) -> String {
        match self.engine.settle_all() {
            Some(doc) => serde_json::to_string(&doc).unwrap_or_default(),
            None => String::new(),
        }
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Apply a JSON-encoded edit, e.g. `{"op":"fork","children":3}`.
    /// Returns `{"ok":true,"created":[ids]}` or `{"ok":false,"error":"..."}`.
    pub fn apply_json(&mut self, edit: &str) -> String {
        let edit: Edit = match serde_json::from_str(edit) {
            Ok(e) => e,
            Err(e) => return error_json(&format!("bad edit: {e}")),
        };
        match self.engine.apply(edit) {
            Ok(created) => {
                let ids: Vec<&str> = created.iter().map(|id| id.as_str()).collect();
                json!({ "ok": true, "created": ids }).to_string()
            }
            Err(e) => error_json(&e.to_string()),
        }
    }

    /// Change the global edge style by name (legacy names accepted).
    pub fn set_edge_style(&mut self, name: &str) -> bool {
        let Some(style) = EdgeStyle::from_name(name) else {
            return false;
        };
        self.engine.apply(Edit::SetEdgeStyle { style }).is_ok()
    }

    pub fn details_visible(&self) -> bool {
        self.engine.settings.details_visible
    }

    pub fn edge_style(&self) -> String {
        self.engine.settings.edge_style.as_str().to_string()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a node by id; an empty id clears the selection.
    /// Returns `true` if the selection is now what was asked for.
    pub fn select_by_id(&mut self, node_id: &str) -> bool {
        if node_id.is_empty() {
            self.engine.select(None);
            return true;
        }
        let id = NodeId::intern(node_id);
        self.engine.select(Some(id));
        self.engine.selection() == Some(id)
    }

    /// The selected node id, or an empty string.
    pub fn get_selected_id(&self) -> String {
        self.engine
            .selection()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.engine.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.engine.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.history().can_redo()
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Handle a keyboard event. Returns `{"changed":bool,"action":"<name>"}`.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let Some(action) = ShortcutMap::resolve(key, ctrl, shift, alt, meta) else {
            return r#"{"changed":false,"action":"none"}"#.to_string();
        };
        let changed = self.engine.run_shortcut(action);
        json!({ "changed": changed, "action": action_to_name(action) }).to_string()
    }

    // ─── Export ──────────────────────────────────────────────────────────

    pub fn export_svg(&self) -> String {
        export_svg(self.engine.document())
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::Delete => "delete",
        ShortcutAction::Deselect => "deselect",
    }
}

fn settled_json(settled: &Settled) -> String {
    let kind = match settled {
        Settled::Quiet => "quiet",
        Settled::Corrected => "corrected",
        Settled::Suppressed => "suppressed",
        Settled::Committed(_) => "committed",
        Settled::Restored(_) => "restored",
    };
    json!({ "settled": kind, "document": settled.notification() }).to_string()
}

fn error_json(message: &str) -> String {
    json!({ "ok": false, "error": message }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("progress map WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Check that a scene graph parses. Returns `{"ok":true,"nodes":n,"edges":m}`
/// or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_document(json: &str) -> String {
    match serde_json::from_str::<Document>(json) {
        Ok(doc) => json!({
            "ok": true,
            "nodes": doc.nodes().len(),
            "edges": doc.edges().len(),
        })
        .to_string(),
        Err(e) => error_json(&e.to_string()),
    }
}

/// Render a scene graph to SVG without a canvas. Returns `""` if it does not parse.
#[wasm_bindgen]
pub fn render_svg(json: &str) -> String {
    match serde_json::from_str::<Document>(json) {
        Ok(doc) => {
            let r = pm_core::reconcile(doc.nodes(), doc.edges());
            export_svg(&Document::new(r.nodes, r.edges, doc.meta().clone()))
        }
        Err(e) => {
            log::warn!("render_svg: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    const SCENE: &str = r#"{
        "nodes": [
            {"id": "a", "type": "primary", "position": {"x": 0, "y": 0},
             "data": {"title": "A", "detailText": "note", "detailVisible": true}},
            {"id": "b", "type": "primary", "position": {"x": 300, "y": 0},
             "data": {"title": "B"}}
        ],
        "edges": [],
        "meta": {}
    }"#;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn load_then_settle_is_suppressed() {
        let mut canvas = PmCanvas::new();
        assert_eq!(parse(&canvas.load_json(SCENE))["applied"], true);
        let settled = parse(&canvas.settle());
        assert_eq!(settled["settled"], "suppressed");
        assert_eq!(settled["document"], Value::Null);
        assert_eq!(parse(&canvas.document_json())["nodes"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn edit_commits_and_reports_document() {
        let mut canvas = PmCanvas::new();
        canvas.load_json(SCENE);
        canvas.flush();
        let out = parse(&canvas.apply_json(r#"{"op":"connect","source":"a","target":"b"}"#));
        assert_eq!(out["ok"], true);
        let settled = parse(&canvas.settle());
        assert_eq!(settled["settled"], "committed");
        assert_eq!(settled["document"]["edges"].as_array().unwrap().len(), 2);
        assert!(canvas.can_undo());
    }

    #[test]
    fn bad_input_becomes_error_json() {
        let mut canvas = PmCanvas::new();
        let out = parse(&canvas.apply_json(r#"{"op":"explode"}"#));
        assert_eq!(out["ok"], false);
        let out = parse(&canvas.apply_json(r#"{"op":"fork","children":2}"#));
        assert_eq!(out["error"], "no node selected");
        let out = parse(&canvas.load_json("{not json"));
        assert_eq!(out["ok"], false);
    }

    #[test]
    fn keyboard_delete_removes_selection() {
        let mut canvas = PmCanvas::new();
        canvas.load_json(SCENE);
        canvas.flush();
        assert!(canvas.select_by_id("b"));
        assert!(!canvas.select_by_id("d-a"));
        canvas.select_by_id("b");
        let out = parse(&canvas.handle_key("Delete", false, false, false, false));
        assert_eq!(out["action"], "delete");
        assert_eq!(out["changed"], true);
        canvas.flush();
        assert_eq!(canvas.get_selected_id(), "");

        let out = parse(&canvas.handle_key("z", true, false, false, false));
        assert_eq!(out["action"], "undo");
        canvas.flush();
        assert!(parse(&canvas.document_json())["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["id"] == "b"));
    }

    #[test]
    fn edge_style_by_legacy_name() {
        let mut canvas = PmCanvas::new();
        assert!(canvas.set_edge_style("smoothstep"));
        assert_eq!(canvas.edge_style(), "rounded-orthogonal");
        assert!(!canvas.set_edge_style("zigzag"));
    }

    #[test]
    fn standalone_helpers() {
        assert_eq!(parse(&validate_document(SCENE))["nodes"], 2);
        let svg = render_svg(SCENE);
        assert!(svg.contains("class=\"detail\""));
        assert_eq!(render_svg("nope"), "");
    }
}
