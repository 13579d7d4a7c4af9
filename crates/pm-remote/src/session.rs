//! Remote sync: one open scene bound to one [`SyncEngine`].
//!
//! Graph loads are stamped with a generation number taken when the request
//! is issued. Switching scenes, or saving, issues a newer generation, so a
//! load that resolves late is dropped instead of overwriting the newer
//! scene. Saves adopt the server's echo as the engine's baseline.

use crate::api::SceneApi;
use crate::error::{ApiError, ApiResult};
use crate::types::SceneSummary;
use pm_core::Document;
use pm_editor::sync::SyncEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fetched graph waiting to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub generation: u64,
    pub scene_id: i64,
    pub doc: Document,
}

pub struct SceneSession {
    api: Arc<dyn SceneApi>,
    scene_id: Option<i64>,
    generation: AtomicU64,
}

/// Trimmed, non-empty name or a validation error.
pub fn validate_name<'a>(kind: &str, name: &'a str) -> ApiResult<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(format!("{kind} name must not be empty")));
    }
    Ok(name)
}

impl SceneSession {
    pub fn new(api: Arc<dyn SceneApi>) -> Self {
        Self {
            api,
            scene_id: None,
            generation: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &dyn SceneApi {
        self.api.as_ref()
    }

    /// The scene whose graph the engine currently shows.
    pub fn scene_id(&self) -> Option<i64> {
        self.scene_id
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Issue a graph load. Every call supersedes all earlier ones.
    pub async fn fetch(&self, scene_id: i64) -> ApiResult<PendingLoad> {
        let generation = self.next_generation();
        log::debug!("fetch scene {scene_id} (generation {generation})");
        let doc = self.api.get_graph(scene_id).await?;
        Ok(PendingLoad {
            generation,
            scene_id,
            doc,
        })
    }

    /// Apply a fetched graph as an external load unless a newer load or a
    /// save was issued since. Returns whether it was applied.
    pub fn apply(&mut self, engine: &mut SyncEngine, load: PendingLoad) -> bool {
        let current = self.generation();
        if load.generation != current {
            log::warn!(
                "dropping stale load of scene {} (generation {} < {current})",
                load.scene_id,
                load.generation
            );
            return false;
        }
        self.scene_id = Some(load.scene_id);
        engine.load(load.doc);
        true
    }

    /// Fetch and apply in one step.
    pub async fn open(&mut self, engine: &mut SyncEngine, scene_id: i64) -> ApiResult<bool> {
        let load = self.fetch(scene_id).await?;
        Ok(self.apply(engine, load))
    }

    /// Open the newest scene, or clear the engine if there are none.
    pub async fn open_first(&mut self, engine: &mut SyncEngine) -> ApiResult<Option<i64>> {
        let scenes = self.api.list_scenes().await?;
        match scenes.first().map(|s| s.id) {
            Some(id) => {
                self.open(engine, id).await?;
                Ok(Some(id))
            }
            None => {
                self.close(engine);
                Ok(None)
            }
        }
    }

    /// Forget the open scene and show an empty document.
    pub fn close(&mut self, engine: &mut SyncEngine) {
        self.next_generation();
        self.scene_id = None;
        engine.load(Document::default());
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    /// Save the engine's document and adopt the server's echo.
    ///
    /// An echo equal to the saved document keeps the undo history; a
    /// different one is loaded as the new baseline.
    pub async fn save(&mut self, engine: &mut SyncEngine) -> ApiResult<Document> {
        let scene_id = self
            .scene_id
            .ok_or_else(|| ApiError::Validation("no scene is open".into()))?;
        engine.settle_all();
        let doc = engine.document().clone();
        let echo = self.api.save_graph(scene_id, &doc).await?;
        self.next_generation();
        if engine.accept_from_owner(echo.clone()) {
            log::debug!("save: server echo differs, history reset");
        }
        Ok(echo)
    }

    // ─── Scenes ──────────────────────────────────────────────────────────

    pub async fn list_scenes(&self) -> ApiResult<Vec<SceneSummary>> {
        self.api.list_scenes().await
    }

    /// Create a scene and open it.
    pub async fn create_scene(&mut self, engine: &mut SyncEngine, name: &str) -> ApiResult<SceneSummary> {
        let name = validate_name("scene", name)?;
        let scene = self.api.create_scene(name).await?;
        self.open(engine, scene.id).await?;
        Ok(scene)
    }

    pub async fn rename_scene(&self, id: i64, name: &str) -> ApiResult<SceneSummary> {
        let name = validate_name("scene", name)?;
        self.api.rename_scene(id, name).await
    }

    /// Delete a scene. Deleting the open scene opens the newest remaining
    /// one. Returns the scene open afterwards.
    pub async fn delete_scene(&mut self, engine: &mut SyncEngine, id: i64) -> ApiResult<Option<i64>> {
        self.api.delete_scene(id).await?;
        if self.scene_id == Some(id) {
            return self.open_first(engine).await;
        }
        Ok(self.scene_id)
    }

    pub async fn create_category(&self, name: &str) -> ApiResult<String> {
        let name = validate_name("category", name)?;
        self.api.create_category(name).await
    }
}
