//! In-process [`SceneApi`] backend.
//!
//! Mirrors the server's rules (unique scene and category names, 404s for
//! missing rows, empty default graphs, category reassignment on delete) so
//! sessions can be exercised without a network. Archives are the graph's
//! JSON bytes rather than real zip files.

use crate::api::SceneApi;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    DEFAULT_CATEGORY, EdgeStyleOption, IconUpload, ImportResult, Item, ItemPatch, ItemQuery,
    NewItem, SceneSummary, UploadedIcon,
};
use pm_core::Document;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    next_scene: i64,
    next_item: i64,
    next_upload: u64,
    /// Creation order; listed newest first.
    scenes: Vec<SceneSummary>,
    graphs: HashMap<i64, Document>,
    items: Vec<Item>,
    categories: Vec<String>,
}

impl State {
    fn scene(&self, id: i64) -> ApiResult<&SceneSummary> {
        self.scenes
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("scene {id}")))
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.scenes
            .iter()
            .any(|s| s.name == name && Some(s.id) != except)
    }

    fn insert_scene(&mut self, name: String) -> SceneSummary {
        self.next_scene += 1;
        let scene = SceneSummary {
            id: self.next_scene,
            name,
        };
        self.scenes.push(scene.clone());
        scene
    }

    fn insert_item(&mut self, new: &NewItem) -> Item {
        self.next_item += 1;
        let item = Item {
            id: self.next_item,
            name: new.name.clone(),
            category: new.category.clone(),
            description: new.description.clone(),
            icon_path: new.icon_path.clone(),
            created_at: None,
        };
        self.items.push(item.clone());
        item
    }
}

fn bad_request(detail: &str) -> ApiError {
    ApiError::Status {
        status: 400,
        body: detail.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MemorySceneApi {
    state: Mutex<State>,
    /// Artificial latency for `get_graph`, per scene.
    graph_delays: Mutex<HashMap<i64, Duration>>,
}

impl MemorySceneApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `get_graph(scene_id)` take `delay` before answering.
    pub async fn delay_graph(&self, scene_id: i64, delay: Duration) {
        self.graph_delays.lock().await.insert(scene_id, delay);
    }

    /// Seed a scene with a stored graph.
    pub async fn seed_scene(&self, name: &str, doc: Document) -> SceneSummary {
        let mut state = self.state.lock().await;
        let scene = state.insert_scene(name.to_string());
        state.graphs.insert(scene.id, doc);
        scene
    }
}

#[async_trait::async_trait]
impl SceneApi for MemorySceneApi {
    async fn list_scenes(&self) -> ApiResult<Vec<SceneSummary>> {
        let state = self.state.lock().await;
        Ok(state.scenes.iter().rev().cloned().collect())
    }

    async fn create_scene(&self, name: &str) -> ApiResult<SceneSummary> {
        let mut state = self.state.lock().await;
        if state.name_taken(name, None) {
            return Err(bad_request("Scene name already exists"));
        }
        Ok(state.insert_scene(name.to_string()))
    }

    async fn rename_scene(&self, id: i64, name: &str) -> ApiResult<SceneSummary> {
        let mut state = self.state.lock().await;
        state.scene(id)?;
        if state.name_taken(name, Some(id)) {
            return Err(bad_request("Scene name already exists"));
        }
        let scene = state
            .scenes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("scene {id}")))?;
        scene.name = name.to_string();
        Ok(scene.clone())
    }

    async fn delete_scene(&self, id: i64) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.scene(id)?;
        state.scenes.retain(|s| s.id != id);
        state.graphs.remove(&id);
        Ok(())
    }

    async fn get_graph(&self, scene_id: i64) -> ApiResult<Document> {
        let delay = self.graph_delays.lock().await.get(&scene_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        state.scene(scene_id)?;
        Ok(state.graphs.entry(scene_id).or_default().clone())
    }

    async fn save_graph(&self, scene_id: i64, doc: &Document) -> ApiResult<Document> {
        let mut state = self.state.lock().await;
        state.scene(scene_id)?;
        state.graphs.insert(scene_id, doc.clone());
        Ok(doc.clone())
    }

    async fn list_items(&self, query: &ItemQuery) -> ApiResult<Vec<Item>> {
        let state = self.state.lock().await;
        Ok(state.items.iter().filter(|i| query.matches(i)).cloned().collect())
    }

    async fn create_item(&self, item: &NewItem) -> ApiResult<Item> {
        Ok(self.state.lock().await.insert_item(item))
    }

    async fn update_item(&self, id: i64, patch: &ItemPatch) -> ApiResult<Item> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("item {id}")))?;
        patch.apply_to(item);
        Ok(item.clone())
    }

    async fn delete_item(&self, id: i64) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(ApiError::NotFound(format!("item {id}")));
        }
        Ok(())
    }

    async fn upload_icon(&self, upload: IconUpload) -> ApiResult<UploadedIcon> {
        let Some(ext) = upload.extension() else {
            return Err(bad_request("Unsupported file type"));
        };
        let mut state = self.state.lock().await;
        state.next_upload += 1;
        let icon_url = format!("/uploads/icon-{}.{ext}", state.next_upload);
        let item = match upload.name.filter(|n| !n.is_empty()) {
            Some(name) => Some(state.insert_item(&NewItem {
                name,
                category: upload
                    .category
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                description: upload.description.unwrap_or_default(),
                icon_path: icon_url.clone(),
            })),
            None => None,
        };
        Ok(UploadedIcon { icon_url, item })
    }

    async fn list_categories(&self) -> ApiResult<Vec<String>> {
        Ok(self.state.lock().await.categories.clone())
    }

    async fn create_category(&self, name: &str) -> ApiResult<String> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|c| c == name) {
            return Err(bad_request("Category already exists"));
        }
        state.categories.push(name.to_string());
        Ok(name.to_string())
    }

    async fn delete_category(&self, name: &str) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        let before = state.categories.len();
        state.categories.retain(|c| c != name);
        if state.categories.len() == before {
            return Err(ApiError::NotFound(format!("category {name}")));
        }
        for item in state.items.iter_mut().filter(|i| i.category == name) {
            item.category = DEFAULT_CATEGORY.to_string();
        }
        Ok(())
    }

    async fn edge_styles(&self) -> ApiResult<Vec<EdgeStyleOption>> {
        Ok([
            ("default", "Straight"),
            ("step", "Orthogonal (Step)"),
            ("smoothstep", "Smooth Step"),
            ("bezier", "Bezier"),
        ]
        .into_iter()
        .map(|(id, label)| EdgeStyleOption {
            id: id.into(),
            label: label.into(),
        })
        .collect())
    }

    async fn export_scene_zip(&self, scene_id: i64) -> ApiResult<Vec<u8>> {
        let state = self.state.lock().await;
        state.scene(scene_id)?;
        let graph = state
            .graphs
            .get(&scene_id)
            .ok_or_else(|| ApiError::NotFound(format!("graph of scene {scene_id}")))?;
        Ok(serde_json::to_vec(graph)?)
    }

    async fn import_scene_zip(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<ImportResult> {
        let doc: Document = serde_json::from_slice(&bytes)?;
        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        let mut state = self.state.lock().await;
        let mut name = stem.to_string();
        let mut n = 1;
        while state.name_taken(&name, None) {
            n += 1;
            name = format!("{stem} ({n})");
        }
        let scene = state.insert_scene(name);
        state.graphs.insert(scene.id, doc);
        Ok(ImportResult {
            ok: true,
            scene_id: scene.id,
        })
    }
}
