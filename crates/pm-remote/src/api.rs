use crate::error::ApiResult;
use crate::types::{
    EdgeStyleOption, IconUpload, ImportResult, Item, ItemPatch, ItemQuery, NewItem, SceneSummary,
    UploadedIcon,
};
use pm_core::Document;

/// The scene persistence API.
///
/// Graphs are loaded and saved whole; a save answers with the server's
/// canonical copy, which the caller adopts as its new baseline.
#[async_trait::async_trait]
pub trait SceneApi: Send + Sync {
    // ── Scenes ──
    async fn list_scenes(&self) -> ApiResult<Vec<SceneSummary>>;
    async fn create_scene(&self, name: &str) -> ApiResult<SceneSummary>;
    async fn rename_scene(&self, id: i64, name: &str) -> ApiResult<SceneSummary>;
    /// Deletes the scene together with its graph.
    async fn delete_scene(&self, id: i64) -> ApiResult<()>;

    // ── Graphs ──
    /// A scene that was never saved has an empty graph.
    async fn get_graph(&self, scene_id: i64) -> ApiResult<Document>;
    async fn save_graph(&self, scene_id: i64, doc: &Document) -> ApiResult<Document>;

    // ── Library ──
    async fn list_items(&self, query: &ItemQuery) -> ApiResult<Vec<Item>>;
    async fn create_item(&self, item: &NewItem) -> ApiResult<Item>;
    async fn update_item(&self, id: i64, patch: &ItemPatch) -> ApiResult<Item>;
    async fn delete_item(&self, id: i64) -> ApiResult<()>;
    async fn upload_icon(&self, upload: IconUpload) -> ApiResult<UploadedIcon>;

    // ── Categories ──
    async fn list_categories(&self) -> ApiResult<Vec<String>>;
    async fn create_category(&self, name: &str) -> ApiResult<String>;
    /// Items in the deleted category move to `"Custom"`.
    async fn delete_category(&self, name: &str) -> ApiResult<()>;

    async fn edge_styles(&self) -> ApiResult<Vec<EdgeStyleOption>>;

    // ── Archives ──
    async fn export_scene_zip(&self, scene_id: i64) -> ApiResult<Vec<u8>>;
    async fn import_scene_zip(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<ImportResult>;
}
