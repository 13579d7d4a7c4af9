//! `reqwest` implementation of [`SceneApi`].

use crate::api::SceneApi;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    CategoryList, CreatedCategory, EdgeStyleOption, IconUpload, ImportResult, Item, ItemPatch,
    ItemQuery, NewItem, SceneSummary, UploadedIcon,
};
use pm_core::Document;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

pub struct HttpSceneApi {
    client: Client,
    base: Url,
}

impl HttpSceneApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Validation(format!("invalid base url {:?}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Validation(format!(
                "base url {:?} cannot hold a path",
                config.base_url
            )));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn from_env() -> ApiResult<Self> {
        Self::new(&ApiConfig::from_env())
    }

    /// `base/api/<segments...>`, with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        log::debug!("{} -> {status}", response.url().path());
        if status.is_success() {
            return Ok(response);
        }
        let body = error_detail(&response.text().await.unwrap_or_default());
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(body));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let bytes = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// FastAPI-style `{"detail": "..."}` bodies collapse to their message.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait::async_trait]
impl SceneApi for HttpSceneApi {
    async fn list_scenes(&self) -> ApiResult<Vec<SceneSummary>> {
        self.json(self.client.get(self.endpoint(&["scenes"]))).await
    }

    async fn create_scene(&self, name: &str) -> ApiResult<SceneSummary> {
        let request = self
            .client
            .post(self.endpoint(&["scenes"]))
            .json(&json!({ "name": name }));
        self.json(request).await
    }

    async fn rename_scene(&self, id: i64, name: &str) -> ApiResult<SceneSummary> {
        let request = self
            .client
            .put(self.endpoint(&["scenes", &id.to_string()]))
            .json(&json!({ "name": name }));
        self.json(request).await
    }

    async fn delete_scene(&self, id: i64) -> ApiResult<()> {
        self.send(self.client.delete(self.endpoint(&["scenes", &id.to_string()])))
            .await?;
        Ok(())
    }

    async fn get_graph(&self, scene_id: i64) -> ApiResult<Document> {
        let url = self.endpoint(&["scenes", &scene_id.to_string(), "graph"]);
        self.json(self.client.get(url)).await
    }

    async fn save_graph(&self, scene_id: i64, doc: &Document) -> ApiResult<Document> {
        let url = self.endpoint(&["scenes", &scene_id.to_string(), "graph"]);
        self.json(self.client.put(url).json(doc)).await
    }

    async fn list_items(&self, query: &ItemQuery) -> ApiResult<Vec<Item>> {
        self.json(self.client.get(self.endpoint(&["items"])).query(query))
            .await
    }

    async fn create_item(&self, item: &NewItem) -> ApiResult<Item> {
        self.json(self.client.post(self.endpoint(&["items"])).json(item))
            .await
    }

    async fn update_item(&self, id: i64, patch: &ItemPatch) -> ApiResult<Item> {
        let url = self.endpoint(&["items", &id.to_string()]);
        self.json(self.client.put(url).json(patch)).await
    }

    async fn delete_item(&self, id: i64) -> ApiResult<()> {
        self.send(self.client.delete(self.endpoint(&["items", &id.to_string()])))
            .await?;
        Ok(())
    }

    async fn upload_icon(&self, upload: IconUpload) -> ApiResult<UploadedIcon> {
        if upload.extension().is_none() {
            return Err(ApiError::Validation(format!(
                "unsupported icon file type: {}",
                upload.file_name
            )));
        }
        let mut form = Form::new().part("file", Part::bytes(upload.bytes).file_name(upload.file_name));
        for (field, value) in [
            ("name", upload.name),
            ("category", upload.category),
            ("description", upload.description),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form = form.text(field, value);
            }
        }
        self.json(self.client.post(self.endpoint(&["upload"])).multipart(form))
            .await
    }

    async fn list_categories(&self) -> ApiResult<Vec<String>> {
        let list: CategoryList = self.json(self.client.get(self.endpoint(&["categories"]))).await?;
        Ok(list.into_vec())
    }

    async fn create_category(&self, name: &str) -> ApiResult<String> {
        let request = self
            .client
            .post(self.endpoint(&["categories"]))
            .json(&json!({ "name": name }));
        let created: CreatedCategory = self.json(request).await?;
        Ok(created.into_name(name))
    }

    async fn delete_category(&self, name: &str) -> ApiResult<()> {
        self.send(self.client.delete(self.endpoint(&["categories", name])))
            .await?;
        Ok(())
    }

    async fn edge_styles(&self) -> ApiResult<Vec<EdgeStyleOption>> {
        self.json(self.client.get(self.endpoint(&["edge-styles"]))).await
    }

    async fn export_scene_zip(&self, scene_id: i64) -> ApiResult<Vec<u8>> {
        let url = self.endpoint(&["export", "scene", &format!("{scene_id}.zip")]);
        let bytes = self.send(self.client.get(url)).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn import_scene_zip(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<ImportResult> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        self.json(self.client.post(self.endpoint(&["import", "scene"])).multipart(form))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn api(base: &str) -> HttpSceneApi {
        HttpSceneApi::new(&ApiConfig {
            base_url: base.into(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_are_joined_and_encoded() {
        let api = api("http://127.0.0.1:8000");
        assert_eq!(
            api.endpoint(&["scenes", "3", "graph"]).as_str(),
            "http://127.0.0.1:8000/api/scenes/3/graph"
        );
        assert_eq!(
            api.endpoint(&["categories", "Tools & Gear"]).as_str(),
            "http://127.0.0.1:8000/api/categories/Tools%20&%20Gear"
        );
        assert_eq!(
            api.endpoint(&["export", "scene", "7.zip"]).as_str(),
            "http://127.0.0.1:8000/api/export/scene/7.zip"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let api = api("https://maps.example.com/pm/");
        assert_eq!(
            api.endpoint(&["items"]).as_str(),
            "https://maps.example.com/pm/api/items"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = HttpSceneApi::new(&ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn error_detail_unwraps_fastapi_bodies() {
        assert_eq!(
            error_detail(r#"{"detail":"Scene name already exists"}"#),
            "Scene name already exists"
        );
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn unsupported_upload_fails_before_request() {
        // Nothing listens on port 9; the check must fire first.
        let api = api("http://127.0.0.1:9");
        let err = api
            .upload_icon(IconUpload {
                file_name: "readme.md".into(),
                bytes: vec![1, 2, 3],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
