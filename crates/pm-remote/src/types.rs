//! Wire types of the scene persistence API.

use pm_editor::ops::DroppedItem;
use serde::{Deserialize, Serialize};

/// Category assigned when none is given, and the fallback for items whose
/// category is deleted.
pub const DEFAULT_CATEGORY: &str = "Custom";
/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub id: i64,
    pub name: String,
}

/// A library item: something that can be dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl From<&Item> for DroppedItem {
    fn from(item: &Item) -> Self {
        DroppedItem {
            id: Some(item.id),
            name: item.name.clone(),
            icon_path: (!item.icon_path.is_empty()).then(|| item.icon_path.clone()),
        }
    }
}

/// Filter for [`crate::SceneApi::list_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemQuery {
    /// Case-insensitive substring over name, description, and category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Exact category; `"All"` disables the filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ItemQuery {
    pub fn matches(&self, item: &Item) -> bool {
        let text_ok = match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                [&item.name, &item.description, &item.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q))
            }
            None => true,
        };
        let category_ok = match self.category.as_deref() {
            Some(c) if !c.is_empty() && c != ALL_CATEGORIES => item.category == c,
            _ => true,
        };
        text_ok && category_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_path: String,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: default_category(),
            description: String::new(),
            icon_path: String::new(),
        }
    }
}

/// Partial item update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
}

impl ItemPatch {
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(icon_path) = &self.icon_path {
            item.icon_path = icon_path.clone();
        }
    }
}

/// An icon image to upload. With a `name`, the server also creates an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IconUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Image extensions accepted by the upload endpoint.
pub const ICON_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg"];

impl IconUpload {
    /// Lower-cased extension of `file_name`, if it is an accepted image type.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        ICON_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedIcon {
    pub icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(default)]
    pub ok: bool,
    pub scene_id: i64,
}

/// One entry of the server's edge style catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyleOption {
    pub id: String,
    pub label: String,
}

/// `GET /api/categories` answers either `["A"]` or `{"categories": ["A"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum CategoryList {
    Bare(Vec<String>),
    Wrapped {
        #[serde(default)]
        categories: Vec<String>,
    },
}

impl CategoryList {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            CategoryList::Bare(v) | CategoryList::Wrapped { categories: v } => v,
        }
    }
}

/// `POST /api/categories` answers either `"A"` or `{"name": "A"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedCategory {
    Bare(String),
    Wrapped {
        #[serde(default)]
        name: Option<String>,
    },
}

impl CreatedCategory {
    /// The created name, or `requested` if the server did not echo one.
    pub(crate) fn into_name(self, requested: &str) -> String {
        match self {
            CreatedCategory::Bare(name) | CreatedCategory::Wrapped { name: Some(name) } => name,
            CreatedCategory::Wrapped { name: None } => requested.to_string(),
        }
    }
}
