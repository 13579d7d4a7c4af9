//! Remote sync adapter: the scene persistence API and the session that
//! binds one open scene to a [`pm_editor::SyncEngine`].

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod session;
pub mod types;

pub use api::SceneApi;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use http::HttpSceneApi;
pub use memory::MemorySceneApi;
pub use session::{PendingLoad, SceneSession};
pub use types::*;
