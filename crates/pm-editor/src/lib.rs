pub mod error;
pub mod export;
pub mod history;
pub mod ops;
pub mod shortcuts;
pub mod sync;

pub use error::EditError;
pub use export::{export_json, export_svg};
pub use history::History;
pub use ops::{Created, DroppedItem, Edit};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use sync::{EditorSettings, Phase, Settled, SyncEngine};
