pub mod companion;
pub mod id;
pub mod layout;
pub mod model;

pub use companion::{Reconciled, reconcile};
pub use id::NodeId;
pub use layout::{Direction, LayoutEngine, RankedLayout, apply_layout};
pub use model::*;
