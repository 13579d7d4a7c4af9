use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for node and edge ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Id prefix of a companion detail node (`d-<primary>`).
pub const COMPANION_NODE_PREFIX: &str = "d-";

/// Id prefix of a companion edge (`dedge-<primary>`).
pub const COMPANION_EDGE_PREFIX: &str = "dedge-";

/// An interned identifier for nodes and edges in a document.
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a process-unique id with a prefix (e.g. `n_4`, `e_12`).
    ///
    /// Uniqueness is only guaranteed against other generated ids; callers
    /// that mix in loaded documents must check for collisions.
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// The id of the companion node owned by this primary node.
    pub fn companion_node(self) -> Self {
        Self::intern(&format!("{COMPANION_NODE_PREFIX}{}", self.as_str()))
    }

    /// The id of the companion edge owned by this primary node.
    pub fn companion_edge(self) -> Self {
        Self::intern(&format!("{COMPANION_EDGE_PREFIX}{}", self.as_str()))
    }

    /// Whether this id is in the reserved companion-edge namespace.
    pub fn is_companion_edge(&self) -> bool {
        self.as_str().starts_with(COMPANION_EDGE_PREFIX)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}
