//! Graph document model for progress maps.
//!
//! A document is an ordered list of nodes and an ordered list of edges plus
//! an opaque `meta` map. Node order only affects z-order. Nodes come in two
//! variants: **primary** icon nodes that the user creates and edits, and
//! **companion** detail cards that are derived from primary node state by
//! [`crate::companion::reconcile`] and never edited directly.
//!
//! All mutation at this layer is whole-collection replacement. The only
//! structural rule enforced here is id uniqueness within each collection;
//! edge endpoints are not validated.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque scene-level attributes, passed through untouched.
pub type Meta = serde_json::Map<String, serde_json::Value>;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Anchor on one side of a node where an edge attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    #[serde(rename = "t", alias = "top")]
    Top,
    #[serde(rename = "b", alias = "bottom")]
    Bottom,
    #[serde(rename = "l", alias = "left")]
    Left,
    #[serde(rename = "r", alias = "right")]
    Right,
}

impl Port {
    pub fn as_str(self) -> &'static str {
        match self {
            Port::Top => "t",
            Port::Bottom => "b",
            Port::Left => "l",
            Port::Right => "r",
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Payload of a user-created icon node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrimaryData {
    pub title: String,
    #[serde(alias = "icon", skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
    #[serde(alias = "itemId", skip_serializing_if = "Option::is_none")]
    pub item_ref: Option<i64>,
    #[serde(alias = "details", skip_serializing_if = "Option::is_none")]
    pub detail_text: Option<String>,
    #[serde(alias = "showDetails")]
    pub detail_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_clamp: Option<u32>,
}

impl PrimaryData {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// The trimmed detail text if this node should currently show a
    /// companion card, `None` otherwise.
    pub fn companion_text(&self) -> Option<&str> {
        if !self.detail_visible {
            return None;
        }
        self.detail_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Payload of a derived detail card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanionData {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_clamp: Option<u32>,
}

/// Node variant, serialized as the wire `type` tag plus its `data` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeKind {
    #[serde(rename = "primary", alias = "iconNode")]
    Primary(PrimaryData),
    #[serde(rename = "companion", alias = "detailNode")]
    Companion(CompanionData),
}

fn yes() -> bool {
    true
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "yes")]
    pub draggable: bool,
    #[serde(default = "yes")]
    pub selectable: bool,
}

impl Node {
    pub fn primary(id: NodeId, position: Position, data: PrimaryData) -> Self {
        Self {
            id,
            kind: NodeKind::Primary(data),
            position,
            draggable: true,
            selectable: true,
        }
    }

    /// Companion cards are pinned: never draggable, never selectable.
    pub fn companion(id: NodeId, position: Position, data: CompanionData) -> Self {
        Self {
            id,
            kind: NodeKind::Companion(data),
            position,
            draggable: false,
            selectable: false,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self.kind, NodeKind::Primary(_))
    }

    pub fn is_companion(&self) -> bool {
        matches!(self.kind, NodeKind::Companion(_))
    }

    pub fn primary_data(&self) -> Option<&PrimaryData> {
        match &self.kind {
            NodeKind::Primary(d) => Some(d),
            NodeKind::Companion(_) => None,
        }
    }

    pub fn primary_data_mut(&mut self) -> Option<&mut PrimaryData> {
        match &mut self.kind {
            NodeKind::Primary(d) => Some(d),
            NodeKind::Companion(_) => None,
        }
    }

    pub fn companion_data(&self) -> Option<&CompanionData> {
        match &self.kind {
            NodeKind::Companion(d) => Some(d),
            NodeKind::Primary(_) => None,
        }
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// How an edge path is routed between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeStyle {
    #[serde(rename = "straight", alias = "default")]
    Straight,
    #[default]
    #[serde(rename = "orthogonal", alias = "step")]
    Orthogonal,
    #[serde(rename = "rounded-orthogonal", alias = "smoothstep")]
    RoundedOrthogonal,
    #[serde(rename = "bezier")]
    Bezier,
}

impl EdgeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeStyle::Straight => "straight",
            EdgeStyle::Orthogonal => "orthogonal",
            EdgeStyle::RoundedOrthogonal => "rounded-orthogonal",
            EdgeStyle::Bezier => "bezier",
        }
    }

    /// Parse a style name, accepting the legacy renderer names too.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "straight" | "default" => Some(EdgeStyle::Straight),
            "orthogonal" | "step" => Some(EdgeStyle::Orthogonal),
            "rounded-orthogonal" | "smoothstep" => Some(EdgeStyle::RoundedOrthogonal),
            "bezier" => Some(EdgeStyle::Bezier),
            _ => None,
        }
    }
}

/// Arrow head drawn at an edge end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    #[serde(rename = "arrowclosed")]
    ArrowClosed,
    #[serde(rename = "arrow")]
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
}

impl Marker {
    pub const CLOSED: Marker = Marker {
        kind: MarkerKind::ArrowClosed,
    };
}

/// Stroke attributes of an edge path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stroke {
    #[serde(rename = "strokeWidth")]
    pub width: f32,
    #[serde(rename = "strokeDasharray", skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 2.0,
            dash: None,
            opacity: None,
        }
    }
}

/// A directed connector between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: NodeId,
    pub source: NodeId,
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<Port>,
    pub target: NodeId,
    #[serde(rename = "targetHandle", default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<Port>,
    #[serde(rename = "type", default)]
    pub style: EdgeStyle,
    #[serde(rename = "markerEnd", default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<Marker>,
    #[serde(rename = "style", default)]
    pub stroke: Stroke,
}

impl Edge {
    /// A user edge: closed arrow head, solid 2px stroke.
    pub fn user(id: NodeId, source: NodeId, target: NodeId, style: EdgeStyle) -> Self {
        Self {
            id,
            source,
            source_port: None,
            target,
            target_port: None,
            style,
            marker_end: Some(Marker::CLOSED),
            stroke: Stroke::default(),
        }
    }

    /// The fixed dashed, arrowless connector from a primary node to its card.
    pub fn companion(primary: NodeId) -> Self {
        Self {
            id: primary.companion_edge(),
            source: primary,
            source_port: None,
            target: primary.companion_node(),
            target_port: None,
            style: EdgeStyle::Orthogonal,
            marker_end: None,
            stroke: Stroke {
                width: 1.5,
                dash: Some("4 4".into()),
                opacity: Some(0.8),
            },
        }
    }

    pub fn with_ports(mut self, source: Option<Port>, target: Option<Port>) -> Self {
        self.source_port = source;
        self.target_port = target;
        self
    }

    pub fn is_companion(&self) -> bool {
        self.id.is_companion_edge()
    }

    /// Apply a global style change: route, closed marker, 2px stroke.
    pub fn restyle(&mut self, style: EdgeStyle) {
        self.style = style;
        self.marker_end = Some(Marker::CLOSED);
        self.stroke.width = 2.0;
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

/// A detached copy of the node and edge collections, used for undo/redo.
///
/// `Node` and `Edge` own all their data, so a clone never aliases the live
/// document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

// ─── Document ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DocumentWire {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    meta: Meta,
}

impl From<DocumentWire> for Document {
    fn from(w: DocumentWire) -> Self {
        Document::new(w.nodes, w.edges, w.meta)
    }
}

/// The full node/edge/meta state of one scene.
///
/// Serializes to the persisted wire shape `{nodes, edges, meta}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DocumentWire")]
pub struct Document {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    meta: Meta,

    #[serde(skip)]
    node_index: HashMap<NodeId, usize>,
    #[serde(skip)]
    edge_index: HashMap<NodeId, usize>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges && self.meta == other.meta
    }
}

impl Document {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, meta: Meta) -> Self {
        let mut doc = Self {
            meta,
            ..Self::default()
        };
        doc.replace(nodes, edges);
        doc
    }

    pub fn from_snapshot(snapshot: Snapshot, meta: Meta) -> Self {
        Self::new(snapshot.nodes, snapshot.edges, meta)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: Meta) {
        self.meta = meta;
    }

    /// Replace the whole node collection. Later duplicates of an id are dropped.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        let (nodes, index) = dedup_by_id(nodes, |n| n.id, "node");
        self.nodes = nodes;
        self.node_index = index;
    }

    /// Replace the whole edge collection. Later duplicates of an id are dropped.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        let (edges, index) = dedup_by_id(edges, |e| e.id, "edge");
        self.edges = edges;
        self.edge_index = index;
    }

    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.set_nodes(nodes);
        self.set_edges(edges);
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.replace(snapshot.nodes, snapshot.edges);
    }

    /// Deep copy of the current node and edge collections.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: NodeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|&i| &self.edges[i])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn contains_edge(&self, id: NodeId) -> bool {
        self.edge_index.contains_key(&id)
    }

    pub fn primary_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_primary())
    }

    /// Edges drawn by the user, i.e. everything except companion connectors.
    pub fn user_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.is_companion())
    }

    pub fn user_edge_count(&self) -> usize {
        self.user_edges().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

fn dedup_by_id<T>(
    items: Vec<T>,
    id_of: impl Fn(&T) -> NodeId,
    what: &str,
) -> (Vec<T>, HashMap<NodeId, usize>) {
    let mut index = HashMap::with_capacity(items.len());
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let id = id_of(&item);
        if index.contains_key(&id) {
            log::warn!("dropping duplicate {what} id {id}");
            continue;
        }
        index.insert(id, kept.len());
        kept.push(item);
    }
    (kept, index)
}
