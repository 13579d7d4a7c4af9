//! Edit operations on the progress map.
//!
//! Each [`Edit`] builds new node/edge collections from the current document
//! and hands them to [`SyncEngine::commit_local`]. Companion cards are never
//! created here: detail edits only change primary node data, and the next
//! settle reconciles the cards.

use crate::error::EditError;
use crate::sync::SyncEngine;
use pm_core::layout::{Direction, apply_layout};
use pm_core::{Edge, EdgeStyle, Node, NodeId, Port, Position, PrimaryData};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Ids of the nodes an edit created.
pub type Created = SmallVec<[NodeId; 4]>;

/// Horizontal distance from a fork source to its children.
const FORK_DX: f32 = 260.0;
/// Vertical distance between fork children.
const FORK_SPREAD: f32 = 120.0;
const SHORT_HORIZONTAL_OFFSET: (f32, f32) = (120.0, 10.0);
const HIERARCHY_ORIGIN: Position = Position::new(100.0, 100.0);
/// Most nodes a single generator edit may create.
pub const MAX_GENERATED_NODES: usize = 1000;

/// A library item dragged onto the canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DroppedItem {
    pub id: Option<i64>,
    pub name: String,
    pub icon_path: Option<String>,
}

/// An edit the user can make on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Edit {
    /// Draw an edge. An identical existing edge makes this a no-op.
    Connect {
        source: NodeId,
        target: NodeId,
        #[serde(default)]
        source_port: Option<Port>,
        #[serde(default)]
        target_port: Option<Port>,
    },
    /// Create a primary node from a library item at a canvas position.
    DropItem { item: DroppedItem, position: Position },
    /// Drag end.
    MoveNode { id: NodeId, position: Position },
    /// Delete nodes and every edge touching them.
    RemoveNodes { ids: Vec<NodeId> },
    /// Delete user edges. Companion edge ids are ignored.
    RemoveEdges { ids: Vec<NodeId> },
    /// Change the selection. Not recorded in history.
    Select {
        #[serde(default)]
        id: Option<NodeId>,
    },
    SetTitle { id: NodeId, title: String },
    SetIcon { id: NodeId, icon_ref: Option<String> },
    SetDetailText { id: NodeId, text: String },
    SetDetailVisible { id: NodeId, visible: bool },
    /// `0` removes the clamp.
    SetLineClamp { id: NodeId, line_clamp: u32 },
    /// Flip the global details toggle and apply it to every primary node.
    ToggleDetails,
    /// Restyle every user edge; companion edges keep their fixed style.
    SetEdgeStyle { style: EdgeStyle },
    AutoLayout { direction: Direction },
    /// Fan `children` new nodes out to the right of the selected node.
    Fork { children: usize },
    /// One unnamed node just right of the selected node, no layout.
    ShortHorizontal,
    /// A complete tree `depth` levels deep with `breadth` children per node.
    Hierarchy { depth: usize, breadth: usize },
}

impl SyncEngine {
    /// Apply one edit as a local change. Returns the ids of created nodes.
    pub fn apply(&mut self, edit: Edit) -> Result<Created, EditError> {
        let mut nodes = self.document().nodes().to_vec();
        let mut edges = self.document().edges().to_vec();
        let mut created = Created::new();

        match edit {
            Edit::Connect {
                source,
                target,
                source_port,
                target_port,
            } => {
                require_primary(&nodes, source)?;
                require_primary(&nodes, target)?;
                let id = connection_id(source, source_port, target, target_port);
                if edges.iter().any(|e| e.id == id) {
                    return Ok(created);
                }
                edges.push(
                    Edge::user(id, source, target, self.settings.edge_style)
                        .with_ports(source_port, target_port),
                );
            }
            Edit::DropItem { item, position } => {
                let id = fresh_node_id(&nodes);
                let data = PrimaryData {
                    title: item.name,
                    icon_ref: item.icon_path,
                    item_ref: item.id,
                    detail_text: None,
                    detail_visible: self.settings.details_visible,
                    line_clamp: None,
                };
                nodes.push(Node::primary(id, position, data));
                created.push(id);
            }
            Edit::MoveNode { id, position } => {
                let i = require_primary(&nodes, id)?;
                nodes[i].position = position;
            }
            Edit::RemoveNodes { ids } => {
                let before = nodes.len();
                nodes.retain(|n| !(n.is_primary() && ids.contains(&n.id)));
                if nodes.len() == before {
                    return Ok(created);
                }
                edges.retain(|e| !ids.iter().any(|id| e.touches(*id)));
                if self.selection().is_some_and(|s| ids.contains(&s)) {
                    self.select(None);
                }
            }
            Edit::RemoveEdges { ids } => {
                let before = edges.len();
                edges.retain(|e| e.is_companion() || !ids.contains(&e.id));
                if edges.len() == before {
                    return Ok(created);
                }
            }
            Edit::Select { id } => {
                self.select(id);
                return Ok(created);
            }
            Edit::SetTitle { id, title } => {
                update_primary(&mut nodes, id, |d| d.title = title)?;
            }
            Edit::SetIcon { id, icon_ref } => {
                update_primary(&mut nodes, id, |d| d.icon_ref = icon_ref)?;
            }
            Edit::SetDetailText { id, text } => {
                update_primary(&mut nodes, id, |d| d.detail_text = Some(text))?;
            }
            Edit::SetDetailVisible { id, visible } => {
                update_primary(&mut nodes, id, |d| d.detail_visible = visible)?;
            }
            Edit::SetLineClamp { id, line_clamp } => {
                update_primary(&mut nodes, id, |d| {
                    d.line_clamp = (line_clamp > 0).then_some(line_clamp);
                })?;
            }
            Edit::ToggleDetails => {
                let visible = !self.settings.details_visible;
                self.settings.details_visible = visible;
                for d in nodes.iter_mut().filter_map(Node::primary_data_mut) {
                    d.detail_visible = visible;
                }
            }
            Edit::SetEdgeStyle { style } => {
                self.settings.edge_style = style;
                for e in edges.iter_mut().filter(|e| !e.is_companion()) {
                    e.restyle(style);
                }
            }
            Edit::AutoLayout { direction } => {
                nodes = apply_layout(self.layout_engine(), &nodes, &edges, direction, None);
            }
            Edit::Fork { children } => {
                if children > MAX_GENERATED_NODES {
                    return Err(EditError::TooManyNodes {
                        limit: MAX_GENERATED_NODES,
                    });
                }
                let source = self.selection().ok_or(EditError::NoSelection)?;
                let origin = nodes[require_primary(&nodes, source)?].position;
                let base_y = origin.y - (children.saturating_sub(1)) as f32 * FORK_SPREAD / 2.0;
                for i in 0..children {
                    let id = fresh_node_id(&nodes);
                    let mut data = PrimaryData::titled(format!("Child {}", i + 1));
                    data.detail_visible = self.settings.details_visible;
                    let pos = Position::new(origin.x + FORK_DX, base_y + i as f32 * FORK_SPREAD);
                    nodes.push(Node::primary(id, pos, data));
                    edges.push(Edge::user(
                        tree_edge_id(source, id),
                        source,
                        id,
                        self.settings.edge_style,
                    ));
                    created.push(id);
                }
                nodes = apply_layout(self.layout_engine(), &nodes, &edges, Direction::LR, Some(source));
            }
            Edit::ShortHorizontal => {
                let source = self.selection().ok_or(EditError::NoSelection)?;
                let origin = nodes[require_primary(&nodes, source)?].position;
                let id = fresh_node_id(&nodes);
                let pos = origin.offset(SHORT_HORIZONTAL_OFFSET.0, SHORT_HORIZONTAL_OFFSET.1);
                nodes.push(Node::primary(id, pos, PrimaryData::default()));
                edges.push(Edge::user(
                    tree_edge_id(source, id),
                    source,
                    id,
                    EdgeStyle::Orthogonal,
                ));
                created.push(id);
            }
            Edit::Hierarchy { depth, breadth } => {
                if tree_size(depth, breadth).is_none_or(|n| n > MAX_GENERATED_NODES) {
                    return Err(EditError::TooManyNodes {
                        limit: MAX_GENERATED_NODES,
                    });
                }
                let style = self.settings.edge_style;
                let visible = self.settings.details_visible;
                let titled = |title: String| PrimaryData {
                    detail_visible: visible,
                    ..PrimaryData::titled(title)
                };

                let root = fresh_node_id(&nodes);
                nodes.push(Node::primary(root, HIERARCHY_ORIGIN, titled("Root".into())));
                created.push(root);

                let mut level = vec![root];
                for d in 1..depth.max(1) {
                    let mut next = Vec::with_capacity(level.len() * breadth);
                    for &parent in &level {
                        for _ in 0..breadth {
                            let id = fresh_node_id(&nodes);
                            nodes.push(Node::primary(id, Position::default(), titled(format!("L{d} node"))));
                            edges.push(Edge::user(tree_edge_id(parent, id), parent, id, style));
                            next.push(id);
                            created.push(id);
                        }
                    }
                    level = next;
                }
                nodes = apply_layout(self.layout_engine(), &nodes, &edges, Direction::LR, Some(root));
            }
        }

        self.commit_local(nodes, edges);
        Ok(created)
    }
}

/// Node count of a complete tree, or `None` on overflow.
fn tree_size(depth: usize, breadth: usize) -> Option<usize> {
    let mut total: usize = 1;
    let mut level: usize = 1;
    for _ in 1..depth.max(1) {
        level = level.checked_mul(breadth)?;
        total = total.checked_add(level)?;
    }
    Some(total)
}

/// Index of `id` in `nodes`, provided it is a primary node.
fn require_primary(nodes: &[Node], id: NodeId) -> Result<usize, EditError> {
    let i = nodes
        .iter()
        .position(|n| n.id == id)
        .ok_or(EditError::UnknownNode(id))?;
    if !nodes[i].is_primary() {
        return Err(EditError::NotPrimary(id));
    }
    Ok(i)
}

fn update_primary(
    nodes: &mut [Node],
    id: NodeId,
    f: impl FnOnce(&mut PrimaryData),
) -> Result<(), EditError> {
    let i = require_primary(nodes, id)?;
    if let Some(data) = nodes[i].primary_data_mut() {
        f(data);
    }
    Ok(())
}

/// A generated id not used by any node in `nodes`.
fn fresh_node_id(nodes: &[Node]) -> NodeId {
    loop {
        let id = NodeId::with_prefix("n");
        if !nodes.iter().any(|n| n.id == id) {
            return id;
        }
    }
}

fn tree_edge_id(parent: NodeId, child: NodeId) -> NodeId {
    NodeId::intern(&format!("e_{parent}_{child}"))
}

/// One id per distinct (source, port, target, port) connection.
fn connection_id(
    source: NodeId,
    source_port: Option<Port>,
    target: NodeId,
    target_port: Option<Port>,
) -> NodeId {
    let sp = source_port.map(Port::as_str).unwrap_or_default();
    let tp = target_port.map(Port::as_str).unwrap_or_default();
    NodeId::intern(&format!("e-{source}{sp}-{target}{tp}"))
}
