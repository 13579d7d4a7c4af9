//! Ranked graph layout.
//!
//! The editor treats layout as a black box behind [`LayoutEngine`]: given the
//! nodes, the edges, and a flow direction it returns new positions and never
//! touches ids or edges. [`RankedLayout`] is the built-in engine:
//!
//! 1. Collapse strongly connected components so cycles share a rank.
//! 2. Rank components by longest path from the sources.
//! 3. Order each rank by the barycenter of its predecessors.
//! 4. Stack ranks along the flow axis. On the cross axis each node sits on the
//!    barycenter of its predecessors, and crowded runs are spread apart around
//!    their mean.
//!
//! [`apply_layout`] then translates the result so an anchor node keeps its
//! position. Companion nodes and companion edges are never laid out; they
//! follow their primary node on the next reconciliation.

use crate::id::NodeId;
use crate::model::{Edge, Node, Position};
use petgraph::algo::{condensation, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Flow direction of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Left to right.
    #[default]
    LR,
    /// Top to bottom.
    TB,
}

/// A layout algorithm: positions in, positions out.
///
/// Returned positions may live in any frame; [`apply_layout`] anchors them.
pub trait LayoutEngine: Send + Sync {
    fn layout(&self, nodes: &[Node], edges: &[Edge], direction: Direction) -> HashMap<NodeId, Position>;
}

/// Longest-path ranked layout with barycenter ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedLayout {
    pub node_width: f32,
    pub node_height: f32,
    /// Gap between consecutive ranks.
    pub rank_sep: f32,
    /// Gap between neighbours within a rank.
    pub node_sep: f32,
}

impl Default for RankedLayout {
    fn default() -> Self {
        Self {
            node_width: 220.0,
            node_height: 100.0,
            rank_sep: 50.0,
            node_sep: 50.0,
        }
    }
}

impl LayoutEngine for RankedLayout {
    fn layout(&self, nodes: &[Node], edges: &[Edge], direction: Direction) -> HashMap<NodeId, Position> {
        let primaries: Vec<&Node> = nodes.iter().filter(|n| n.is_primary()).collect();
        if primaries.is_empty() {
            return HashMap::new();
        }

        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(primaries.len(), edges.len());
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(primaries.len());
        for n in &primaries {
            index.insert(n.id, graph.add_node(n.id));
        }
        for e in edges.iter().filter(|e| !e.is_companion() && e.source != e.target) {
            if let (Some(&s), Some(&t)) = (index.get(&e.source), index.get(&e.target)) {
                graph.add_edge(s, t, ());
            }
        }

        let (main_step, cross_step) = match direction {
            Direction::LR => (self.node_width + self.rank_sep, self.node_height + self.node_sep),
            Direction::TB => (self.node_height + self.rank_sep, self.node_width + self.node_sep),
        };

        let ranks = rank_nodes(&graph);
        let layers = place_layers(&graph, &index, &primaries, &ranks, cross_step);

        let mut out = HashMap::with_capacity(primaries.len());
        for (rank, layer) in layers.iter().enumerate() {
            let main = rank as f32 * main_step;
            for &(id, cross) in layer {
                let pos = match direction {
                    Direction::LR => Position::new(main, cross),
                    Direction::TB => Position::new(cross, main),
                };
                out.insert(id, pos);
            }
        }

        log::debug!("ranked layout: {} nodes in {} ranks", out.len(), layers.len());
        out
    }
}

/// Longest-path rank of every node; members of a cycle share a rank.
fn rank_nodes(graph: &DiGraph<NodeId, ()>) -> HashMap<NodeId, usize> {
    let condensed = condensation(graph.clone(), true);
    let order: Vec<NodeIndex> =
        toposort(&condensed, None).unwrap_or_else(|_| condensed.node_indices().collect());

    let mut component_rank: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
    for c in order {
        let rank = condensed
            .neighbors_directed(c, petgraph::Direction::Incoming)
            .filter_map(|p| component_rank.get(&p))
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        component_rank.insert(c, rank);
    }

    let mut ranks = HashMap::with_capacity(graph.node_count());
    for c in condensed.node_indices() {
        let rank = component_rank.get(&c).copied().unwrap_or(0);
        for id in &condensed[c] {
            ranks.insert(*id, rank);
        }
    }
    ranks
}

/// Group nodes into layers, order each layer, and give every node a cross
/// coordinate.
///
/// Nodes with placed predecessors come first, sorted by predecessor
/// barycenter, and aim for that barycenter. Free nodes follow in document
/// order, one step after their neighbour.
fn place_layers(
    graph: &DiGraph<NodeId, ()>,
    index: &HashMap<NodeId, NodeIndex>,
    primaries: &[&Node],
    ranks: &HashMap<NodeId, usize>,
    cross_step: f32,
) -> Vec<Vec<(NodeId, f32)>> {
    let depth = ranks.values().copied().max().unwrap_or(0) + 1;
    let mut layers: Vec<Vec<NodeId>> = vec![Vec::new(); depth];
    for n in primaries {
        layers[ranks.get(&n.id).copied().unwrap_or(0)].push(n.id);
    }

    let mut cross_of: HashMap<NodeId, f32> = HashMap::new();
    let mut placed = Vec::with_capacity(depth);
    for layer in layers {
        let mut keyed: Vec<(Option<f32>, usize, NodeId)> = layer
            .iter()
            .enumerate()
            .map(|(doc_order, &id)| {
                let preds: Vec<f32> = index
                    .get(&id)
                    .map(|&ix| {
                        graph
                            .neighbors_directed(ix, petgraph::Direction::Incoming)
                            .filter_map(|p| cross_of.get(&graph[p]).copied())
                            .collect()
                    })
                    .unwrap_or_default();
                let barycenter =
                    (!preds.is_empty()).then(|| preds.iter().sum::<f32>() / preds.len() as f32);
                (barycenter, doc_order, id)
            })
            .collect();
        keyed.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.total_cmp(&y).then(a.1.cmp(&b.1)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.1.cmp(&b.1),
        });

        let center = (keyed.len() as f32 - 1.0) / 2.0;
        let mut desired: Vec<f32> = Vec::with_capacity(keyed.len());
        for (slot, (barycenter, _, _)) in keyed.iter().enumerate() {
            let want = match (barycenter, desired.last()) {
                (Some(b), _) => *b,
                (None, Some(prev)) => prev + cross_step,
                (None, None) => (slot as f32 - center) * cross_step,
            };
            desired.push(want);
        }

        let layer: Vec<(NodeId, f32)> = keyed
            .iter()
            .map(|&(_, _, id)| id)
            .zip(pack(&desired, cross_step))
            .collect();
        for &(id, cross) in &layer {
            cross_of.insert(id, cross);
        }
        placed.push(layer);
    }
    placed
}

/// Spread ordered target coordinates at least `step` apart.
///
/// Runs of nodes that would overlap are merged into blocks, and each block
/// is centred on the mean of what its members wanted.
fn pack(desired: &[f32], step: f32) -> Vec<f32> {
    // (members, sum of target minus offset within the block)
    let mut blocks: Vec<(usize, f32)> = Vec::new();
    for &want in desired {
        let mut block = (1usize, want);
        while let Some(&(len, sum)) = blocks.last() {
            let prev_end = sum / len as f32 + len as f32 * step;
            if block.1 / block.0 as f32 >= prev_end {
                break;
            }
            blocks.pop();
            block = (len + block.0, sum + block.1 - (block.0 * len) as f32 * step);
        }
        blocks.push(block);
    }

    let mut out = Vec::with_capacity(desired.len());
    for (len, sum) in blocks {
        let first = sum / len as f32;
        out.extend((0..len).map(|k| first + k as f32 * step));
    }
    out
}

/// Run `engine` and write the new positions into a copy of `nodes`.
///
/// The result is translated so `anchor` (or the first primary node when
/// `None`) keeps its current position. Only primary nodes move; ids, order,
/// and companion nodes are preserved.
pub fn apply_layout(
    engine: &dyn LayoutEngine,
    nodes: &[Node],
    edges: &[Edge],
    direction: Direction,
    anchor: Option<NodeId>,
) -> Vec<Node> {
    let mut positions = engine.layout(nodes, edges, direction);

    let anchor = anchor
        .and_then(|id| nodes.iter().find(|n| n.id == id && n.is_primary()))
        .or_else(|| nodes.iter().find(|n| n.is_primary()));
    if let Some(anchor) = anchor
        && let Some(computed) = positions.get(&anchor.id).copied()
    {
        let dx = anchor.position.x - computed.x;
        let dy = anchor.position.y - computed.y;
        for pos in positions.values_mut() {
            *pos = pos.offset(dx, dy);
        }
    }

    nodes
        .iter()
        .map(|n| {
            let mut n = n.clone();
            if n.is_primary()
                && let Some(pos) = positions.get(&n.id)
            {
                n.position = *pos;
            }
            n
        })
        .collect()
}
