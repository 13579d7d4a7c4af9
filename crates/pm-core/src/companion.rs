//! Companion reconciliation: derive detail cards from primary node state.
//!
//! Every primary node whose detail text is visible and non-blank owns exactly
//! one companion node (`d-<id>`) pinned at a fixed offset from it, and one
//! dashed companion edge (`dedge-<id>`) pointing at that card. Every other
//! primary node owns neither. Companions of deleted primaries are dropped.
//!
//! [`reconcile`] is pure and idempotent: feeding its output back in reports
//! `changed == false` and returns the collections untouched. Existing cards
//! are only rewritten when their text, position, or line clamp actually
//! differ, so an already-reconciled document never churns.

use crate::id::NodeId;
use crate::model::{CompanionData, Edge, Node, NodeKind, Position};
use std::collections::{HashMap, HashSet};

/// Offset of a companion card relative to its primary node.
pub const COMPANION_OFFSET: (f32, f32) = (150.0, 10.0);

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// True iff any companion node or edge was created, updated, or removed.
    pub changed: bool,
}

/// The companion node a primary node should currently have, if any.
pub fn desired_companion(primary: &Node) -> Option<Node> {
    let data = primary.primary_data()?;
    let text = data.companion_text()?;
    Some(Node::companion(
        primary.id.companion_node(),
        companion_position(primary.position),
        CompanionData {
            text: text.to_string(),
            line_clamp: data.line_clamp,
        },
    ))
}

pub fn companion_position(primary: Position) -> Position {
    primary.offset(COMPANION_OFFSET.0, COMPANION_OFFSET.1)
}

/// Recompute companion nodes and edges from primary node state.
pub fn reconcile(nodes: &[Node], edges: &[Edge]) -> Reconciled {
    let mut out_nodes: Vec<Node> = nodes.to_vec();
    let position_of: HashMap<NodeId, usize> = out_nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();

    let mut changed = false;
    let mut live_owners: Vec<NodeId> = Vec::new();
    let mut wanted: HashSet<NodeId> = HashSet::new();
    let mut created: Vec<Node> = Vec::new();

    for primary in nodes.iter().filter(|n| n.is_primary()) {
        let card_id = primary.id.companion_node();
        let occupant = position_of.get(&card_id).copied();
        if let Some(i) = occupant
            && !out_nodes[i].is_companion()
        {
            // A user node already owns the card id; leave it alone.
            if primary.primary_data().and_then(|d| d.companion_text()).is_some() {
                log::warn!("companion for {} skipped: {card_id} is a primary node", primary.id);
            }
            continue;
        }
        match desired_companion(primary) {
            Some(desired) => {
                wanted.insert(card_id);
                live_owners.push(primary.id);
                match occupant {
                    Some(i) => {
                        if out_nodes[i] != desired {
                            log::trace!("companion {card_id} updated");
                            out_nodes[i] = desired;
                            changed = true;
                        }
                    }
                    None => {
                        log::trace!("companion {card_id} created");
                        created.push(desired);
                        changed = true;
                    }
                }
            }
            None => {
                if occupant.is_some() {
                    log::trace!("companion {card_id} removed");
                    changed = true;
                }
            }
        }
    }

    // Drop every companion card that no primary node currently wants,
    // including cards whose primary node was deleted.
    let before = out_nodes.len();
    out_nodes.retain(|n| !matches!(n.kind, NodeKind::Companion(_)) || wanted.contains(&n.id));
    if out_nodes.len() != before {
        changed = true;
    }
    out_nodes.extend(created);

    // Companion edges are always regenerated from scratch.
    let mut out_edges: Vec<Edge> = edges.iter().filter(|e| !e.is_companion()).cloned().collect();
    let desired_edges: Vec<Edge> = live_owners.iter().map(|&id| Edge::companion(id)).collect();
    if !same_companion_edges(edges, &desired_edges) {
        changed = true;
    }

    if !changed {
        return Reconciled {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
            changed,
        };
    }

    out_edges.extend(desired_edges);
    Reconciled {
        nodes: out_nodes,
        edges: out_edges,
        changed,
    }
}

/// Whether the companion edges in `current` are exactly `desired`, ignoring order.
fn same_companion_edges(current: &[Edge], desired: &[Edge]) -> bool {
    let existing: Vec<&Edge> = current.iter().filter(|e| e.is_companion()).collect();
    existing.len() == desired.len()
        && desired
            .iter()
            .all(|d| existing.iter().any(|e| e.id == d.id && *e == d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeStyle, PrimaryData};
    use pretty_assertions::assert_eq;

    fn node_with_detail(id: &str, text: &str, visible: bool) -> Node {
        let mut data = PrimaryData::titled(id);
        data.detail_text = Some(text.into());
        data.detail_visible = visible;
        Node::primary(NodeId::intern(id), Position::new(100.0, 100.0), data)
    }

    #[test]
    fn creates_card_and_edge() {
        let nodes = vec![node_with_detail("A", "hello", true)];
        let r = reconcile(&nodes, &[]);
        assert!(r.changed);
        assert_eq!(r.nodes.len(), 2);
        let card = &r.nodes[1];
        assert_eq!(card.id.as_str(), "d-A");
        assert_eq!(card.position, Position::new(250.0, 110.0));
        assert!(!card.draggable && !card.selectable);
        assert_eq!(r.edges.len(), 1);
        assert_eq!(r.edges[0].id.as_str(), "dedge-A");
        assert_eq!(r.edges[0].target.as_str(), "d-A");
        assert_eq!(r.edges[0].marker_end, None);
    }

    #[test]
    fn second_pass_is_quiet() {
        let nodes = vec![
            node_with_detail("A", "hello", true),
            node_with_detail("B", "", true),
        ];
        let first = reconcile(&nodes, &[]);
        let second = reconcile(&first.nodes, &first.edges);
        assert!(!second.changed);
        assert_eq!(second.nodes, first.nodes);
        assert_eq!(second.edges, first.edges);
    }

    #[test]
    fn user_edge_after_companion_edge_is_not_churn() {
        let first = reconcile(&[node_with_detail("A", "hello", true)], &[]);
        let mut edges = first.edges.clone();
        edges.push(Edge::user(
            NodeId::intern("e-late"),
            NodeId::intern("A"),
            NodeId::intern("A"),
            EdgeStyle::Straight,
        ));
        let r = reconcile(&first.nodes, &edges);
        assert!(!r.changed);
        assert_eq!(r.edges, edges);
    }

    #[test]
    fn moved_primary_drags_card_along() {
        let first = reconcile(&[node_with_detail("A", "hello", true)], &[]);
        let mut nodes = first.nodes.clone();
        nodes[0].position = Position::new(0.0, 0.0);
        let r = reconcile(&nodes, &first.edges);
        assert!(r.changed);
        assert_eq!(r.nodes[1].position, Position::new(150.0, 10.0));
        assert_eq!(r.nodes.len(), 2);
    }

    #[test]
    fn hidden_detail_removes_card_and_edge() {
        let first = reconcile(&[node_with_detail("A", "hello", true)], &[]);
        let mut nodes = first.nodes.clone();
        nodes[0].primary_data_mut().unwrap().detail_visible = false;
        let r = reconcile(&nodes, &first.edges);
        assert!(r.changed);
        assert_eq!(r.nodes.len(), 1);
        assert!(r.edges.is_empty());
    }

    #[test]
    fn orphaned_card_is_dropped() {
        let first = reconcile(&[node_with_detail("A", "hello", true)], &[]);
        let orphan_only: Vec<Node> = first.nodes.iter().filter(|n| n.is_companion()).cloned().collect();
        let r = reconcile(&orphan_only, &first.edges);
        assert!(r.changed);
        assert!(r.nodes.is_empty());
        assert!(r.edges.is_empty());
    }

    #[test]
    fn line_clamp_follows_primary() {
        let mut n = node_with_detail("A", "a\nb\nc", true);
        n.primary_data_mut().unwrap().line_clamp = Some(2);
        let r = reconcile(&[n], &[]);
        assert_eq!(r.nodes[1].companion_data().unwrap().line_clamp, Some(2));
    }

    #[test]
    fn card_text_is_trimmed() {
        let r = reconcile(&[node_with_detail("A", "  spaced  ", true)], &[]);
        assert_eq!(r.nodes[1].companion_data().unwrap().text, "spaced");
    }

    #[test]
    fn primary_named_like_a_card_is_never_replaced() {
        let mut squatter = node_with_detail("d-A", "mine", false);
        squatter.position = Position::new(5.0, 5.0);
        let nodes = vec![node_with_detail("A", "hi", true), squatter.clone()];
        let r = reconcile(&nodes, &[]);
        assert!(!r.changed);
        assert_eq!(r.nodes, nodes);
        assert!(r.edges.is_empty());

        let again = reconcile(&r.nodes, &r.edges);
        assert!(!again.changed);
        assert_eq!(again.nodes[1], squatter);
    }
}
