//! Undo/redo history over whole-document snapshots.
//!
//! The past stack always holds the current state on top; the entry below it
//! is what undo returns to. A single entry is the baseline and cannot be
//! undone. The past stack is bounded: pushing past `max_depth` evicts the
//! oldest snapshot. Pushing a new snapshot clears the future stack.

use pm_core::Snapshot;
use std::collections::VecDeque;

/// Default bound on the past stack.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Append-only past/future stacks of snapshots.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        let max_depth = max_depth.max(1);
        Self {
            past: VecDeque::with_capacity(max_depth),
            future: Vec::new(),
            max_depth,
        }
    }

    /// Drop everything and start over from one baseline snapshot.
    pub fn reset(&mut self, baseline: Snapshot) {
        self.past.clear();
        self.future.clear();
        self.past.push_back(baseline);
    }

    /// Record a new current state and invalidate the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.push_bounded(snapshot);
        self.future.clear();
    }

    /// Step back. Returns the snapshot to restore, or `None` at the baseline.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.past.len() <= 1 {
            return None;
        }
        let current = self.past.pop_back()?;
        self.future.push(current);
        self.past.back().cloned()
    }

    /// Step forward. Returns the snapshot to restore, or `None` if nothing was undone.
    pub fn redo(&mut self) -> Option<Snapshot> {
        let next = self.future.pop()?;
        self.push_bounded(next.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of snapshots on the past stack, current state included.
    pub fn len(&self) -> usize {
        self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// The snapshot of the current state, if any.
    pub fn current(&self) -> Option<&Snapshot> {
        self.past.back()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn push_bounded(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.max_depth {
            self.past.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::{Node, NodeId, Position, PrimaryData};

    fn snap(tag: &str) -> Snapshot {
        Snapshot {
            nodes: vec![Node::primary(
                NodeId::intern(tag),
                Position::default(),
                PrimaryData::titled(tag),
            )],
            edges: vec![],
        }
    }

    #[test]
    fn baseline_cannot_be_undone() {
        let mut h = History::default();
        h.reset(snap("base"));
        assert!(!h.can_undo());
        assert_eq!(h.undo(), None);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn undo_then_redo() {
        let mut h = History::default();
        h.reset(snap("s0"));
        h.push(snap("s1"));
        assert_eq!(h.undo(), Some(snap("s0")));
        assert!(h.can_redo());
        assert_eq!(h.redo(), Some(snap("s1")));
        assert_eq!(h.len(), 2);
        assert!(!h.can_redo());
    }

    #[test]
    fn push_clears_future() {
        let mut h = History::default();
        h.reset(snap("s0"));
        h.push(snap("s1"));
        h.undo();
        h.push(snap("s2"));
        assert!(!h.can_redo());
        assert_eq!(h.current(), Some(&snap("s2")));
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut h = History::new(3);
        h.reset(snap("s0"));
        for i in 1..=5 {
            h.push(snap(&format!("s{i}")));
        }
        assert_eq!(h.len(), 3);
        let mut undo_count = 0;
        while h.undo().is_some() {
            undo_count += 1;
        }
        assert_eq!(undo_count, 2);
        assert_eq!(h.current(), Some(&snap("s3")));
    }

    #[test]
    fn redo_on_empty_future_is_noop() {
        let mut h = History::default();
        h.reset(snap("s0"));
        assert_eq!(h.redo(), None);
        assert_eq!(h.len(), 1);
    }
}
