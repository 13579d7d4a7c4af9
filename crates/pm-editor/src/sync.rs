//! Change propagation: keeps the live document, its companion cards, the
//! undo history, and the owner's copy mutually consistent.
//!
//! Every write to the document is a whole-collection replacement that leaves
//! the engine with an unsettled update. The host calls [`SyncEngine::settle`]
//! once the update batch has been committed (for a browser host: after the
//! framework has rendered it). Settling is an explicit state machine:
//!
//! - **Idle**: the update is a local edit. Reconcile companions; if that
//!   corrected anything, write the correction and stay unsettled so the next
//!   settle sees the reconciled document. Otherwise notify the owner and push
//!   a snapshot onto the history.
//! - **ApplyingExternal**: the update came from the owner (a remote load).
//!   It is already reconciled and already the history baseline, so it
//!   settles silently.
//! - **Restoring**: the update is an undo/redo. Notify the owner but do not
//!   push to history.
//!
//! Edits made while an external update is still unsettled are folded into
//! the same batch and committed as a local edit when it settles.

use crate::history::{DEFAULT_HISTORY_DEPTH, History};
use pm_core::layout::{LayoutEngine, RankedLayout};
use pm_core::{Document, Edge, EdgeStyle, Node, NodeId, Snapshot, reconcile};

/// Upper bound on settle passes in [`SyncEngine::settle_all`]; reconciliation
/// is idempotent so two passes always suffice.
const MAX_SETTLE_PASSES: usize = 8;

/// User-facing editor toggles that seed new nodes and edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    /// Style for newly drawn edges and for global restyling.
    pub edge_style: EdgeStyle,
    /// Whether new nodes start with their detail card shown.
    pub details_visible: bool,
    pub history_depth: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            edge_style: EdgeStyle::Orthogonal,
            details_visible: true,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// Where the pending update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ApplyingExternal,
    Restoring,
}

/// What one settle pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Nothing was pending.
    Quiet,
    /// Companion reconciliation rewrote the document; another settle is pending.
    Corrected,
    /// An external update settled without touching history or the owner.
    Suppressed,
    /// A local edit was recorded in history; the owner should adopt this document.
    Committed(Document),
    /// An undo/redo settled; the owner should adopt this document.
    Restored(Document),
}

impl Settled {
    /// The canonical document the owner should be notified of, if any.
    pub fn notification(&self) -> Option<&Document> {
        match self {
            Settled::Committed(doc) | Settled::Restored(doc) => Some(doc),
            _ => None,
        }
    }
}

/// One canvas worth of editing state: document, history, settings, selection.
pub struct SyncEngine {
    doc: Document,
    history: History,
    phase: Phase,
    /// An update has been written and not yet settled.
    pending: bool,
    /// A local edit is part of the pending batch.
    local_pending: bool,
    selection: Option<NodeId>,
    layout: Box<dyn LayoutEngine>,

    pub settings: EditorSettings,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl SyncEngine {
    /// An engine over an empty document, with the empty document as baseline.
    pub fn new(settings: EditorSettings) -> Self {
        let mut history = History::new(settings.history_depth);
        history.reset(Snapshot::default());
        Self {
            doc: Document::default(),
            history,
            phase: Phase::Idle,
            pending: false,
            local_pending: false,
            selection: None,
            layout: Box::new(RankedLayout::default()),
            settings,
        }
    }

    /// Replace the layout algorithm used by auto-layout and generators.
    pub fn with_layout(mut self, layout: Box<dyn LayoutEngine>) -> Self {
        self.layout = layout;
        self
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_settled(&self) -> bool {
        !self.pending
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn layout_engine(&self) -> &dyn LayoutEngine {
        self.layout.as_ref()
    }

    // ─── Owner → engine ──────────────────────────────────────────────────

    /// Apply a document that came from outside (a remote load).
    ///
    /// The document is reconciled up front, becomes the single history
    /// baseline, and clears the redo stack. Any unsettled local edit is
    /// discarded. The resulting update settles without notifying the owner.
    pub fn load(&mut self, incoming: Document) {
        let reconciled = reconcile(incoming.nodes(), incoming.edges());
        if reconciled.changed {
            log::trace!("load: reconciled companions of incoming document");
        }
        let doc = Document::new(reconciled.nodes, reconciled.edges, incoming.meta().clone());
        self.history.reset(doc.snapshot());
        self.doc = doc;
        self.phase = Phase::ApplyingExternal;
        self.pending = true;
        self.local_pending = false;
        self.drop_stale_selection();
        log::debug!(
            "load: {} nodes, {} edges; history reset",
            self.doc.nodes().len(),
            self.doc.edges().len()
        );
    }

    /// Accept a document pushed back by the owner.
    ///
    /// If it equals the current document this is the echo of our own
    /// notification and is ignored (returns `false`); otherwise it is applied
    /// as an external load.
    pub fn accept_from_owner(&mut self, incoming: Document) -> bool {
        if !self.pending && incoming == self.doc {
            return false;
        }
        self.load(incoming);
        true
    }

    // ─── Local edits ─────────────────────────────────────────────────────

    /// Write new collections as a local edit. Settles on the next [`settle`](Self::settle).
    pub fn commit_local(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.doc.replace(nodes, edges);
        self.pending = true;
        self.local_pending = true;
    }

    pub fn select(&mut self, id: Option<NodeId>) {
        self.selection = id.filter(|id| self.doc.node(*id).is_some_and(|n| n.selectable));
    }

    fn drop_stale_selection(&mut self) {
        if let Some(sel) = self.selection
            && !self.doc.contains_node(sel)
        {
            self.selection = None;
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Step back one snapshot. Returns `false` at the baseline.
    pub fn undo(&mut self) -> bool {
        self.settle_all();
        let Some(previous) = self.history.undo() else {
            return false;
        };
        log::debug!("undo: {} entries left", self.history.len());
        self.restore(previous);
        true
    }

    /// Step forward one snapshot. Returns `false` if nothing was undone.
    pub fn redo(&mut self) -> bool {
        self.settle_all();
        let Some(next) = self.history.redo() else {
            return false;
        };
        log::debug!("redo: {} entries", self.history.len());
        self.restore(next);
        true
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc.restore(snapshot);
        self.phase = Phase::Restoring;
        self.pending = true;
        self.local_pending = false;
        self.drop_stale_selection();
    }

    // ─── Settling ────────────────────────────────────────────────────────

    /// Process the pending update batch, if any.
    pub fn settle(&mut self) -> Settled {
        if !self.pending {
            return Settled::Quiet;
        }
        self.pending = false;

        if self.phase == Phase::ApplyingExternal {
            self.phase = Phase::Idle;
            if !self.local_pending {
                log::trace!("settle: external update applied");
                return Settled::Suppressed;
            }
        }

        let reconciled = reconcile(self.doc.nodes(), self.doc.edges());
        if reconciled.changed {
            log::trace!("settle: companion correction");
            self.doc.replace(reconciled.nodes, reconciled.edges);
            self.pending = true;
            return Settled::Corrected;
        }

        match self.phase {
            Phase::Restoring => {
                self.phase = Phase::Idle;
                Settled::Restored(self.doc.clone())
            }
            Phase::Idle | Phase::ApplyingExternal => {
                self.local_pending = false;
                self.history.push(self.doc.snapshot());
                log::debug!("commit: history {} / {}", self.history.len(), self.history.max_depth());
                Settled::Committed(self.doc.clone())
            }
        }
    }

    /// Settle until quiet. Returns the last owner notification, if any.
    pub fn settle_all(&mut self) -> Option<Document> {
        let mut notified = None;
        for _ in 0..MAX_SETTLE_PASSES {
            match self.settle() {
                Settled::Quiet => break,
                Settled::Committed(doc) | Settled::Restored(doc) => notified = Some(doc),
                Settled::Corrected | Settled::Suppressed => {}
            }
        }
        notified
    }
}
