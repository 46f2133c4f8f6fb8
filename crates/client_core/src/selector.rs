use shared::domain::{BlockedRoadSet, Edge, NodeId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    OneNodeSelected(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    FirstNodeSelected(NodeId),
    /// Pair complete; the caller should block this edge.
    EdgeCompleted(Edge),
    SameNode(NodeId),
    AlreadyBlocked(Edge),
}

/// Two resolved clicks make one edge to block.
#[derive(Debug, Default)]
pub struct BlockedEdgeSelector {
    state: SelectionState,
}

impl BlockedEdgeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Abandons a pending selection, returning the node that was pending.
    pub fn reset(&mut self) -> Option<NodeId> {
        match std::mem::take(&mut self.state) {
            SelectionState::Idle => None,
            SelectionState::OneNodeSelected(node) => Some(node),
        }
    }

    /// Commits a resolved click. Every second click returns the machine to idle,
    /// whether or not it produced an edge.
    pub fn apply(&mut self, node: NodeId, blocked: &BlockedRoadSet) -> SelectionOutcome {
        match self.state {
            SelectionState::Idle => {
                self.state = SelectionState::OneNodeSelected(node);
                SelectionOutcome::FirstNodeSelected(node)
            }
            SelectionState::OneNodeSelected(first) => {
                self.state = SelectionState::Idle;
                let edge = Edge::new(first, node);
                if edge.is_loop() {
                    SelectionOutcome::SameNode(node)
                } else if blocked.contains(&edge) {
                    SelectionOutcome::AlreadyBlocked(edge)
                } else {
                    SelectionOutcome::EdgeCompleted(edge)
                }
            }
        }
    }
}
