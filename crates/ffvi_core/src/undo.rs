use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::StateGraph;

pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UndoError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

/// A fully independent deep copy of the state graph at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub graph: StateGraph,
}

/// Bounded undo/redo history of whole-graph snapshots.
///
/// `push` records the pre-mutation state. `undo` parks the live graph at
/// the cursor so `redo` can bring it back; a restored graph always
/// replaces the live one wholesale.
#[derive(Debug)]
pub struct UndoStack {
    entries: Vec<Snapshot>,
    cursor: usize,
    capacity: usize,
    next_sequence: u64,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
            next_sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    fn snapshot(&mut self, graph: &StateGraph) -> Snapshot {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Snapshot {
            sequence,
            captured_at: Utc::now(),
            graph: graph.clone(),
        }
    }

    /// Record the state that exists before a mutation-bearing operation.
    /// Any redo history beyond the cursor is discarded; the oldest entry
    /// is evicted once the stack is full.
    pub fn push(&mut self, graph: &StateGraph) {
        self.entries.truncate(self.cursor);
        let snapshot = self.snapshot(graph);
        self.entries.push(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    /// Step back one snapshot. `live` is the graph currently being
    /// edited; it is kept so `redo` can restore it.
    pub fn undo(&mut self, live: &StateGraph) -> Result<StateGraph, UndoError> {
        if !self.can_undo() {
            return Err(UndoError::NothingToUndo);
        }

        if self.cursor == self.entries.len() {
            let parked = self.snapshot(live);
            self.entries.push(parked);
        } else {
            self.entries[self.cursor] = self.snapshot(live);
        }

        self.cursor -= 1;
        Ok(self.entries[self.cursor].graph.clone())
    }

    pub fn redo(&mut self) -> Result<StateGraph, UndoError> {
        if !self.can_redo() {
            return Err(UndoError::NothingToRedo);
        }
        self.cursor += 1;
        Ok(self.entries[self.cursor].graph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_gold(gold: u32) -> StateGraph {
        StateGraph {
            gold,
            ..StateGraph::default()
        }
    }

    #[test]
    fn empty_stack_has_no_history() {
        let mut stack = UndoStack::default();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.undo(&StateGraph::default()), Err(UndoError::NothingToUndo));
        assert_eq!(stack.redo(), Err(UndoError::NothingToRedo));
    }

    #[test]
    fn undo_then_redo_restores_the_pre_undo_graph() {
        let mut stack = UndoStack::default();
        let before = graph_with_gold(100);
        stack.push(&before);
        let live = graph_with_gold(999);

        let undone = stack.undo(&live).unwrap();
        assert_eq!(undone.gold, 100);

        let redone = stack.redo().unwrap();
        assert_eq!(redone, live);
    }

    #[test]
    fn push_truncates_redo_history() {
        let mut stack = UndoStack::default();
        stack.push(&graph_with_gold(1));
        let live = graph_with_gold(2);
        let _ = stack.undo(&live).unwrap();
        assert!(stack.can_redo());

        stack.push(&graph_with_gold(3));
        assert!(!stack.can_redo());
        assert_eq!(stack.redo(), Err(UndoError::NothingToRedo));
    }

    #[test]
    fn capacity_evicts_oldest_snapshots() {
        let capacity = 4;
        let extra = 3;
        let mut stack = UndoStack::new(capacity);
        for gold in 0..(capacity + extra) as u32 {
            stack.push(&graph_with_gold(gold));
        }
        assert_eq!(stack.len(), capacity);

        // Walk all the way back: only `capacity` states remain, the
        // oldest `extra` pushes are gone.
        let mut live = graph_with_gold(99);
        let mut reachable = Vec::new();
        loop {
            match stack.undo(&live) {
                Ok(graph) => {
                    reachable.push(graph.gold);
                    live = graph_with_gold(reachable.last().copied().unwrap());
                }
                Err(UndoError::NothingToUndo) => break,
                Err(UndoError::NothingToRedo) => unreachable!(),
            }
        }
        assert_eq!(reachable, vec![6, 5, 4, 3]);
    }

    #[test]
    fn sequences_are_monotonic() {
        let mut stack = UndoStack::default();
        stack.push(&graph_with_gold(1));
        stack.push(&graph_with_gold(2));
        assert!(stack.entries[0].sequence < stack.entries[1].sequence);
    }

    #[test]
    fn snapshots_are_independent_deep_copies() {
        let mut stack = UndoStack::default();
        let mut graph = StateGraph::default();
        stack.push(&graph);

        // Mutating the live graph must not leak into the snapshot.
        graph.character_mut(0).unwrap().level = 77;
        let restored = stack.undo(&graph).unwrap();
        assert_eq!(restored.character(0).unwrap().level, 1);
    }
}
