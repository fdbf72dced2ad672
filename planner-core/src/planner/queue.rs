// Search frontier ordered by (elapsed ticks, insertion sequence)
//
// Rust's BinaryHeap is a max-heap, so the ordering is reversed to pop the
// earliest state first. The key is fixed when a node is pushed; ties go to
// whichever node was pushed first, which keeps the search deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::state::EconomyState;
use crate::types::Ticks;

/// A queued search state. `goal_distance` is carried for diagnostics only.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub state: EconomyState,
    pub goal_distance: Ticks,
    pub sequence: u64,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .state
            .elapsed
            .total_cmp(&self.state.elapsed)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<SearchNode>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: EconomyState, goal_distance: Ticks) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(SearchNode {
            state,
            goal_distance,
            sequence,
        });
    }

    pub fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
