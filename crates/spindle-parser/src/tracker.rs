//! Nesting tracker for pair constructs.
//!
//! Keeps one stack of open groups per kind plus a flattened stack across all
//! kinds. Both are always pushed and popped together; the top of the
//! flattened stack is the innermost open group and therefore the parent for
//! the next node.

use crate::ast::{Kind, NodeId};
use std::collections::HashMap;

/// Why a close could not be matched against an open group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMismatch<K> {
    /// No group of any kind is open.
    NothingOpen,
    /// The innermost open group is of a different kind.
    Interleaved { innermost: K },
}

#[derive(Debug, Clone)]
pub struct NestingTracker<K> {
    by_kind: HashMap<K, Vec<NodeId>>,
    open: Vec<(K, NodeId)>,
}

impl<K: Kind> Default for NestingTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kind> NestingTracker<K> {
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            open: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: K, group: NodeId) {
        self.by_kind.entry(kind).or_default().push(group);
        self.open.push((kind, group));
    }

    /// Pop the innermost group if it is of `kind`.
    ///
    /// Nothing is mutated when the check fails.
    pub fn pop(&mut self, kind: K) -> Result<NodeId, CloseMismatch<K>> {
        match self.open.last().copied() {
            None => Err(CloseMismatch::NothingOpen),
            Some((innermost, _)) if innermost != kind => {
                Err(CloseMismatch::Interleaved { innermost })
            }
            Some((_, group)) => {
                self.open.pop();
                if let Some(stack) = self.by_kind.get_mut(&kind) {
                    stack.pop();
                }
                Ok(group)
            }
        }
    }

    /// The innermost open group of any kind.
    pub fn current(&self) -> Option<NodeId> {
        self.open.last().map(|(_, id)| *id)
    }

    /// The innermost open group of `kind`.
    pub fn current_of(&self, kind: K) -> Option<NodeId> {
        self.by_kind.get(&kind).and_then(|stack| stack.last().copied())
    }

    pub fn is_inside(&self, kind: K) -> bool {
        self.depth_of(kind) > 0
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn depth_of(&self, kind: K) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// The innermost open group together with its kind.
    pub fn innermost(&self) -> Option<(K, NodeId)> {
        self.open.last().copied()
    }

    pub fn clear(&mut self) {
        self.by_kind.clear();
        self.open.clear();
    }
}
