//! Priority-ordered backlog with FIFO tie-breaking.
//!
//! Entries are kept in run order in a `VecDeque`. Priority 0 means
//! unprioritized: such entries are appended at the tail. A prioritized entry
//! (any nonzero value, negative included) is inserted right after the last
//! prioritized entry whose priority is greater than or equal to its own, or at
//! the head when no such entry exists. Prioritized entries therefore always
//! form a prefix ahead of the unprioritized ones, and equal priorities keep
//! their insertion order, which a binary heap would not guarantee.

use std::collections::VecDeque;

/// Priority of submissions made without an explicit priority.
pub(crate) const UNPRIORITIZED: i32 = 0;

/// An entry waiting in the backlog.
#[derive(Debug)]
pub(crate) struct BacklogEntry<T> {
    pub priority: i32,
    pub item: T,
}

/// Ordered sequence of admitted-but-not-running submissions.
#[derive(Debug)]
pub(crate) struct Backlog<T> {
    entries: VecDeque<BacklogEntry<T>>,
}

impl<T> Default for Backlog<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T> Backlog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item according to its priority and return its position.
    pub fn insert(&mut self, priority: i32, item: T) -> usize {
        if priority == UNPRIORITIZED {
            self.entries.push_back(BacklogEntry { priority, item });
            return self.entries.len() - 1;
        }
        let position = self
            .entries
            .iter()
            .rposition(|entry| entry.priority != UNPRIORITIZED && entry.priority >= priority)
            .map_or(0, |i| i + 1);
        self.entries.insert(position, BacklogEntry { priority, item });
        position
    }

    /// Remove the entry that runs next.
    pub fn pop_front(&mut self) -> Option<BacklogEntry<T>> {
        self.entries.pop_front()
    }

    /// Take every entry in run order, leaving the backlog empty.
    pub fn take_all(&mut self) -> VecDeque<BacklogEntry<T>> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
