//! Bounded note buffer backing the staff.

use super::NotationEvent;
use std::collections::VecDeque;

/// Maximum number of notes kept on the staff.
pub const NOTE_BUFFER_CAPACITY: usize = 16;

/// Insertion-ordered notes shown on the staff, oldest first.
///
/// Holds at most [`NOTE_BUFFER_CAPACITY`] events. Both `append` and
/// `replace_all` evict from the front, so the buffer always shows the most
/// recent notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteBuffer {
    events: VecDeque<NotationEvent>,
}

impl NoteBuffer {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(NOTE_BUFFER_CAPACITY + 1),
        }
    }

    /// Adds an event at the end, dropping the oldest one when full.
    pub fn append(&mut self, event: NotationEvent) {
        self.events.push_back(event);
        if self.events.len() > NOTE_BUFFER_CAPACITY {
            self.events.pop_front();
        }
    }

    /// Replaces the contents with a new sequence. Sequences longer than the
    /// capacity keep only their last events.
    pub fn replace_all<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = NotationEvent>,
    {
        self.events.clear();
        for event in events {
            self.append(event);
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        NOTE_BUFFER_CAPACITY
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotationEvent> {
        self.events.iter()
    }

    /// Returns the events in staff order.
    pub fn to_vec(&self) -> Vec<NotationEvent> {
        self.events.iter().copied().collect()
    }
}
