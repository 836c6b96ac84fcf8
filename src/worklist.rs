//! Pending record types plus the ledger of types already emitted.
//!
//! Types may be enqueued any number of times. Deduplication happens when a type is
//! taken off the queue: only the first dequeue of a type hands it out for emission.
//! That is what lets self-referential and mutually referential records terminate.
use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::shape::TypeShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeState {
    Unseen,
    Enqueued,
    Emitted,
}

#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<TypeShape>,
    seen: IndexSet<TypeShape>,
    emitted: IndexSet<TypeShape>,
    dropped: usize,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, ty: TypeShape) {
        let ty = ty.binding_identity();
        self.seen.insert(ty.clone());
        self.queue.push_back(ty);
    }

    /// Next type that has not been emitted yet, marking it emitted.
    pub fn next_pending(&mut self) -> Option<TypeShape> {
        while let Some(ty) = self.queue.pop_front() {
            if self.emitted.insert(ty.clone()) {
                return Some(ty);
            }
            self.dropped += 1;
            tracing::trace!(%ty, "already emitted, dropping");
        }
        None
    }

    pub fn state(&self, ty: &TypeShape) -> TypeState {
        let ty = ty.binding_identity();
        if self.emitted.contains(&ty) {
            TypeState::Emitted
        } else if self.seen.contains(&ty) {
            TypeState::Enqueued
        } else {
            TypeState::Unseen
        }
    }

    /// Emitted types in first-discovered order.
    pub fn emitted(&self) -> impl Iterator<Item = &TypeShape> {
        self.emitted.iter()
    }

    /// Dequeues discarded because the type was already emitted.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn shape(src: &str) -> TypeShape {
        TypeShape::parse(src).unwrap()
    }

    #[test]
    fn first_dequeue_wins() {
        let mut worklist = Worklist::new();
        worklist.enqueue(shape("A"));
        worklist.enqueue(shape("B"));
        worklist.enqueue(shape("A"));

        assert_eq!(worklist.next_pending(), Some(shape("A")));
        assert_eq!(worklist.next_pending(), Some(shape("B")));
        assert_eq!(worklist.next_pending(), None);
        assert_eq!(worklist.dropped(), 1);
        assert!(worklist.is_empty());
    }

    #[test]
    fn wrapped_spellings_share_one_entry() {
        let mut worklist = Worklist::new();
        worklist.enqueue(shape("Node"));
        worklist.enqueue(shape("Option<Box<Node>>"));

        assert_eq!(worklist.next_pending(), Some(shape("Node")));
        assert_eq!(worklist.next_pending(), None);
    }

    #[test]
    fn states_move_forward_only() {
        let mut worklist = Worklist::new();
        let a = shape("A");
        assert_eq!(worklist.state(&a), TypeState::Unseen);

        worklist.enqueue(a.clone());
        assert_eq!(worklist.state(&a), TypeState::Enqueued);

        worklist.next_pending();
        assert_eq!(worklist.state(&a), TypeState::Emitted);

        // re-enqueueing an emitted type (a cycle edge) does not reopen it
        worklist.enqueue(a.clone());
        assert_eq!(worklist.state(&a), TypeState::Emitted);
        assert_eq!(worklist.next_pending(), None);
    }

    #[test]
    fn cycle_terminates() {
        let mut worklist = Worklist::new();
        worklist.enqueue(shape("A"));
        let mut emitted = Vec::new();
        while let Some(ty) = worklist.next_pending() {
            // A -> B, B -> A
            let next = if ty == shape("A") { shape("B") } else { shape("A") };
            worklist.enqueue(next);
            emitted.push(ty);
        }
        assert_eq!(emitted, vec![shape("A"), shape("B")]);
        assert_eq!(worklist.emitted().count(), 2);
    }
}
