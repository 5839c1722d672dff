use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::{Heap, ObjectId, Slot, Symbol};

/// The result of a slot lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// Name was not found anywhere in the chain.
    None,
    /// Name was found.
    Found {
        /// The object that holds the slot directly (may differ from the
        /// receiver if the slot was found via a parent link).
        holder: ObjectId,
        slot: Slot,
    },
}

impl LookupResult {
    #[inline]
    pub fn value(self) -> Option<ObjectId> {
        match self {
            Self::Found { slot, .. } => Some(slot.value),
            Self::None => None,
        }
    }

    #[inline]
    pub fn holder(self) -> Option<ObjectId> {
        match self {
            Self::Found { holder, .. } => Some(holder),
            Self::None => None,
        }
    }

    #[inline]
    pub fn is_found(self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Walks `start`, its parent, its parent's parent, ... and stops before the
/// first object it has already yielded.
///
/// The root object is its own parent, so every chain ends there; longer
/// cycles built through reflective `parent` writes end the same way.
///
/// Visited objects are kept inline, so walking an ordinary chain does not
/// allocate.
pub struct Hierarchy<'a> {
    heap: &'a Heap,
    next: Option<ObjectId>,
    visited: SmallVec<[ObjectId; 8]>,
}

impl Iterator for Hierarchy<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        let current = self.next.take()?;
        if self.visited.contains(&current) {
            return None;
        }
        self.visited.push(current);
        self.next = self
            .heap
            .get(current)
            .map(|object| object.parent)
            .filter(|&parent| parent != current);
        Some(current)
    }
}

pub fn hierarchy(heap: &Heap, start: ObjectId) -> Hierarchy<'_> {
    Hierarchy {
        heap,
        next: heap.contains(start).then_some(start),
        visited: SmallVec::new(),
    }
}

/// Resolve `name` along the parent chain of `receiver`.
pub fn lookup(heap: &Heap, receiver: ObjectId, name: Symbol) -> LookupResult {
    for holder in hierarchy(heap, receiver) {
        if let Some(slot) = heap[holder].slot(name) {
            return LookupResult::Found { holder, slot };
        }
    }
    LookupResult::None
}

/// Resolve `name` along the parent chain of `receiver.meta`.
pub fn lookup_meta(
    heap: &Heap,
    receiver: ObjectId,
    name: Symbol,
) -> LookupResult {
    match heap.get(receiver) {
        Some(object) => lookup(heap, object.meta, name),
        None => LookupResult::None,
    }
}

/// The first object in the hierarchy of `receiver` holding `name` directly.
#[inline]
pub fn origin(
    heap: &Heap,
    receiver: ObjectId,
    name: Symbol,
) -> Option<ObjectId> {
    lookup(heap, receiver, name).holder()
}

/// Every slot name reachable from `receiver`.
pub fn keys(heap: &Heap, receiver: ObjectId) -> BTreeSet<Symbol> {
    hierarchy(heap, receiver)
        .flat_map(|id| heap[id].slots().map(|(name, _)| name))
        .collect()
}
