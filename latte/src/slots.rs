use bitflags::bitflags;

use crate::ObjectId;

bitflags! {
    /// Per-slot protection.
    ///
    /// none   00
    /// assign 01
    /// delete 10
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Protection: u8 {
        /// the slot may not be reassigned
        const ASSIGN = 1 << 0;
        /// the slot may not be removed
        const DELETE = 1 << 1;
    }
}

/// The value half of a slot table entry.
///
/// `Slot::default()` (no object, no protection) is the tombstone written
/// when a slot is removed; a live slot always refers to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot {
    pub value: ObjectId,
    pub protection: Protection,
}

impl Slot {
    #[inline]
    pub fn new(value: ObjectId) -> Self {
        Self {
            value,
            protection: Protection::empty(),
        }
    }

    #[inline]
    pub fn with_protection(value: ObjectId, protection: Protection) -> Self {
        Self { value, protection }
    }

    /// `true` iff every bit of `protection` is set. The empty set is
    /// trivially held.
    #[inline]
    pub fn is_protected(&self, protection: Protection) -> bool {
        self.protection.contains(protection)
    }
}
