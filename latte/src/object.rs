use std::collections::BTreeSet;
use std::fmt;

use crate::{Primitive, PropertyMap, Protection, Slot, Symbol};

/// Handle to an object in the [`Heap`](crate::Heap).
///
/// Equality is identity. `ObjectId::NONE` is the empty reference and never
/// names a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const NONE: Self = Self(0);

    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    #[inline]
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "#<object {index}>"),
            None => f.write_str("#<none>"),
        }
    }
}

/// A prototype object: two lookup links, a slot table and an optional
/// primitive payload.
#[derive(Debug, Clone)]
pub struct Object {
    /// ordinary inheritance
    pub parent: ObjectId,
    /// reflective lookups
    pub meta: ObjectId,
    slots: PropertyMap<Symbol, Slot>,
    primitive: Primitive,
}

impl Object {
    pub fn new(parent: ObjectId, meta: ObjectId, buckets: usize) -> Self {
        Self {
            parent,
            meta,
            slots: PropertyMap::with_buckets(buckets),
            primitive: Primitive::Empty,
        }
    }

    /// The object directly stored under `name`, ignoring parents.
    #[inline]
    pub fn get(&self, name: Symbol) -> Option<ObjectId> {
        self.slots.get(&name).map(|slot| slot.value)
    }

    #[inline]
    pub fn slot(&self, name: Symbol) -> Option<Slot> {
        self.slots.get(&name).copied()
    }

    #[inline]
    pub fn has_slot(&self, name: Symbol) -> bool {
        self.slots.contains_key(&name)
    }

    /// Store `value` under `name`. An existing slot keeps its protection.
    pub fn put(&mut self, name: Symbol, value: ObjectId) {
        debug_assert!(!value.is_none(), "slots must refer to an object");
        let protection = self
            .slots
            .get(&name)
            .map(|slot| slot.protection)
            .unwrap_or_default();
        self.slots.put(name, Slot::with_protection(value, protection));
    }

    /// Remove the slot stored directly under `name`.
    #[inline]
    pub fn remove(&mut self, name: Symbol) -> bool {
        self.slots.remove(&name)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Entry slots reserved by the slot table, live or not.
    pub fn slot_capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Direct slots in storage order.
    pub fn slots(&self) -> impl Iterator<Item = (Symbol, Slot)> + '_ {
        self.slots.iter().map(|(name, slot)| (*name, *slot))
    }

    pub fn direct_keys(&self) -> BTreeSet<Symbol> {
        self.slots.keys().copied().collect()
    }

    pub fn is_protected(&self, name: Symbol, protection: Protection) -> bool {
        self.slot(name)
            .map(|slot| slot.protection)
            .unwrap_or_default()
            .contains(protection)
    }

    pub fn has_any_protection(&self, name: Symbol) -> bool {
        self.slot(name).is_some_and(|slot| !slot.protection.is_empty())
    }

    /// Add `protection` to an existing direct slot. `false` if there is no
    /// such slot.
    pub fn add_protection(
        &mut self,
        name: Symbol,
        protection: Protection,
    ) -> bool {
        let Some(mut slot) = self.slot(name) else {
            return false;
        };
        slot.protection |= protection;
        self.slots.put(name, slot);
        true
    }

    #[inline]
    pub fn prim(&self) -> &Primitive {
        &self.primitive
    }

    /// Replace the payload, returning the previous one.
    #[inline]
    pub fn set_prim(&mut self, primitive: Primitive) -> Primitive {
        std::mem::replace(&mut self.primitive, primitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Number, SymbolTable};

    fn object() -> Object {
        Object::new(ObjectId::from_index(0), ObjectId::from_index(0), 7)
    }

    #[test]
    fn accessing_slots() {
        let names = SymbolTable::new();
        let foobar = names.intern("foobar");
        let nobody = names.intern("nobody");
        let inner = ObjectId::from_index(3);

        let mut obj = object();
        obj.put(foobar, inner);
        assert_eq!(obj.get(foobar), Some(inner));
        assert_eq!(obj.get(nobody), None);
        assert_eq!(obj.direct_keys(), BTreeSet::from([foobar]));

        assert!(obj.remove(foobar));
        assert_eq!(obj.get(foobar), None);
        assert!(obj.direct_keys().is_empty());
        assert!(!obj.remove(foobar));
    }

    #[test]
    fn slot_protection() {
        let names = SymbolTable::new();
        let [a, b, c, z] = ["a", "b", "c", "z"].map(|n| names.intern(n));
        let value = ObjectId::from_index(1);

        let mut obj = object();
        obj.put(a, value);
        obj.put(b, value);
        obj.put(c, value);

        assert!(obj.add_protection(a, Protection::ASSIGN));
        assert!(obj.add_protection(b, Protection::ASSIGN | Protection::DELETE));
        assert!(!obj.add_protection(z, Protection::DELETE));

        assert!(obj.has_any_protection(a));
        assert!(obj.has_any_protection(b));
        assert!(!obj.has_any_protection(c));
        assert!(!obj.has_any_protection(z));

        assert!(obj.is_protected(a, Protection::ASSIGN));
        assert!(obj.is_protected(b, Protection::ASSIGN));
        assert!(!obj.is_protected(c, Protection::ASSIGN));
        assert!(!obj.is_protected(z, Protection::ASSIGN));

        assert!(!obj.is_protected(a, Protection::DELETE));
        assert!(obj.is_protected(b, Protection::DELETE));

        for name in [a, b, c, z] {
            assert!(obj.is_protected(name, Protection::empty()));
        }

        // reassignment keeps protection
        obj.put(a, ObjectId::from_index(2));
        assert!(obj.is_protected(a, Protection::ASSIGN));
    }

    #[test]
    fn primitive_field() {
        let mut obj = object();
        assert_eq!(obj.prim(), &Primitive::Empty);
        assert_eq!(
            obj.set_prim(Primitive::Number(Number::Int(10))),
            Primitive::Empty
        );
        assert_eq!(obj.prim(), &Primitive::Number(Number::Int(10)));

        let copy = obj.clone();
        assert_eq!(
            obj.set_prim(Primitive::Text("ABC".into())),
            Primitive::Number(Number::Int(10))
        );
        assert_eq!(copy.prim(), &Primitive::Number(Number::Int(10)));
        assert_eq!(obj.prim(), &Primitive::Text("ABC".into()));
    }

    #[test]
    fn object_id_display() {
        assert_eq!(ObjectId::from_index(4).to_string(), "#<object 4>");
        assert_eq!(ObjectId::NONE.to_string(), "#<none>");
        assert_eq!(ObjectId::from_index(4).index(), Some(4));
    }
}
