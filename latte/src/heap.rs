use std::ops::{Index, IndexMut};

use crate::property_map::DEFAULT_BUCKETS;

/// Scopes hold the positional arguments, `self`, `again`, `caller` and
/// whatever locals a body adds.
pub const SCOPE_BUCKETS: usize = 7;
use crate::{Object, ObjectId};

#[derive(Debug, Clone)]
pub struct HeapCreateInfo {
    /// objects to reserve room for up front
    pub initial_capacity: usize,
    /// starting bucket count of every object's slot table
    pub slot_buckets: usize,
    /// starting bucket count of activation scopes
    pub scope_buckets: usize,
}

impl Default for HeapCreateInfo {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            slot_buckets: DEFAULT_BUCKETS,
            scope_buckets: SCOPE_BUCKETS,
        }
    }
}

/// Arena owning every object; objects are addressed by [`ObjectId`] and
/// live as long as the heap.
// TODO: nothing is ever freed; unreachable objects need a collector
#[derive(Debug)]
pub struct Heap {
    objects: Vec<Object>,
    slot_buckets: usize,
    scope_buckets: usize,
}

impl Heap {
    pub fn new(info: HeapCreateInfo) -> Self {
        Self {
            objects: Vec::with_capacity(info.initial_capacity),
            slot_buckets: info.slot_buckets.max(1),
            scope_buckets: info.scope_buckets.max(1),
        }
    }

    fn push(&mut self, object: Object) -> ObjectId {
        let id = ObjectId::from_index(self.objects.len());
        self.objects.push(object);
        id
    }

    /// Allocate an object that is its own parent and its own meta.
    pub fn allocate_root(&mut self) -> ObjectId {
        let id = ObjectId::from_index(self.objects.len());
        self.push(Object::new(id, id, self.slot_buckets))
    }

    pub fn allocate(&mut self, parent: ObjectId, meta: ObjectId) -> ObjectId {
        debug_assert!(self.contains(parent) && self.contains(meta));
        self.push(Object::new(parent, meta, self.slot_buckets))
    }

    /// A new object inheriting from `proto`: same meta, copied payload,
    /// no slots of its own.
    pub fn clone_object(&mut self, proto: ObjectId) -> ObjectId {
        self.clone_sized(proto, self.slot_buckets)
    }

    /// [`clone_object`](Self::clone_object) with a slot table sized for an
    /// activation scope.
    pub fn clone_scope(&mut self, proto: ObjectId) -> ObjectId {
        self.clone_sized(proto, self.scope_buckets)
    }

    fn clone_sized(&mut self, proto: ObjectId, buckets: usize) -> ObjectId {
        let source = &self[proto];
        let meta = source.meta;
        let primitive = source.prim().clone();
        let mut object = Object::new(proto, meta, buckets);
        object.set_prim(primitive);
        self.push(object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        id.index().is_some_and(|index| index < self.objects.len())
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index()?)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id.index()?)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Index<ObjectId> for Heap {
    type Output = Object;

    /// Panics on `ObjectId::NONE` or an id from another heap.
    fn index(&self, id: ObjectId) -> &Object {
        match self.get(id) {
            Some(object) => object,
            None => panic!("{id} is not allocated in this heap"),
        }
    }
}

impl IndexMut<ObjectId> for Heap {
    fn index_mut(&mut self, id: ObjectId) -> &mut Object {
        match self.get_mut(id) {
            Some(object) => object,
            None => panic!("{id} is not allocated in this heap"),
        }
    }
}
