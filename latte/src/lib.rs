mod activation;
mod error;
mod heap;
mod interning;
mod lookup;
mod object;
mod primitive;
pub mod primitives;
mod property_map;
mod slots;
mod special;
mod stack;
mod stream;
mod vm;

#[cfg(test)]
mod proptests;

pub use activation::{Backtrace, DisplayBacktrace, Frame};
pub use error::RuntimeError;
pub use heap::{Heap, HeapCreateInfo, SCOPE_BUCKETS};
pub use interning::{Symbol, SymbolTable};
pub use lookup::{
    Hierarchy, LookupResult, hierarchy, keys, lookup, lookup_meta, origin,
};
pub use object::*;
pub use primitive::*;
pub use primitives::{PrimitiveDesc, PrimitiveFn, bind_arguments};
pub use property_map::{DEFAULT_BUCKETS, PropertyMap, TREE_DEPTH, TREE_LEN};
pub use slots::{Protection, Slot};
pub use special::{Names, SpecialObjects, bootstrap};
pub use stack::Stack;
pub use stream::*;
pub use vm::*;
