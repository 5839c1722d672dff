use std::fmt;

use crate::error::RuntimeError;
use crate::vm::Runtime;
use crate::ObjectId;

pub mod control;
pub mod number;
pub mod object;
pub mod stream;
pub mod text;

pub type PrimitiveFn =
    fn(&mut Runtime, ObjectId, &[ObjectId]) -> Result<ObjectId, RuntimeError>;

/// A native callable. Natives receive the raw argument list and check it
/// against their own descriptor.
#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    /// exact argument count, or the minimum when `variadic`
    pub arity: u8,
    pub variadic: bool,
    pub func: PrimitiveFn,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, arity: u8, func: PrimitiveFn) -> Self {
        Self {
            name,
            arity,
            variadic: false,
            func,
        }
    }

    /// A native taking `arity` leading arguments and any number after them.
    pub const fn variadic(
        name: &'static str,
        arity: u8,
        func: PrimitiveFn,
    ) -> Self {
        Self {
            name,
            arity,
            variadic: true,
            func,
        }
    }

    /// Whether `count` arguments satisfy this descriptor.
    pub fn accepts(&self, count: usize) -> bool {
        let arity = usize::from(self.arity);
        count == arity || (self.variadic && count > arity)
    }

    fn mismatch(&self, got: usize) -> RuntimeError {
        RuntimeError::ArityMismatch {
            primitive: self.name,
            expected: usize::from(self.arity),
            got,
        }
    }

    /// The arguments as a fixed-size array, or `ArityMismatch`.
    pub fn bind<const N: usize>(
        &self,
        args: &[ObjectId],
    ) -> Result<[ObjectId; N], RuntimeError> {
        debug_assert_eq!(N, usize::from(self.arity), "{}", self.name);
        debug_assert!(!self.variadic, "{} takes extra arguments", self.name);
        bind_arguments(args).ok_or_else(|| self.mismatch(args.len()))
    }

    /// The leading arguments as a fixed-size array plus everything after
    /// them, or `ArityMismatch` when fewer than `N` were passed.
    pub fn bind_rest<'a, const N: usize>(
        &self,
        args: &'a [ObjectId],
    ) -> Result<([ObjectId; N], &'a [ObjectId]), RuntimeError> {
        debug_assert_eq!(N, usize::from(self.arity), "{}", self.name);
        if args.len() < N {
            return Err(self.mismatch(args.len()));
        }
        let (leading, rest) = args.split_at(N);
        let leading = bind_arguments(leading)
            .ok_or_else(|| self.mismatch(args.len()))?;
        Ok((leading, rest))
    }
}

impl PartialEq for PrimitiveDesc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for PrimitiveDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveDesc")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("variadic", &self.variadic)
            .finish()
    }
}

/// Destructure exactly `N` arguments.
#[inline]
pub fn bind_arguments<const N: usize>(
    args: &[ObjectId],
) -> Option<[ObjectId; N]> {
    args.try_into().ok()
}

/// Every native, as declared next to its implementation.
pub fn default_primitives() -> Vec<PrimitiveDesc> {
    vec![
        object::CLONE,
        object::PARENT,
        object::META,
        object::ORIGIN,
        object::IDENTICAL,
        control::IF,
        control::INVOKE,
        stream::WRITE,
        stream::WRITE_LINE,
        stream::READ_LINE,
        stream::READ_BYTE,
        stream::EOF,
        stream::CLOSE,
        number::ADD,
        text::CONCAT,
    ]
}

/// Put every primitive on `Kernel` as a native object under its own name.
pub fn install(vm: &mut Runtime, table: &[PrimitiveDesc]) {
    let kernel = vm.special().kernel;
    for desc in table {
        let native = vm.make_native(*desc);
        let name = vm.intern(desc.name);
        vm.put(kernel, name, native);
    }
    log::debug!("installed {} primitives", table.len());
}

/// Look up the descriptor of an installed primitive.
pub fn find(vm: &Runtime, name: &str) -> Option<PrimitiveDesc> {
    let name = vm.symbols().lookup(name)?;
    let native = vm.get(vm.special().kernel, name)?;
    vm.prim(native).as_native().copied()
}
