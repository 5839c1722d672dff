use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::vm::Runtime;
use crate::ObjectId;

pub const CLONE: PrimitiveDesc = PrimitiveDesc::new("clone", 1, object_clone);
pub const PARENT: PrimitiveDesc =
    PrimitiveDesc::new("parent", 1, object_parent);
pub const META: PrimitiveDesc = PrimitiveDesc::new("meta", 1, object_meta);
pub const ORIGIN: PrimitiveDesc =
    PrimitiveDesc::new("origin", 2, object_origin);
pub const IDENTICAL: PrimitiveDesc =
    PrimitiveDesc::new("identical", 2, object_identical);

pub fn object_clone(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [target] = CLONE.bind(args)?;
    Ok(vm.clone_object(target))
}

pub fn object_parent(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [target] = PARENT.bind(args)?;
    Ok(vm.parent(target))
}

pub fn object_meta(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [target] = META.bind(args)?;
    Ok(vm.meta(target))
}

/// `origin(target, name)`: the object holding `name` for `target`, or `Nil`.
pub fn object_origin(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [target, name] = ORIGIN.bind(args)?;
    let name = vm.intern(vm.expect_text(name)?);
    Ok(vm.origin(target, name).unwrap_or(vm.special().nil))
}

pub fn object_identical(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [lhs, rhs] = IDENTICAL.bind(args)?;
    Ok(vm.boolean(lhs == rhs))
}
