use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::vm::Runtime;
use crate::ObjectId;

pub const IF: PrimitiveDesc = PrimitiveDesc::new("if", 3, control_if);
pub const INVOKE: PrimitiveDesc =
    PrimitiveDesc::variadic("invoke", 1, control_invoke);

/// `if(condition, then, else)`: activates `then` unless `condition` is
/// `False` or `Nil`, otherwise `else`. Non-method branches are returned as
/// they are.
pub fn control_if(
    vm: &mut Runtime,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [condition, then, otherwise] = IF.bind(args)?;
    let branch = if vm.is_truthy(condition) { then } else { otherwise };
    let selector = vm.intern(IF.name);
    vm.call(branch, receiver, selector, &[])
}

/// `invoke(method, args...)`: activates `method` with the remaining
/// arguments and the same receiver.
pub fn control_invoke(
    vm: &mut Runtime,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let ([method], rest) = INVOKE.bind_rest(args)?;
    let selector = vm.intern(INVOKE.name);
    vm.call(method, receiver, selector, rest)
}
