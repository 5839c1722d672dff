use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::vm::Runtime;
use crate::ObjectId;

pub const ADD: PrimitiveDesc = PrimitiveDesc::new("numberAdd", 2, number_add);

pub fn number_add(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [lhs, rhs] = ADD.bind(args)?;
    let sum = vm.expect_number(lhs)?.add(&vm.expect_number(rhs)?);
    Ok(vm.make_number(sum))
}
