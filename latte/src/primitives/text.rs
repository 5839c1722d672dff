use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::vm::Runtime;
use crate::ObjectId;

pub const CONCAT: PrimitiveDesc =
    PrimitiveDesc::new("textConcat", 2, text_concat);

pub fn text_concat(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [lhs, rhs] = CONCAT.bind(args)?;
    let joined = [vm.expect_text(lhs)?, vm.expect_text(rhs)?].concat();
    Ok(vm.make_text(joined))
}
