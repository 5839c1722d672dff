use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::vm::Runtime;
use crate::{Number, ObjectId};

pub const WRITE: PrimitiveDesc =
    PrimitiveDesc::new("streamWrite", 2, stream_write);
pub const WRITE_LINE: PrimitiveDesc =
    PrimitiveDesc::new("streamWriteLine", 2, stream_write_line);
pub const READ_LINE: PrimitiveDesc =
    PrimitiveDesc::new("streamReadLine", 1, stream_read_line);
pub const READ_BYTE: PrimitiveDesc =
    PrimitiveDesc::new("streamReadByte", 1, stream_read_byte);
pub const EOF: PrimitiveDesc = PrimitiveDesc::new("streamEof", 1, stream_eof);
pub const CLOSE: PrimitiveDesc =
    PrimitiveDesc::new("streamClose", 1, stream_close);

fn write(
    vm: &mut Runtime,
    stream: ObjectId,
    text: ObjectId,
    newline: bool,
) -> Result<ObjectId, RuntimeError> {
    let handle = vm.expect_stream(stream)?;
    let text = vm.expect_text(text)?;
    handle.with(|s| {
        s.write_text(text)?;
        if newline {
            s.write_text("\n")?;
        }
        s.flush()
    })?;
    Ok(vm.special().nil)
}

pub fn stream_write(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream, text] = WRITE.bind(args)?;
    write(vm, stream, text, false)
}

pub fn stream_write_line(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream, text] = WRITE_LINE.bind(args)?;
    write(vm, stream, text, true)
}

/// The next line as text, or `Nil` at end of stream.
pub fn stream_read_line(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream] = READ_LINE.bind(args)?;
    let line = vm.expect_stream(stream)?.with(|s| s.read_line())?;
    Ok(match line {
        Some(line) => vm.make_text(line),
        None => vm.special().nil,
    })
}

/// The next byte as a number, or `Nil` at end of stream.
pub fn stream_read_byte(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream] = READ_BYTE.bind(args)?;
    let byte = vm.expect_stream(stream)?.with(|s| s.read_byte())?;
    Ok(match byte {
        Some(byte) => vm.make_number(Number::Int(i64::from(byte))),
        None => vm.special().nil,
    })
}

pub fn stream_eof(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream] = EOF.bind(args)?;
    let eof = vm.expect_stream(stream)?.with(|s| s.is_eof());
    Ok(vm.boolean(eof))
}

pub fn stream_close(
    vm: &mut Runtime,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<ObjectId, RuntimeError> {
    let [stream] = CLOSE.bind(args)?;
    vm.expect_stream(stream)?.with(|s| s.close())?;
    Ok(vm.special().nil)
}
