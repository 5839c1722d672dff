use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::rc::Rc;

fn unsupported(what: &str) -> io::Error {
    io::Error::new(ErrorKind::Unsupported, format!("stream cannot {what}"))
}

fn closed() -> io::Error {
    io::Error::new(ErrorKind::BrokenPipe, "stream is closed")
}

/// Byte and line oriented I/O behind a stream object.
///
/// Every operation defaults to failing, so a read-only stream only needs to
/// implement the reading half and vice versa.
pub trait Stream: fmt::Debug {
    fn can_read(&self) -> bool {
        false
    }

    fn can_write(&self) -> bool {
        false
    }

    /// The next byte, or `None` at end of stream.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Err(unsupported("read"))
    }

    /// The next line without its terminator, or `None` at end of stream.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Err(unsupported("read"))
    }

    fn write_text(&mut self, _text: &str) -> io::Result<()> {
        Err(unsupported("write"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_eof(&mut self) -> bool {
        true
    }

    fn close(&mut self) -> io::Result<()>;
}

/// Reads from any buffered source.
pub struct InputStream<R> {
    name: &'static str,
    reader: Option<R>,
}

impl<R: BufRead> InputStream<R> {
    pub fn new(name: &'static str, reader: R) -> Self {
        Self {
            name,
            reader: Some(reader),
        }
    }

    fn reader(&mut self) -> io::Result<&mut R> {
        self.reader.as_mut().ok_or_else(closed)
    }
}

impl<R> fmt::Debug for InputStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("name", &self.name)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

impl<R: BufRead> Stream for InputStream<R> {
    fn can_read(&self) -> bool {
        self.reader.is_some()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let reader = self.reader()?;
        let byte = match reader.fill_buf()?.first() {
            Some(&byte) => byte,
            None => return Ok(None),
        };
        reader.consume(1);
        Ok(Some(byte))
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader()?.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn is_eof(&mut self) -> bool {
        match self.reader.as_mut() {
            Some(reader) => {
                reader.fill_buf().map_or(true, |buf| buf.is_empty())
            }
            None => true,
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }
}

/// Writes to any sink.
pub struct OutputStream<W> {
    name: &'static str,
    writer: Option<W>,
}

impl<W: Write> OutputStream<W> {
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            writer: Some(writer),
        }
    }
}

impl<W> fmt::Debug for OutputStream<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("name", &self.name)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

impl<W: Write> Stream for OutputStream<W> {
    fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.writer.as_mut().ok_or_else(closed)?.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// An in-memory stream: reads consume `input`, writes append to `output`.
#[derive(Debug, Default)]
pub struct MemoryStream {
    input: io::Cursor<Vec<u8>>,
    output: Vec<u8>,
    closed: bool,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: io::Cursor::new(input.into()),
            ..Self::default()
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed { Err(closed()) } else { Ok(()) }
    }
}

impl Stream for MemoryStream {
    fn can_read(&self) -> bool {
        !self.closed
    }

    fn can_write(&self) -> bool {
        !self.closed
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.check_open()?;
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.check_open()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.check_open()?;
        self.output.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn is_eof(&mut self) -> bool {
        self.closed
            || self.input.position() as usize >= self.input.get_ref().len()
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    Append,
}

/// Shared handle to a stream. Clones refer to the same stream.
#[derive(Clone)]
pub struct StreamHandle(Rc<RefCell<dyn Stream>>);

impl StreamHandle {
    pub fn new(stream: impl Stream + 'static) -> Self {
        Self(Rc::new(RefCell::new(stream)))
    }

    pub fn stdin() -> Self {
        Self::new(InputStream::new("stdin", BufReader::new(io::stdin())))
    }

    pub fn stdout() -> Self {
        Self::new(OutputStream::new("stdout", io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new(OutputStream::new("stderr", io::stderr()))
    }

    pub fn open_file(
        path: impl AsRef<Path>,
        access: FileAccess,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let handle = match access {
            FileAccess::Read => {
                let reader = BufReader::new(File::open(path)?);
                Self::new(InputStream::new("file", reader))
            }
            FileAccess::Write => {
                Self::new(OutputStream::new("file", File::create(path)?))
            }
            FileAccess::Append => {
                let file =
                    File::options().append(true).create(true).open(path)?;
                Self::new(OutputStream::new("file", file))
            }
        };
        log::debug!("opened {} ({access:?})", path.display());
        Ok(handle)
    }

    /// Run `f` with exclusive access to the stream.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn Stream) -> T) -> T {
        f(&mut *self.0.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stream) => fmt::Debug::fmt(&*stream, f),
            Err(_) => f.write_str("StreamHandle(<busy>)"),
        }
    }
}
