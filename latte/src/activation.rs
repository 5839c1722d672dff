use std::fmt;

use crate::stack::Stack;
use crate::{ObjectId, Symbol, SymbolTable};

/// One method activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub receiver: ObjectId,
    pub selector: Symbol,
    /// the method object that was sent
    pub method: ObjectId,
    pub lexical: ObjectId,
    /// per-activation scope holding `$n`, `self`, `again` and `caller`
    pub dynamic: ObjectId,
}

/// Snapshot of the activation stack, innermost frame first.
#[derive(Debug, Clone, Default)]
pub struct Backtrace {
    frames: Stack<Frame>,
}

impl Backtrace {
    pub fn new(frames: Stack<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn display<'a>(
        &'a self,
        names: &'a SymbolTable,
    ) -> DisplayBacktrace<'a> {
        DisplayBacktrace {
            backtrace: self,
            names,
        }
    }
}

pub struct DisplayBacktrace<'a> {
    backtrace: &'a Backtrace,
    names: &'a SymbolTable,
}

impl fmt::Display for DisplayBacktrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, frame) in self.backtrace.frames().enumerate() {
            writeln!(
                f,
                "{depth:>4}: {} sent to {}",
                self.names.name(frame.selector),
                frame.receiver
            )?;
        }
        Ok(())
    }
}
