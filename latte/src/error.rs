use thiserror::Error;

use crate::{ObjectId, Protection};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{receiver} does not understand '{selector}'")]
    MessageNotUnderstood { receiver: ObjectId, selector: String },
    #[error(
        "primitive '{primitive}' expects {expected} argument(s), got {got}"
    )]
    ArityMismatch {
        primitive: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("expected {expected}, got {got}")]
    TypeError { expected: &'static str, got: ObjectId },
    #[error("slot '{slot}' of {object} is protected ({protection:?})")]
    ProtectedSlot {
        object: ObjectId,
        slot: String,
        protection: Protection,
    },
    #[error("{object} has no slot '{slot}'")]
    MissingSlot { object: ObjectId, slot: String },
    #[error("call depth exceeded {limit}")]
    StackOverflow { limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
