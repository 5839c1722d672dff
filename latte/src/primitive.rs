use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::activation::Frame;
use crate::error::RuntimeError;
use crate::primitives::PrimitiveDesc;
use crate::stream::StreamHandle;
use crate::vm::Runtime;
use crate::ObjectId;

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    /// Integers outside the `i64` range.
    Big(BigInt),
}

impl Number {
    /// Exact integer addition; only a float operand makes the sum a float.
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => match a.checked_add(*b) {
                Some(sum) => Self::Int(sum),
                None => Self::Big(BigInt::from(*a) + BigInt::from(*b)),
            },
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                Self::Float(self.as_f64() + other.as_f64())
            }
            (a, b) => Self::from_big(a.to_big() + b.to_big()),
        }
    }

    /// Demotes to `Int` whenever the value fits.
    pub fn from_big(value: BigInt) -> Self {
        match value.to_i64() {
            Some(i) => Self::Int(i),
            None => Self::Big(value),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Big(b) => b.to_f64().unwrap_or(f64::NAN),
        }
    }

    fn to_big(&self) -> BigInt {
        match self {
            Self::Int(i) => BigInt::from(*i),
            Self::Big(b) => b.clone(),
            Self::Float(f) => BigInt::from_f64(*f).unwrap_or_default(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Big(b) => write!(f, "{b}"),
        }
    }
}

/// Evaluates a method once its activation is set up.
///
/// The runtime does not know how a body is represented; an evaluator plugs
/// its own tree or bytecode in here.
pub trait MethodBody {
    fn evaluate(
        &self,
        vm: &mut Runtime,
        frame: &Frame,
    ) -> Result<ObjectId, RuntimeError>;

    fn name(&self) -> &str {
        "<method>"
    }
}

struct FnBody<F> {
    name: String,
    func: F,
}

impl<F> MethodBody for FnBody<F>
where
    F: Fn(&mut Runtime, &Frame) -> Result<ObjectId, RuntimeError>,
{
    fn evaluate(
        &self,
        vm: &mut Runtime,
        frame: &Frame,
    ) -> Result<ObjectId, RuntimeError> {
        (self.func)(vm, frame)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A method body together with the lexical scope it closed over.
#[derive(Clone)]
pub struct Closure {
    pub body: Rc<dyn MethodBody>,
    pub lexical: ObjectId,
}

impl Closure {
    pub fn new(body: Rc<dyn MethodBody>, lexical: ObjectId) -> Self {
        Self { body, lexical }
    }

    pub fn from_fn<F>(name: &str, lexical: ObjectId, func: F) -> Self
    where
        F: Fn(&mut Runtime, &Frame) -> Result<ObjectId, RuntimeError> + 'static,
    {
        let body = FnBody {
            name: name.to_owned(),
            func,
        };
        Self::new(Rc::new(body), lexical)
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.body), Rc::as_ptr(&other.body))
            && self.lexical == other.lexical
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("body", &self.body.name())
            .field("lexical", &self.lexical)
            .finish()
    }
}

/// Payload carried by an object besides its slots.
///
/// Cloning an object clones its payload; streams and method bodies are
/// shared handles, so the copy refers to the same underlying resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Primitive {
    #[default]
    Empty,
    Number(Number),
    Text(String),
    Stream(StreamHandle),
    Native(PrimitiveDesc),
    Method(Closure),
}

impl Primitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Stream(_) => "stream",
            Self::Native(_) => "native",
            Self::Method(_) => "method",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(n.clone()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamHandle> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&PrimitiveDesc> {
        match self {
            Self::Native(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Closure> {
        match self {
            Self::Method(c) => Some(c),
            _ => None,
        }
    }
}
