//! Command Invocations
//!
//! A transient unit of work: a logical command name plus positional
//! arguments, built by the session surface and consumed once by the router.

use crate::value::Value;

/// One positional argument of a logical command, before reshaping.
///
/// Callers may hand the same logical command different shapes (a list where
/// a backend wants variadic scalars, ordered pairs where it wants a mapping);
/// the router reconciles them.
#[derive(Debug, Clone)]
pub enum Arg {
    Scalar(Value),
    List(Vec<Value>),
    /// Ordered two-element pairs, as supplied by the caller.
    Pairs(Vec<(Value, Value)>),
    /// An explicit key-to-value mapping.
    Map(Vec<(Value, Value)>),
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Scalar(v)
    }
}

/// A logical command invocation. Produced by a caller, consumed once.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }
}
