//! Read-only state inspection.
//!
//! Debuggers and tests look inside components through string paths rather
//! than through their concrete types. A query never changes emulation state.

use std::fmt;

/// A dynamically-typed value returned from a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U64(u64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

/// A component whose state can be inspected.
pub trait Observable {
    /// Query a property by dotted path, e.g. `pc`, `flags.z`, `ula.border`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// All paths `query` understands. Paths ending in `<addr>` take a hex
    /// address suffix.
    fn query_paths(&self) -> &'static [&'static str];
}
