//! Observability trait for inspecting timing state.
//!
//! The scheduler and every device expose their timing state by path for
//! debugging and tests. Queries never affect emulation state.

use std::fmt;

use crate::{EmuDuration, EmuTime};

/// A dynamically-typed value for state queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Counter (lines, frames, pending points...).
    Count(u64),
    /// An instant.
    Time(EmuTime),
    /// A span.
    Duration(EmuDuration),
    /// Free-form text.
    Text(String),
    /// List of values.
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Count(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Duration(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Count(v)
    }
}

impl From<EmuTime> for Value {
    fn from(v: EmuTime) -> Self {
        Value::Time(v)
    }
}

impl From<EmuDuration> for Value {
    fn from(v: EmuDuration) -> Self {
        Value::Duration(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// A component whose timing state can be inspected.
pub trait Observable {
    /// Query a property by path, e.g. `time`, `pending`, `frame`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// All paths accepted by [`query`](Self::query).
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(EmuTime::from_ticks(960)).to_string(), "960t");
        assert_eq!(
            Value::List(vec![Value::Count(1), Value::from("vdp")]).to_string(),
            "[1, vdp]"
        );
    }
}
