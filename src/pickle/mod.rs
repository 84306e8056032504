//! Pickle deserialization for trainer result files.
//!
//! The trainer writes its outputs with Python's `pickle` module, usually as a
//! dict holding NumPy arrays. This module decodes the opcode stream into a
//! plain [`Value`] tree; [`numpy`] turns reduced NumPy objects into arrays.

mod decoder;
pub mod numpy;

#[cfg(test)]
pub(crate) mod fixtures;

use std::path::Path;
use thiserror::Error;

pub use decoder::Decoder;

/// Highest pickle protocol understood by the decoder.
pub const HIGHEST_PROTOCOL: u8 = 5;

/// Errors raised while decoding a pickle stream.
#[derive(Debug, Error)]
pub enum PickleError {
    #[error("failed to read pickle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of input at byte {0}")]
    Eof(usize),

    #[error("unknown opcode 0x{opcode:02x} at byte {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("unsupported pickle protocol {0}")]
    Protocol(u8),

    #[error("stack underflow at byte {0}")]
    StackUnderflow(usize),

    #[error("no mark on the stack at byte {0}")]
    MissingMark(usize),

    #[error("memo key {0} not found")]
    MemoKey(usize),

    #[error("invalid literal {0:?}")]
    Literal(String),

    #[error("invalid UTF-8 in string at byte {0}")]
    Utf8(usize),

    #[error("unsupported pickle construct: {0}")]
    Unsupported(String),

    #[error("malformed numpy array: {0}")]
    Numpy(String),

    #[error("object graph is cyclic or nested too deeply")]
    Recursion,
}

/// A decoded Python object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    /// Integer wider than 64 bits, little-endian two's complement.
    BigInt(Vec<u8>),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    /// Key/value pairs in insertion order.
    Dict(Vec<(Value, Value)>),
    /// A reference to a module-level name (`GLOBAL` / `STACK_GLOBAL`).
    Global { module: String, name: String },
    /// The result of calling a global (`REDUCE`, `NEWOBJ`), plus any
    /// state applied with `BUILD`.
    Object {
        class: Box<Value>,
        args: Vec<Value>,
        state: Option<Box<Value>>,
    },
}

impl Value {
    /// Look up a string key in a dict value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(items) => items.iter().find_map(|(k, v)| match k {
                Value::String(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Returns true for dict-like values.
    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    /// Returns `(module, name)` when this value is a global reference.
    pub fn as_global(&self) -> Option<(&str, &str)> {
        match self {
            Value::Global { module, name } => Some((module.as_str(), name.as_str())),
            _ => None,
        }
    }

    /// Short Python-style type name, used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) | Value::BigInt(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "str".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Global { module, name } => format!("{}.{}", module, name),
            Value::Object { class, .. } => match class.as_global() {
                Some((module, name)) => format!("{}.{} instance", module, name),
                None => "object".to_string(),
            },
        }
    }
}

/// Decode a complete pickle stream held in memory.
pub fn from_slice(bytes: &[u8]) -> Result<Value, PickleError> {
    Decoder::new(bytes).decode()
}

/// Read and decode a pickle file.
pub fn from_path(path: &Path) -> Result<Value, PickleError> {
    let bytes = std::fs::read(path)?;
    from_slice(&bytes)
}
