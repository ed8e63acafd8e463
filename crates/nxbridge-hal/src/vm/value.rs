//! VM values and variant lists

use crate::buffer::BufferViewRef;
use crate::error::{HalError, Result};
use std::fmt;

/// Kind of a value slot, as spelled in calling conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `i`
    I32,
    /// `I`
    I64,
    /// `r`: a buffer view reference
    Ref,
}

impl ValueKind {
    pub const fn cconv_char(self) -> char {
        match self {
            ValueKind::I32 => 'i',
            ValueKind::I64 => 'I',
            ValueKind::Ref => 'r',
        }
    }

    pub fn from_cconv_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(ValueKind::I32),
            'I' => Some(ValueKind::I64),
            'r' => Some(ValueKind::Ref),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::I32 => f.write_str("i32"),
            ValueKind::I64 => f.write_str("i64"),
            ValueKind::Ref => f.write_str("!hal.buffer_view"),
        }
    }
}

/// A VM value
#[derive(Debug, Clone)]
pub enum Value {
    I32(i32),
    I64(i64),
    Ref(BufferViewRef),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::Ref(_) => ValueKind::Ref,
        }
    }

    pub fn as_buffer_view(&self) -> Option<&BufferViewRef> {
        match self {
            Value::Ref(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::Ref(_) => None,
        }
    }
}

impl From<BufferViewRef> for Value {
    fn from(view: BufferViewRef) -> Self {
        Value::Ref(view)
    }
}

/// Ordered list of optional values used for invocation arguments and results
#[derive(Debug, Clone, Default)]
pub struct VariantList {
    values: Vec<Option<Value>>,
}

impl VariantList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(Some(value.into()));
    }

    pub fn push_buffer_view(&mut self, view: &BufferViewRef) {
        self.values.push(Some(Value::Ref(BufferViewRef::clone(view))));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Value at `index`, if the slot exists and is set
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Retained buffer view at `index`.
    ///
    /// Fails if the slot is out of range, unset, or not a reference.
    pub fn get_buffer_view(&self, index: usize) -> Result<BufferViewRef> {
        match self.values.get(index) {
            None => Err(HalError::OutOfRange(format!(
                "index {index} out of bounds for list of {} values",
                self.values.len()
            ))),
            Some(None) => Err(HalError::FailedPrecondition(format!("slot {index} holds no value"))),
            Some(Some(Value::Ref(view))) => Ok(BufferViewRef::clone(view)),
            Some(Some(other)) => Err(HalError::type_mismatch(ValueKind::Ref, other.kind())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Value>> {
        self.values.iter().map(Option::as_ref)
    }

    /// Replace the contents with `values`
    pub(crate) fn assign(&mut self, values: Vec<Value>) {
        self.values = values.into_iter().map(Some).collect();
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
