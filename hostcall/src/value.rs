//! Run-time values crossing the dispatch boundary.
//!
//! Primitives only ever travel boxed: a [`Value::Int`] is the host's boxed
//! integer, and its run-time type is the catalog's wrapper type for `int`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::types::{Primitive, TypeId};

/// A host value.
#[derive(Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Object(Arc<Object>),
}

impl Value {
    /// Canonical boxed `true`.
    pub const TRUE: Value = Value::Boolean(true);
    /// Canonical boxed `false`.
    pub const FALSE: Value = Value::Boolean(false);

    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    /// The primitive this value boxes, if any.
    pub fn boxed_primitive(&self) -> Option<Primitive> {
        Some(match self {
            Value::Boolean(_) => Primitive::Boolean,
            Value::Char(_) => Primitive::Char,
            Value::Byte(_) => Primitive::Byte,
            Value::Short(_) => Primitive::Short,
            Value::Int(_) => Primitive::Int,
            Value::Long(_) => Primitive::Long,
            Value::Float(_) => Primitive::Float,
            Value::Double(_) => Primitive::Double,
            _ => return None,
        })
    }

    /// Whether this is a boxed numeric value.
    pub fn is_number(&self) -> bool {
        self.boxed_primitive().is_some_and(Primitive::is_numeric)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral view of a boxed number, truncating floats toward zero.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Floating view of a boxed number.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            // Bitwise, so a boxed NaN equals itself.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Boolean(v) => write!(f, "Boolean({})", v),
            Value::Char(v) => write!(f, "Char({:?})", v),
            Value::Byte(v) => write!(f, "Byte({})", v),
            Value::Short(v) => write!(f, "Short({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::Str(v) => write!(f, "Str({:?})", v),
            Value::Object(o) => write!(f, "Object(#{})", o.ty.index),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) if v.is_infinite() => f.write_str(infinity(*v > 0.0)),
            Value::Double(v) if v.is_infinite() => f.write_str(infinity(*v > 0.0)),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Str(v) => f.write_str(v),
            Value::Object(o) => write!(f, "#<object {}@{:p}>", o.ty.index, Arc::as_ptr(o)),
        }
    }
}

fn infinity(positive: bool) -> &'static str {
    if positive {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// An instance of a catalog type.
pub struct Object {
    /// The instance's run-time type.
    pub ty: TypeId,
    fields: RwLock<IndexMap<String, Value>>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Object {
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            fields: RwLock::new(IndexMap::new()),
            payload: None,
        }
    }

    /// Attach host data that natives can downcast.
    pub fn with_payload(mut self, payload: impl Any + Send + Sync) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Read an instance field. Unset fields read as `Null`.
    pub fn field(&self, name: &str) -> Value {
        self.fields.read().get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.write().insert(name.to_string(), value);
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("ty", &self.ty)
            .field("fields", &*self.fields.read())
            .finish_non_exhaustive()
    }
}
