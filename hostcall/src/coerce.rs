//! Argument coercion.
//!
//! Turns already-resolved arguments into the exact representation each
//! parameter expects. Reference parameters only check; primitive parameters
//! convert boxed numbers with the host's narrowing and widening rules.

use thiserror::Error;

use crate::catalog::TypeCatalog;
use crate::types::{type_name, Primitive, Type};
use crate::value::Value;

/// An argument could not be brought to its parameter's type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    /// The value's run-time type is not assignable to the parameter.
    #[error("Cannot cast {given} to {expected}")]
    Cast {
        expected: String,
        given: String,
        position: Option<usize>,
    },

    /// A primitive parameter received a value it cannot convert.
    #[error("Unexpected param type, expected: {expected}, given: {given}")]
    Unexpected {
        expected: String,
        given: String,
        position: Option<usize>,
    },

    #[error("Wrong number of args: expected {expected}, given {given}")]
    Arity { expected: usize, given: usize },
}

impl CoercionError {
    /// Index of the offending argument, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            CoercionError::Cast { position, .. } | CoercionError::Unexpected { position, .. } => *position,
            CoercionError::Arity { .. } => None,
        }
    }

    pub fn with_position(mut self, at: usize) -> Self {
        match &mut self {
            CoercionError::Cast { position, .. } | CoercionError::Unexpected { position, .. } => {
                *position = Some(at)
            }
            CoercionError::Arity { .. } => {}
        }
        self
    }
}

fn value_type_name<C: TypeCatalog + ?Sized>(catalog: &C, value: &Value) -> String {
    match catalog.runtime_type(value) {
        Some(ty) => type_name(catalog, &ty),
        None => "null".to_string(),
    }
}

/// Coerce one argument to `param`.
pub fn coerce<C: TypeCatalog + ?Sized>(catalog: &C, value: &Value, param: &Type) -> Result<Value, CoercionError> {
    let unexpected = || CoercionError::Unexpected {
        expected: type_name(catalog, param),
        given: value_type_name(catalog, value),
        position: None,
    };
    let cast = |expected: String| CoercionError::Cast {
        expected,
        given: value_type_name(catalog, value),
        position: None,
    };

    match param {
        Type::Void => Err(unexpected()),
        Type::Reference(to) => match catalog.runtime_type(value) {
            None => Ok(Value::Null),
            Some(Type::Reference(from)) if catalog.is_subtype(from, *to) => Ok(value.clone()),
            Some(_) => Err(cast(catalog.type_name(*to))),
        },
        Type::Primitive(p @ (Primitive::Boolean | Primitive::Char)) => match (p, value) {
            (_, Value::Null) => Err(unexpected()),
            (Primitive::Boolean, Value::Boolean(_)) | (Primitive::Char, Value::Char(_)) => Ok(value.clone()),
            _ => Err(cast(catalog.type_name(catalog.boxed_type(*p)))),
        },
        Type::Primitive(p) => convert_number(value, *p).ok_or_else(unexpected),
    }
}

/// Source magnitude of a boxed number.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Integral(i64),
    Float(f32),
    Double(f64),
}

impl Numeric {
    fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Byte(v) => Numeric::Integral(i64::from(*v)),
            Value::Short(v) => Numeric::Integral(i64::from(*v)),
            Value::Int(v) => Numeric::Integral(i64::from(*v)),
            Value::Long(v) => Numeric::Integral(*v),
            Value::Float(v) => Numeric::Float(*v),
            Value::Double(v) => Numeric::Double(*v),
            _ => return None,
        })
    }

    // Float to integral saturates and maps NaN to zero; integral narrowing
    // wraps. Both match `as`.
    fn to_int(self) -> i32 {
        match self {
            Numeric::Integral(v) => v as i32,
            Numeric::Float(v) => v as i32,
            Numeric::Double(v) => v as i32,
        }
    }

    fn to_long(self) -> i64 {
        match self {
            Numeric::Integral(v) => v,
            Numeric::Float(v) => v as i64,
            Numeric::Double(v) => v as i64,
        }
    }

    /// Floats reach byte and short through int.
    fn to_narrow_source(self) -> i64 {
        match self {
            Numeric::Integral(v) => v,
            floating => i64::from(floating.to_int()),
        }
    }

    fn to_float(self) -> f32 {
        match self {
            Numeric::Integral(v) => v as f32,
            Numeric::Float(v) => v,
            Numeric::Double(v) => v as f32,
        }
    }

    fn to_double(self) -> f64 {
        match self {
            Numeric::Integral(v) => v as f64,
            Numeric::Float(v) => f64::from(v),
            Numeric::Double(v) => v,
        }
    }
}

/// Convert a boxed number to the numeric primitive `target`.
///
/// Returns `None` for non-numbers and for non-numeric targets.
pub fn convert_number(value: &Value, target: Primitive) -> Option<Value> {
    let n = Numeric::of(value)?;
    Some(match target {
        Primitive::Int => Value::Int(n.to_int()),
        Primitive::Long => Value::Long(n.to_long()),
        Primitive::Short => Value::Short(n.to_narrow_source() as i16),
        Primitive::Byte => Value::Byte(n.to_narrow_source() as i8),
        Primitive::Float => Value::Float(n.to_float()),
        Primitive::Double => Value::Double(n.to_double()),
        Primitive::Boolean | Primitive::Char => return None,
    })
}

/// Coerce every argument positionally. Either all succeed or the first
/// failure is returned with its position.
pub fn coerce_all<C: TypeCatalog + ?Sized>(
    catalog: &C,
    params: &[Type],
    args: &[Value],
) -> Result<Vec<Value>, CoercionError> {
    if params.len() != args.len() {
        return Err(CoercionError::Arity {
            expected: params.len(),
            given: args.len(),
        });
    }
    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| coerce(catalog, arg, param).map_err(|e| e.with_position(i)))
        .collect()
}
