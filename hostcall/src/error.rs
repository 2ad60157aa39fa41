//! Dispatch errors.

use thiserror::Error;

use crate::catalog::CalleeError;
use crate::coerce::CoercionError;
use crate::dispatch::InaccessibleError;
use crate::member::MemberKind;

/// Errors that can occur while dispatching a call.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("No matching {}{kind} found in {type_name} for argtypes: {arg_types}", name_prefix(.name))]
    NoMatchingMember {
        kind: MemberKind,
        /// Empty for constructors.
        name: String,
        type_name: String,
        arg_types: String,
    },

    #[error("Found multiple {}{kind}s in {type_name} for argtypes: {arg_types}", name_prefix(.name))]
    AmbiguousMember {
        kind: MemberKind,
        name: String,
        type_name: String,
        arg_types: String,
        /// Rendered signatures of every tied member.
        candidates: Vec<String>,
    },

    #[error("No {name} field found in {type_name}")]
    NoSuchField { name: String, type_name: String },

    #[error(transparent)]
    Inaccessible(#[from] InaccessibleError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The callee ran and raised; this is its original error.
    #[error(transparent)]
    Callee(CalleeError),

    /// The call mechanism failed before or around the callee.
    #[error("reflective call to {member} failed: {message}")]
    ReflectiveCall { member: String, message: String },

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("cannot access {name} on null")]
    NullTarget { name: String },
}

impl DispatchError {
    /// The callee's own error, if the call reached it and it raised.
    pub fn callee(&self) -> Option<&CalleeError> {
        match self {
            DispatchError::Callee(err) => Some(err),
            _ => None,
        }
    }
}

fn name_prefix(name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{name} ")
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
