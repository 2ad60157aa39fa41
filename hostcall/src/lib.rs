//! Hostcall
//!
//! Run-time overload resolution and invocation for dynamically typed callers
//! of a statically typed host.
//!
//! Given a target type or instance, a member name and the run-time types of
//! the arguments, the engine picks the member static overload resolution
//! would have picked, swaps it for a visible declaration if needed, coerces
//! the arguments and performs the call.
//!
//! # Features
//!
//! - Exact, widening and boxing applicability per argument
//! - Most-specific-applicable tie-breaking with covariant return handling
//! - Accessibility promotion through capabilities and supertypes
//! - Host numeric conversion rules for primitive parameters
//! - Callee errors passed through unchanged
//! - Optional memoization of resolution outcomes
//!
//! # Example
//!
//! ```rust,ignore
//! use hostcall::{Dispatcher, Registry, Value};
//!
//! let registry = Registry::builder().build();
//! let dispatcher = Dispatcher::new(&registry);
//! let five = dispatcher.invoke_static_by_name("Integer", "valueOf", &[Value::Int(5)])?;
//! assert_eq!(five, Value::Int(5));
//! ```

pub mod catalog;
pub mod coerce;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod member;
pub mod types;
pub mod value;

pub use catalog::{
    CallFailure, CalleeError, MemberDecl, NumberFormatError, Registry, RegistryBuilder, RegistryError, TypeCatalog,
    TypeDecl, TypeInfo,
};
pub use coerce::{coerce, coerce_all, convert_number, CoercionError};
pub use config::{CacheConfig, Config, ConfigError, DispatchConfig};
pub use dispatch::{promote, CandidateResolver, InaccessibleError, MatchOutcome, ParamMatch};
pub use error::{DispatchError, DispatchResult};
pub use invoke::{Dispatcher, Target};
pub use member::{MemberDescriptor, MemberId, MemberKind, Visibility};
pub use types::{ArgType, Primitive, Type, TypeId};
pub use value::{Object, Value};
