//! The host type catalog.
//!
//! Resolution never inspects host types directly. Everything it needs (the
//! member lists, the supertype and capability graph, and the native entry
//! points) comes through [`TypeCatalog`]. [`Registry`] is the in-crate
//! implementation, populated through [`RegistryBuilder`].

mod prelude;
mod registry;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::member::{MemberDescriptor, MemberKind, Visibility};
use crate::types::{ArgType, Primitive, Type, TypeId};
use crate::value::Value;

pub use prelude::{NumberFormatError, Prelude};
pub use registry::{MemberDecl, NativeFn, Registry, RegistryBuilder, RegistryError, TypeDecl};

/// Static facts about one catalog type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The type's identity.
    pub id: TypeId,
    /// Display name.
    pub name: String,
    /// Whether external callers may reach the type's members directly.
    pub visibility: Visibility,
    /// Capability (interface) types have no supertype and no constructors.
    pub is_capability: bool,
    /// Direct supertype. `None` for the root type and for capabilities.
    pub supertype: Option<TypeId>,
    /// Capabilities implemented directly, in declaration order.
    pub capabilities: Vec<TypeId>,
    /// The primitive this type boxes, for wrapper types.
    pub boxes: Option<Primitive>,
}

/// An error raised by a callee during its own execution.
///
/// The original error is kept behind an `Arc` so it can travel through the
/// dispatcher unchanged; `Display` and `source` delegate to it.
#[derive(Clone)]
pub struct CalleeError(Arc<dyn Error + Send + Sync + 'static>);

impl CalleeError {
    pub fn new(err: impl Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for CalleeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for CalleeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for CalleeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Why a native call did not produce a value.
#[derive(Debug, Clone)]
pub enum CallFailure {
    /// The callee ran and raised this error.
    Raised(CalleeError),
    /// The call never reached the callee.
    Mechanism(String),
}

impl CallFailure {
    pub fn raised(err: impl Error + Send + Sync + 'static) -> Self {
        CallFailure::Raised(CalleeError::new(err))
    }

    pub fn mechanism(message: impl Into<String>) -> Self {
        CallFailure::Mechanism(message.into())
    }
}

/// Read access to a host's types and members, plus the native call gate.
pub trait TypeCatalog {
    /// Facts about `ty`, or `None` if the id is foreign to this catalog.
    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo>;

    /// Look a type up by its display name.
    fn type_named(&self, name: &str) -> Option<TypeId>;

    /// Every externally listed member of `ty`, declared or inherited.
    fn members(&self, ty: TypeId) -> &[MemberDescriptor];

    /// The type every reference type is assignable to.
    fn root_type(&self) -> TypeId;

    /// The run-time type of string values.
    fn string_type(&self) -> TypeId;

    /// The wrapper type boxing `primitive`.
    fn boxed_type(&self, primitive: Primitive) -> TypeId;

    /// Perform the native call for a method or constructor.
    fn call(
        &self,
        member: &MemberDescriptor,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, CallFailure>;

    /// Read a field. `target` is `None` for static fields.
    fn read_field(&self, field: &MemberDescriptor, target: Option<&Value>) -> Result<Value, CallFailure>;

    /// Write a field. `target` is `None` for static fields.
    fn write_field(
        &self,
        field: &MemberDescriptor,
        target: Option<&Value>,
        value: Value,
    ) -> Result<(), CallFailure>;

    /// Members of `ty` with the given kind, name and static-ness.
    ///
    /// Constructors are unnamed; pass `None` to select them.
    fn members_named(
        &self,
        ty: TypeId,
        kind: MemberKind,
        name: Option<&str>,
        is_static: bool,
    ) -> Vec<&MemberDescriptor> {
        self.members(ty)
            .iter()
            .filter(|m| m.kind == kind && m.name.as_deref() == name && m.is_static == is_static)
            .collect()
    }

    fn supertype_of(&self, ty: TypeId) -> Option<TypeId> {
        self.type_info(ty).and_then(|info| info.supertype)
    }

    fn capabilities_of(&self, ty: TypeId) -> &[TypeId] {
        self.type_info(ty)
            .map(|info| info.capabilities.as_slice())
            .unwrap_or(&[])
    }

    fn is_visible(&self, ty: TypeId) -> bool {
        self.type_info(ty)
            .is_some_and(|info| info.visibility.is_public())
    }

    fn is_capability(&self, ty: TypeId) -> bool {
        self.type_info(ty).is_some_and(|info| info.is_capability)
    }

    fn type_name(&self, ty: TypeId) -> String {
        match self.type_info(ty) {
            Some(info) => info.name.clone(),
            None => format!("<unknown #{}>", ty.index),
        }
    }

    /// The primitive `ty` boxes, if it is a wrapper type.
    fn unboxed(&self, ty: TypeId) -> Option<Primitive> {
        self.type_info(ty).and_then(|info| info.boxes)
    }

    /// Whether a `sub` reference may be used where `sup` is expected.
    fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup || sup == self.root_type() {
            return true;
        }
        if self
            .capabilities_of(sub)
            .iter()
            .any(|&cap| self.is_subtype(cap, sup))
        {
            return true;
        }
        match self.supertype_of(sub) {
            Some(parent) => self.is_subtype(parent, sup),
            None => false,
        }
    }

    /// The run-time type tag of a value; `None` for null.
    fn runtime_type(&self, value: &Value) -> ArgType {
        let id = match value {
            Value::Null => return None,
            Value::Str(_) => self.string_type(),
            Value::Object(o) => o.ty,
            boxed => self.boxed_type(boxed.boxed_primitive()?),
        };
        Some(Type::Reference(id))
    }
}
