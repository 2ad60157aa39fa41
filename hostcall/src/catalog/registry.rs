//! In-crate catalog populated by explicit registration.
//!
//! Hosts without run-time reflection describe their types up front: each type
//! through a [`TypeDecl`], each member through a [`MemberDecl`] carrying the
//! native closure that performs the call. [`RegistryBuilder::build`] freezes
//! the tables and merges inherited members into every type's listing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

use crate::member::{MemberDescriptor, MemberId, MemberKind, Visibility};
use crate::types::{Primitive, Type, TypeId};
use crate::value::Value;

use super::prelude::{self, Prelude};
use super::{CallFailure, TypeCatalog, TypeInfo};

/// A native entry point: receiver (absent for static members and
/// constructors) and already-coerced arguments.
pub type NativeFn = Arc<dyn Fn(Option<&Value>, &[Value]) -> Result<Value, CallFailure> + Send + Sync>;

/// Declaration of a catalog type.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    name: String,
    visibility: Visibility,
    is_capability: bool,
    supertype: Option<TypeId>,
    capabilities: Vec<TypeId>,
    boxes: Option<Primitive>,
}

impl TypeDecl {
    /// A concrete type. Without [`extends`](Self::extends) it derives from
    /// the root type.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_capability: false,
            supertype: None,
            capabilities: Vec::new(),
            boxes: None,
        }
    }

    /// A capability (interface) type.
    pub fn capability(name: impl Into<String>) -> Self {
        Self {
            is_capability: true,
            ..Self::class(name)
        }
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn extends(mut self, parent: TypeId) -> Self {
        self.supertype = Some(parent);
        self
    }

    pub fn implements(mut self, capability: TypeId) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub(crate) fn boxing(mut self, primitive: Primitive) -> Self {
        self.boxes = Some(primitive);
        self
    }
}

/// Declaration of a method, constructor or field.
#[derive(Clone)]
pub struct MemberDecl {
    kind: MemberKind,
    name: Option<String>,
    params: Vec<Type>,
    ret: Type,
    is_static: bool,
    is_bridge: bool,
    visibility: Visibility,
    native: Option<NativeFn>,
    initial: Value,
}

impl MemberDecl {
    /// An instance method returning `void` until [`returns`](Self::returns).
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Method,
            name: Some(name.into()),
            params: Vec::new(),
            ret: Type::Void,
            is_static: false,
            is_bridge: false,
            visibility: Visibility::Public,
            native: None,
            initial: Value::Null,
        }
    }

    pub fn constructor() -> Self {
        Self {
            kind: MemberKind::Constructor,
            name: None,
            is_static: true,
            ..Self::method("")
        }
    }

    pub fn field(name: impl Into<String>, ty: Type) -> Self {
        Self {
            kind: MemberKind::Field,
            ret: ty,
            ..Self::method(name)
        }
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Type>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn returns(mut self, ret: Type) -> Self {
        self.ret = ret;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn bridge(mut self) -> Self {
        self.is_bridge = true;
        self
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn native<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> Result<Value, CallFailure> + Send + Sync + 'static,
    {
        self.native = Some(Arc::new(f));
        self
    }

    /// Initial value of a static field.
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = value;
        self
    }
}

impl fmt::Debug for MemberDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDecl")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .field("is_static", &self.is_static)
            .field("has_native", &self.native.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors raised while declaring types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A supertype or capability that was not registered before the type
    /// naming it.
    #[error("{ty} refers to unregistered type #{reference}")]
    UnknownType { ty: String, reference: u32 },
}

/// Collects declarations for a [`Registry`].
pub struct RegistryBuilder {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<String, TypeId>,
    own: Vec<Vec<MemberId>>,
    members: Vec<MemberDescriptor>,
    natives: FxHashMap<MemberId, NativeFn>,
    statics: FxHashMap<MemberId, Value>,
    prelude: Prelude,
}

impl RegistryBuilder {
    /// A builder with the prelude types already registered.
    pub fn new() -> Self {
        let mut builder = Self {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            own: Vec::new(),
            members: Vec::new(),
            natives: FxHashMap::default(),
            statics: FxHashMap::default(),
            prelude: Prelude::LAYOUT,
        };
        prelude::install(&mut builder);
        builder
    }

    pub fn prelude(&self) -> &Prelude {
        &self.prelude
    }

    /// Register a type. Supertypes and capabilities must already exist, so
    /// the type graph stays acyclic.
    pub fn add_type(&mut self, decl: TypeDecl) -> Result<TypeId, RegistryError> {
        let registered = self.types.len();
        let dangling = decl
            .supertype
            .into_iter()
            .chain(decl.capabilities.iter().copied())
            .find(|r| r.index as usize >= registered);
        if let Some(reference) = dangling {
            return Err(RegistryError::UnknownType {
                ty: decl.name,
                reference: reference.index,
            });
        }
        Ok(self.push_type(decl))
    }

    pub(super) fn push_type(&mut self, decl: TypeDecl) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        // The first registered type is the root; other classes default to it.
        let supertype = match decl.supertype {
            Some(parent) => Some(parent),
            None if decl.is_capability || self.types.is_empty() => None,
            None => Some(self.prelude.root),
        };
        self.by_name.insert(decl.name.clone(), id);
        self.types.push(TypeInfo {
            id,
            name: decl.name,
            visibility: decl.visibility,
            is_capability: decl.is_capability,
            supertype,
            capabilities: decl.capabilities,
            boxes: decl.boxes,
        });
        self.own.push(Vec::new());
        id
    }

    /// Register a member declared on `on`.
    pub fn add_member(&mut self, on: TypeId, decl: MemberDecl) -> MemberId {
        let id = MemberId::new(self.members.len() as u32);
        let (params, ret) = match decl.kind {
            MemberKind::Constructor => (decl.params, Type::Reference(on)),
            MemberKind::Method => (decl.params, decl.ret),
            MemberKind::Field => (Vec::new(), decl.ret),
        };
        self.members.push(MemberDescriptor {
            id,
            kind: decl.kind,
            name: decl.name,
            params,
            ret,
            declaring: on,
            visibility: decl.visibility,
            is_static: decl.is_static,
            is_bridge: decl.is_bridge,
        });
        if let Some(native) = decl.native {
            self.natives.insert(id, native);
        }
        if decl.kind == MemberKind::Field && decl.is_static {
            self.statics.insert(id, decl.initial);
        }
        if let Some(own) = self.own.get_mut(on.index as usize) {
            own.push(id);
        }
        id
    }

    /// Freeze the tables and compute every type's member listing.
    pub fn build(self) -> Registry {
        let mut listed: Vec<Vec<MemberDescriptor>> = Vec::with_capacity(self.types.len());

        for (info, own) in self.types.iter().zip(&self.own) {
            let mut list: Vec<MemberDescriptor> = own
                .iter()
                .map(|id| &self.members[id.index as usize])
                .filter(|m| m.visibility.is_public())
                .cloned()
                .collect();

            let sources = info
                .supertype
                .map(|s| (s, false))
                .into_iter()
                .chain(info.capabilities.iter().map(|&c| (c, true)));

            for (source, from_capability) in sources {
                // Sources are registered before their subtypes.
                let Some(inherited) = listed.get(source.index as usize) else {
                    continue;
                };
                for member in inherited {
                    if !is_inherited(member, from_capability) {
                        continue;
                    }
                    if list.iter().any(|m| hides(m, member)) {
                        continue;
                    }
                    list.push(member.clone());
                }
            }

            trace!("listed {} members for {}", list.len(), info.name);
            listed.push(list);
        }

        Registry {
            types: self.types,
            by_name: self.by_name,
            own: self.own,
            members: self.members,
            listed,
            natives: self.natives,
            statics: RwLock::new(self.statics),
            prelude: self.prelude,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Constructors are never inherited; static methods do not flow out of
/// capabilities.
fn is_inherited(member: &MemberDescriptor, from_capability: bool) -> bool {
    match member.kind {
        MemberKind::Constructor => false,
        MemberKind::Method => !(from_capability && member.is_static),
        MemberKind::Field => true,
    }
}

/// A nearer member hides an inherited one with the same shape. Differing
/// return types (covariant overrides) keep both listed.
fn hides(nearer: &MemberDescriptor, inherited: &MemberDescriptor) -> bool {
    nearer.kind == inherited.kind
        && nearer.is_static == inherited.is_static
        && nearer.same_signature(inherited)
        && nearer.ret == inherited.ret
}

/// A frozen catalog.
pub struct Registry {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<String, TypeId>,
    own: Vec<Vec<MemberId>>,
    members: Vec<MemberDescriptor>,
    listed: Vec<Vec<MemberDescriptor>>,
    natives: FxHashMap<MemberId, NativeFn>,
    statics: RwLock<FxHashMap<MemberId, Value>>,
    prelude: Prelude,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn prelude(&self) -> &Prelude {
        &self.prelude
    }

    /// Look up any registered member, listed or not.
    pub fn member(&self, id: MemberId) -> Option<&MemberDescriptor> {
        self.members.get(id.index as usize)
    }

    /// Members declared directly on `ty`, including non-public ones.
    pub fn declared_members(&self, ty: TypeId) -> impl Iterator<Item = &MemberDescriptor> {
        self.own
            .get(ty.index as usize)
            .into_iter()
            .flatten()
            .filter_map(|id| self.member(*id))
    }

    fn native(&self, member: &MemberDescriptor, id: MemberId) -> Result<&NativeFn, CallFailure> {
        self.natives.get(&id).ok_or_else(|| {
            CallFailure::mechanism(format!("{} has no implementation", member.signature(self)))
        })
    }

    /// Find the body to run for an instance method on a receiver of `ty`:
    /// the class chain first, then default bodies on capabilities.
    fn implementation(&self, ty: TypeId, member: &MemberDescriptor) -> Option<MemberId> {
        let mut cursor = Some(ty);
        while let Some(current) = cursor {
            if let Some(id) = self.declared_body(current, member) {
                return Some(id);
            }
            cursor = self.supertype_of(current);
        }

        let mut cursor = Some(ty);
        while let Some(current) = cursor {
            for &capability in self.capabilities_of(current) {
                if let Some(id) = self.capability_body(capability, member) {
                    return Some(id);
                }
            }
            cursor = self.supertype_of(current);
        }
        None
    }

    fn capability_body(&self, capability: TypeId, member: &MemberDescriptor) -> Option<MemberId> {
        self.declared_body(capability, member).or_else(|| {
            self.capabilities_of(capability)
                .iter()
                .find_map(|&parent| self.capability_body(parent, member))
        })
    }

    fn declared_body(&self, ty: TypeId, member: &MemberDescriptor) -> Option<MemberId> {
        self.declared_members(ty)
            .find(|m| {
                m.kind == MemberKind::Method
                    && !m.is_static
                    && m.same_signature(member)
                    && self.natives.contains_key(&m.id)
            })
            .map(|m| m.id)
    }

    fn instance_of(&self, target: &Value, declaring: TypeId) -> Result<(), CallFailure> {
        match self.runtime_type(target) {
            Some(Type::Reference(ty)) if self.is_subtype(ty, declaring) => Ok(()),
            Some(_) => Err(CallFailure::mechanism(format!(
                "object is not an instance of declaring type {}",
                self.type_name(declaring)
            ))),
            None => Err(CallFailure::mechanism("null receiver")),
        }
    }
}

impl TypeCatalog for Registry {
    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo> {
        self.types.get(ty.index as usize)
    }

    fn type_named(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn members(&self, ty: TypeId) -> &[MemberDescriptor] {
        self.listed
            .get(ty.index as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn root_type(&self) -> TypeId {
        self.prelude.root
    }

    fn string_type(&self) -> TypeId {
        self.prelude.string
    }

    fn boxed_type(&self, primitive: Primitive) -> TypeId {
        self.prelude.boxed(primitive)
    }

    fn call(
        &self,
        member: &MemberDescriptor,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, CallFailure> {
        if args.len() != member.arity() {
            return Err(CallFailure::mechanism(format!(
                "wrong number of arguments for {}: expected {}, got {}",
                member.signature(self),
                member.arity(),
                args.len()
            )));
        }
        match member.kind {
            MemberKind::Field => Err(CallFailure::mechanism(format!(
                "{} is a field, not a callable member",
                member.signature(self)
            ))),
            MemberKind::Constructor => (self.native(member, member.id)?)(None, args),
            MemberKind::Method if member.is_static => (self.native(member, member.id)?)(None, args),
            MemberKind::Method => {
                let receiver = receiver.ok_or_else(|| {
                    CallFailure::mechanism(format!(
                        "{} requires a receiver",
                        member.signature(self)
                    ))
                })?;
                self.instance_of(receiver, member.declaring)?;
                let body = match self.runtime_type(receiver) {
                    Some(Type::Reference(ty)) => self.implementation(ty, member),
                    _ => None,
                };
                (self.native(member, body.unwrap_or(member.id))?)(Some(receiver), args)
            }
        }
    }

    fn read_field(&self, field: &MemberDescriptor, target: Option<&Value>) -> Result<Value, CallFailure> {
        if field.is_static {
            return Ok(self
                .statics
                .read()
                .get(&field.id)
                .cloned()
                .unwrap_or(Value::Null));
        }
        let target = target.ok_or_else(|| CallFailure::mechanism("instance field read without a target"))?;
        self.instance_of(target, field.declaring)?;
        match target {
            Value::Object(obj) => Ok(obj.field(field.display_name())),
            _ => Err(CallFailure::mechanism(format!(
                "{} has no instance field storage",
                target
            ))),
        }
    }

    fn write_field(
        &self,
        field: &MemberDescriptor,
        target: Option<&Value>,
        value: Value,
    ) -> Result<(), CallFailure> {
        if field.is_static {
            self.statics.write().insert(field.id, value);
            return Ok(());
        }
        let target = target.ok_or_else(|| CallFailure::mechanism("instance field write without a target"))?;
        self.instance_of(target, field.declaring)?;
        match target {
            Value::Object(obj) => {
                obj.set_field(field.display_name(), value);
                Ok(())
            }
            _ => Err(CallFailure::mechanism(format!(
                "{} has no instance field storage",
                target
            ))),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.len())
            .field("members", &self.members.len())
            .field("natives", &self.natives.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    fn shapes() -> (Registry, TypeId, TypeId, TypeId) {
        let mut b = RegistryBuilder::new();
        let sized = b.add_type(TypeDecl::capability("Sized")).unwrap();
        b.add_member(sized, MemberDecl::method("size").returns(Type::int()));
        let shape = b.add_type(TypeDecl::class("Shape").implements(sized)).unwrap();
        b.add_member(
            shape,
            MemberDecl::method("size")
                .returns(Type::int())
                .native(|_, _| Ok(Value::Int(1))),
        );
        b.add_member(shape, MemberDecl::field("label", Type::reference(b.prelude().string)));
        let square = b.add_type(TypeDecl::class("Square").extends(shape)).unwrap();
        b.add_member(
            square,
            MemberDecl::method("size")
                .returns(Type::int())
                .native(|_, _| Ok(Value::Int(4))),
        );
        b.add_member(square, MemberDecl::constructor().native(|_, _| Ok(Value::Null)));
        (b.build(), sized, shape, square)
    }

    #[test]
    fn test_classes_default_to_root() {
        let (reg, sized, shape, square) = shapes();
        assert_eq!(reg.supertype_of(shape), Some(reg.root_type()));
        assert_eq!(reg.supertype_of(square), Some(shape));
        assert_eq!(reg.supertype_of(sized), None);
        assert_eq!(reg.supertype_of(reg.root_type()), None);
    }

    #[test]
    fn test_subtyping_walks_capabilities() {
        let (reg, sized, shape, square) = shapes();
        assert!(reg.is_subtype(square, sized));
        assert!(reg.is_subtype(square, shape));
        assert!(reg.is_subtype(sized, reg.root_type()));
        assert!(!reg.is_subtype(shape, square));
    }

    #[test]
    fn test_overrides_hide_inherited_members() {
        let (reg, _, _, square) = shapes();
        let sizes = reg.members_named(square, MemberKind::Method, Some("size"), false);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].declaring, square);
    }

    #[test]
    fn test_constructors_are_not_inherited() {
        let (reg, _, shape, square) = shapes();
        assert_eq!(reg.members_named(square, MemberKind::Constructor, None, true).len(), 1);
        assert!(reg.members_named(shape, MemberKind::Constructor, None, true).is_empty());
    }

    #[test]
    fn test_fields_are_inherited() {
        let (reg, _, shape, square) = shapes();
        let label = reg.members_named(square, MemberKind::Field, Some("label"), false);
        assert_eq!(label.len(), 1);
        assert_eq!(label[0].declaring, shape);
    }

    #[test]
    fn test_instance_calls_dispatch_on_receiver() {
        let (reg, sized, _, square) = shapes();
        let abstract_size = reg.members_named(sized, MemberKind::Method, Some("size"), false)[0].clone();
        let receiver = Value::object(Object::new(square));
        let result = reg.call(&abstract_size, Some(&receiver), &[]);
        assert!(matches!(result, Ok(Value::Int(4))));
    }

    #[test]
    fn test_call_checks_receiver_type() {
        let (reg, _, _, square) = shapes();
        let size = reg.members_named(square, MemberKind::Method, Some("size"), false)[0].clone();
        let wrong = Value::str("not a square");
        assert!(matches!(reg.call(&size, Some(&wrong), &[]), Err(CallFailure::Mechanism(_))));
        assert!(matches!(reg.call(&size, None, &[]), Err(CallFailure::Mechanism(_))));
    }

    #[test]
    fn test_abstract_member_without_body_is_mechanism_failure() {
        let (reg, sized, _, _) = shapes();
        let abstract_size = reg.members_named(sized, MemberKind::Method, Some("size"), false)[0].clone();
        let stranger = Value::object(Object::new(reg.root_type()));
        // Root does not implement Sized, so the receiver check fails first.
        assert!(matches!(
            reg.call(&abstract_size, Some(&stranger), &[]),
            Err(CallFailure::Mechanism(_))
        ));
    }

    #[test]
    fn test_instance_field_round_trip() {
        let (reg, _, _, square) = shapes();
        let label = reg.members_named(square, MemberKind::Field, Some("label"), false)[0].clone();
        let obj = Value::object(Object::new(square));
        assert_eq!(reg.read_field(&label, Some(&obj)).ok(), Some(Value::Null));
        reg.write_field(&label, Some(&obj), Value::str("sq")).ok();
        assert_eq!(reg.read_field(&label, Some(&obj)).ok(), Some(Value::str("sq")));
    }

    #[test]
    fn test_self_supertype_is_rejected() {
        let mut b = RegistryBuilder::new();
        let next = TypeId::new(b.prelude().boxed(Primitive::Double).index + 1);
        let err = b.add_type(TypeDecl::class("Loop").extends(next)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownType {
                ty: "Loop".to_string(),
                reference: next.index,
            }
        );
        // Nothing was registered, so the id is still free.
        let fresh = b.add_type(TypeDecl::class("Fresh")).unwrap();
        assert_eq!(fresh, next);
        let reg = b.build();
        assert_eq!(reg.type_named("Loop"), None);
        assert!(!reg.is_subtype(fresh, reg.string_type()));
    }

    #[test]
    fn test_forward_capability_is_rejected() {
        let mut b = RegistryBuilder::new();
        let later = TypeId::new(1000);
        let err = b.add_type(TypeDecl::class("Early").implements(later)).unwrap_err();
        assert_eq!(err.to_string(), "Early refers to unregistered type #1000");
    }

    #[test]
    fn test_type_lookup_by_name() {
        let (reg, _, shape, _) = shapes();
        assert_eq!(reg.type_named("Shape"), Some(shape));
        assert_eq!(reg.type_named("Integer"), Some(reg.boxed_type(Primitive::Int)));
        assert_eq!(reg.type_named("Nope"), None);
    }
}
