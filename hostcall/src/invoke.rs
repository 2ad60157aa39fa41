//! The invocation shell.
//!
//! [`Dispatcher`] ties the pipeline together for one call site:
//!
//! 1. collect candidates from the catalog
//! 2. resolve them against the arguments' run-time types
//! 3. promote the winner to a visible declaration
//! 4. coerce the arguments
//! 5. call through the catalog and normalize the return value
//!
//! Failures of the callee itself surface as [`DispatchError::Callee`] carrying
//! the callee's original error; failures of the call mechanism surface as
//! [`DispatchError::ReflectiveCall`].

use tracing::{debug, trace};

use crate::catalog::{CallFailure, TypeCatalog};
use crate::coerce::{coerce, coerce_all};
use crate::config::Config;
use crate::dispatch::{promote, CandidateResolver, MatchOutcome, ResolutionCache, ResolutionKey};
use crate::error::{DispatchError, DispatchResult};
use crate::member::{MemberDescriptor, MemberKind};
use crate::types::{describe_arg_types, ArgType, Primitive, Type, TypeId};
use crate::value::Value;

/// What a field access or no-arg member lookup is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Target<'v> {
    /// A static member of this type.
    Type(TypeId),
    /// An instance member of this value's run-time type.
    Instance(&'v Value),
}

/// Dynamic call-site dispatch over a [`TypeCatalog`].
pub struct Dispatcher<'a, C: TypeCatalog + ?Sized> {
    catalog: &'a C,
    config: Config,
    cache: Option<ResolutionCache>,
}

impl<'a, C: TypeCatalog + ?Sized> Dispatcher<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self::with_config(catalog, Config::default())
    }

    pub fn with_config(catalog: &'a C, config: Config) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| ResolutionCache::new(config.cache.max_entries));
        Self {
            catalog,
            config,
            cache,
        }
    }

    pub fn catalog(&self) -> &'a C {
        self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolution cache, if enabled.
    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    /// Run-time types of `args`, `None` for nulls.
    pub fn arg_types(&self, args: &[Value]) -> Vec<ArgType> {
        args.iter().map(|arg| self.catalog.runtime_type(arg)).collect()
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call the instance method `name` on `target`.
    pub fn invoke_instance(&self, target: &Value, name: &str, args: &[Value]) -> DispatchResult<Value> {
        let ty = self.receiver_type(target, name)?;
        let arg_types = self.arg_types(args);
        let member = self.require_member(ty, MemberKind::Method, name, false, &arg_types)?;
        self.invoke_resolved(&member, Some(target), args)
    }

    /// Call the static method `name` on `ty`.
    ///
    /// `new` calls the constructor instead when `static_new_alias` is set.
    pub fn invoke_static(&self, ty: TypeId, name: &str, args: &[Value]) -> DispatchResult<Value> {
        if self.config.dispatch.static_new_alias && name == "new" {
            return self.invoke_constructor(ty, args);
        }
        let arg_types = self.arg_types(args);
        let member = self.require_member(ty, MemberKind::Method, name, true, &arg_types)?;
        self.invoke_resolved(&member, None, args)
    }

    /// [`invoke_static`](Self::invoke_static) on a type looked up by name.
    pub fn invoke_static_by_name(&self, type_name: &str, name: &str, args: &[Value]) -> DispatchResult<Value> {
        self.invoke_static(self.type_named(type_name)?, name, args)
    }

    pub fn invoke_constructor(&self, ty: TypeId, args: &[Value]) -> DispatchResult<Value> {
        let arg_types = self.arg_types(args);
        let member = self.require_member(ty, MemberKind::Constructor, "", true, &arg_types)?;
        self.invoke_resolved(&member, None, args)
    }

    /// Invoke an already resolved member: coerce, call, normalize.
    pub fn invoke_resolved(
        &self,
        member: &MemberDescriptor,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> DispatchResult<Value> {
        let coerced = coerce_all(self.catalog, &member.params, args)?;
        trace!("invoking {}", member.signature(self.catalog));
        match self.catalog.call(member, receiver, &coerced) {
            Ok(value) => Ok(self.normalize_return(&member.ret, value)),
            Err(failure) => Err(self.call_failure(member, failure)),
        }
    }

    /// Call a zero-argument method `name` on `target`, falling back to the
    /// instance field of that name. With `require_field` only the field is
    /// considered.
    pub fn invoke_no_arg_member(&self, target: &Value, name: &str, require_field: bool) -> DispatchResult<Value> {
        let ty = self.receiver_type(target, name)?;
        if !require_field {
            if let Some(method) = self.find_instance_method(ty, name, &[])? {
                return self.invoke_resolved(&method, Some(target), &[]);
            }
        }
        self.get_field(Target::Instance(target), name)
    }

    // ========================================================================
    // Fields
    // ========================================================================

    pub fn get_field(&self, target: Target<'_>, name: &str) -> DispatchResult<Value> {
        let (ty, receiver) = self.field_target(target, name)?;
        let field = self.require_field(ty, name, receiver.is_none())?;
        let value = self
            .catalog
            .read_field(&field, receiver)
            .map_err(|failure| self.call_failure(&field, failure))?;
        Ok(self.normalize_return(&field.ret, value))
    }

    /// Store `value` into the field, coerced to its type. Returns `value`
    /// as given.
    pub fn set_field(&self, target: Target<'_>, name: &str, value: Value) -> DispatchResult<Value> {
        let (ty, receiver) = self.field_target(target, name)?;
        let field = self.require_field(ty, name, receiver.is_none())?;
        let coerced = coerce(self.catalog, &value, &field.ret)?;
        self.catalog
            .write_field(&field, receiver, coerced)
            .map_err(|failure| self.call_failure(&field, failure))?;
        Ok(value)
    }

    pub fn get_static_field_by_name(&self, type_name: &str, name: &str) -> DispatchResult<Value> {
        self.get_field(Target::Type(self.type_named(type_name)?), name)
    }

    pub fn set_static_field_by_name(&self, type_name: &str, name: &str, value: Value) -> DispatchResult<Value> {
        self.set_field(Target::Type(self.type_named(type_name)?), name, value)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Resolve an instance method without calling it. `Ok(None)` when
    /// nothing matches.
    pub fn find_instance_method(
        &self,
        ty: TypeId,
        name: &str,
        arg_types: &[ArgType],
    ) -> DispatchResult<Option<MemberDescriptor>> {
        self.find_member(ty, MemberKind::Method, name, false, arg_types)
    }

    pub fn find_static_method(
        &self,
        ty: TypeId,
        name: &str,
        arg_types: &[ArgType],
    ) -> DispatchResult<Option<MemberDescriptor>> {
        self.find_member(ty, MemberKind::Method, name, true, arg_types)
    }

    pub fn find_constructor(&self, ty: TypeId, arg_types: &[ArgType]) -> DispatchResult<Option<MemberDescriptor>> {
        self.find_member(ty, MemberKind::Constructor, "", true, arg_types)
    }

    /// The first listed field of that name and static-ness.
    pub fn find_field(&self, ty: TypeId, name: &str, is_static: bool) -> Option<MemberDescriptor> {
        self.catalog
            .members_named(ty, MemberKind::Field, Some(name), is_static)
            .first()
            .map(|field| (*field).clone())
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Same-named members of `ty`. Bridge members only count when nothing
    /// else matches; capability types also expose the root type's instance
    /// methods.
    fn candidates(&self, ty: TypeId, kind: MemberKind, name: Option<&str>, is_static: bool) -> Vec<MemberDescriptor> {
        let (bridges, mut members): (Vec<_>, Vec<_>) = self
            .catalog
            .members_named(ty, kind, name, is_static)
            .into_iter()
            .partition(|m| m.is_bridge);
        if members.is_empty() {
            members = bridges;
        }

        if kind == MemberKind::Method
            && !is_static
            && self.config.dispatch.capability_root_members
            && self.catalog.is_capability(ty)
        {
            let root = self.catalog.root_type();
            members.extend(self.catalog.members_named(root, kind, name, false));
        }

        members.into_iter().cloned().collect()
    }

    fn resolve(
        &self,
        ty: TypeId,
        kind: MemberKind,
        name: Option<&str>,
        is_static: bool,
        arg_types: &[ArgType],
    ) -> MatchOutcome {
        let compute = || {
            let candidates = self.candidates(ty, kind, name, is_static);
            trace!(
                "resolving {} {} among {} candidates",
                kind,
                name.unwrap_or("new"),
                candidates.len()
            );
            CandidateResolver::new(self.catalog).resolve(&candidates, arg_types)
        };

        let Some(cache) = &self.cache else {
            return compute();
        };
        let key = ResolutionKey {
            ty,
            kind,
            name: name.map(str::to_string),
            is_static,
            arg_types: arg_types.to_vec(),
        };
        cache.get_or_insert_with(key, compute)
    }

    fn find_member(
        &self,
        ty: TypeId,
        kind: MemberKind,
        name: &str,
        is_static: bool,
        arg_types: &[ArgType],
    ) -> DispatchResult<Option<MemberDescriptor>> {
        let lookup = match kind {
            MemberKind::Constructor => None,
            MemberKind::Method | MemberKind::Field => Some(name),
        };
        match self.resolve(ty, kind, lookup, is_static, arg_types) {
            MatchOutcome::Unique(member) => Ok(Some(promote(self.catalog, &member, ty)?)),
            MatchOutcome::NoMatch => Ok(None),
            MatchOutcome::Ambiguous(tied) => {
                debug!("{} {} is ambiguous: {} candidates", kind, name, tied.len());
                Err(DispatchError::AmbiguousMember {
                    kind,
                    name: name.to_string(),
                    type_name: self.catalog.type_name(ty),
                    arg_types: describe_arg_types(self.catalog, arg_types),
                    candidates: tied.iter().map(|m| m.signature(self.catalog)).collect(),
                })
            }
        }
    }

    fn require_member(
        &self,
        ty: TypeId,
        kind: MemberKind,
        name: &str,
        is_static: bool,
        arg_types: &[ArgType],
    ) -> DispatchResult<MemberDescriptor> {
        self.find_member(ty, kind, name, is_static, arg_types)?
            .ok_or_else(|| DispatchError::NoMatchingMember {
                kind,
                name: name.to_string(),
                type_name: self.catalog.type_name(ty),
                arg_types: describe_arg_types(self.catalog, arg_types),
            })
    }

    fn require_field(&self, ty: TypeId, name: &str, is_static: bool) -> DispatchResult<MemberDescriptor> {
        let field = self
            .find_field(ty, name, is_static)
            .ok_or_else(|| DispatchError::NoSuchField {
                name: name.to_string(),
                type_name: self.catalog.type_name(ty),
            })?;
        Ok(promote(self.catalog, &field, ty)?)
    }

    fn type_named(&self, type_name: &str) -> DispatchResult<TypeId> {
        self.catalog
            .type_named(type_name)
            .ok_or_else(|| DispatchError::UnknownType(type_name.to_string()))
    }

    /// A static target carries no receiver.
    fn field_target<'v>(&self, target: Target<'v>, name: &str) -> DispatchResult<(TypeId, Option<&'v Value>)> {
        match target {
            Target::Type(ty) => Ok((ty, None)),
            Target::Instance(value) => Ok((self.receiver_type(value, name)?, Some(value))),
        }
    }

    fn receiver_type(&self, target: &Value, name: &str) -> DispatchResult<TypeId> {
        match self.catalog.runtime_type(target) {
            Some(Type::Reference(ty)) => Ok(ty),
            _ => Err(DispatchError::NullTarget {
                name: name.to_string(),
            }),
        }
    }

    fn call_failure(&self, member: &MemberDescriptor, failure: CallFailure) -> DispatchError {
        match failure {
            CallFailure::Raised(err) => {
                debug!("{} raised: {}", member.signature(self.catalog), err);
                DispatchError::Callee(err)
            }
            CallFailure::Mechanism(message) => {
                debug!("call to {} failed: {}", member.signature(self.catalog), message);
                DispatchError::ReflectiveCall {
                    member: member.signature(self.catalog),
                    message,
                }
            }
        }
    }

    /// Void returns become null; boolean returns become the canonical
    /// boxed booleans.
    fn normalize_return(&self, ret: &Type, value: Value) -> Value {
        let is_boolean = match ret {
            Type::Void => return Value::Null,
            Type::Primitive(p) => *p == Primitive::Boolean,
            Type::Reference(id) => self.catalog.unboxed(*id) == Some(Primitive::Boolean),
        };
        match value.as_bool() {
            Some(true) if is_boolean => Value::TRUE,
            Some(false) if is_boolean => Value::FALSE,
            _ => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemberDecl, Registry, RegistryBuilder, TypeDecl};
    use crate::value::Object;

    fn registry() -> Registry {
        let mut b = RegistryBuilder::new();
        let string = Type::reference(b.prelude().string);

        let named = b.add_type(TypeDecl::capability("Named")).unwrap();
        b.add_member(named, MemberDecl::method("name").returns(string));

        let pet = b.add_type(TypeDecl::class("Pet").implements(named)).unwrap();
        b.add_member(
            pet,
            MemberDecl::method("name")
                .returns(string)
                .native(|_, _| Ok(Value::str("rex"))),
        );
        b.add_member(
            pet,
            MemberDecl::method("isHungry")
                .returns(Type::boolean())
                .native(|_, _| Ok(Value::Boolean(true))),
        );
        b.add_member(pet, MemberDecl::method("feed").native(|_, _| Ok(Value::Int(99))));
        b.add_member(
            pet,
            MemberDecl::method("legacy")
                .returns(Type::int())
                .bridge()
                .native(|_, _| Ok(Value::Int(1))),
        );
        b.add_member(pet, MemberDecl::field("age", Type::long()));
        b.build()
    }

    fn pet(reg: &Registry) -> Value {
        let ty = reg.type_named("Pet").unwrap();
        Value::object(Object::new(ty))
    }

    #[test]
    fn test_void_return_is_null() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        assert_eq!(dispatcher.invoke_instance(&pet(&reg), "feed", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_boolean_return_is_canonical() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        assert_eq!(dispatcher.invoke_instance(&pet(&reg), "isHungry", &[]).unwrap(), Value::TRUE);
    }

    #[test]
    fn test_bridge_used_when_alone() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        assert_eq!(dispatcher.invoke_instance(&pet(&reg), "legacy", &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_capability_sees_root_members() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        let named = reg.type_named("Named").unwrap();
        let found = dispatcher
            .find_instance_method(named, "toString", &[])
            .unwrap()
            .unwrap();
        assert_eq!(found.declaring, reg.root_type());

        let mut config = Config::default();
        config.dispatch.capability_root_members = false;
        let strict = Dispatcher::with_config(&reg, config);
        assert_eq!(strict.find_instance_method(named, "toString", &[]).unwrap(), None);
    }

    #[test]
    fn test_no_arg_member_falls_back_to_field() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        let target = pet(&reg);

        dispatcher
            .set_field(Target::Instance(&target), "age", Value::Int(3))
            .unwrap();
        assert_eq!(dispatcher.invoke_no_arg_member(&target, "age", false).unwrap(), Value::Long(3));
        assert_eq!(dispatcher.invoke_no_arg_member(&target, "name", false).unwrap(), Value::str("rex"));
        assert!(matches!(
            dispatcher.invoke_no_arg_member(&target, "name", true),
            Err(DispatchError::NoSuchField { .. })
        ));
    }

    #[test]
    fn test_null_receiver() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        assert!(matches!(
            dispatcher.invoke_instance(&Value::Null, "name", &[]),
            Err(DispatchError::NullTarget { .. })
        ));
    }

    #[test]
    fn test_set_field_coerces_but_returns_input() {
        let reg = registry();
        let dispatcher = Dispatcher::new(&reg);
        let target = pet(&reg);

        let returned = dispatcher
            .set_field(Target::Instance(&target), "age", Value::Int(7))
            .unwrap();
        assert_eq!(returned, Value::Int(7));
        assert_eq!(dispatcher.get_field(Target::Instance(&target), "age").unwrap(), Value::Long(7));
        assert!(matches!(
            dispatcher.set_field(Target::Instance(&target), "age", Value::str("old")),
            Err(DispatchError::Coercion(_))
        ));
    }
}
