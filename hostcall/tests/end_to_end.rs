//! End-to-end dispatch through the registry and prelude.

use pretty_assertions::assert_eq;

use hostcall::{
    Config, DispatchError, Dispatcher, MemberDecl, MemberKind, NumberFormatError, Object, Primitive, Registry,
    Target, Type, TypeCatalog, TypeDecl, Value,
};

/// Prelude plus a few host types:
///
/// - `Point(int, int)` with instance fields `x` and `y`
/// - `Counter` with a static `long count`
/// - `Greeter` capability implemented by the non-public `HiddenGreeter`
/// - `Shape` capability with an abstract `area`, implemented by `Blob`
///   without a body
/// - `Pair` with two crossed constructors
fn registry() -> Registry {
    let mut b = Registry::builder();
    let object = Type::reference(b.prelude().root);
    let string = Type::reference(b.prelude().string);

    let point = b.add_type(TypeDecl::class("Point")).unwrap();
    b.add_member(point, MemberDecl::field("x", Type::int()));
    b.add_member(point, MemberDecl::field("y", Type::int()));
    b.add_member(
        point,
        MemberDecl::constructor()
            .params([Type::int(), Type::int()])
            .native(move |_, args| {
                let obj = Object::new(point);
                obj.set_field("x", args[0].clone());
                obj.set_field("y", args[1].clone());
                Ok(Value::object(obj))
            }),
    );

    let counter = b.add_type(TypeDecl::class("Counter")).unwrap();
    b.add_member(
        counter,
        MemberDecl::field("count", Type::long())
            .static_member()
            .initial(Value::Long(0)),
    );

    let greeter = b.add_type(TypeDecl::capability("Greeter")).unwrap();
    b.add_member(greeter, MemberDecl::method("greet").returns(string));
    let hidden = b.add_type(TypeDecl::class("HiddenGreeter").implements(greeter).non_public()).unwrap();
    b.add_member(
        hidden,
        MemberDecl::method("greet")
            .returns(string)
            .native(|_, _| Ok(Value::str("hi"))),
    );
    b.add_member(hidden, MemberDecl::method("secret").native(|_, _| Ok(Value::Null)));

    let shape = b.add_type(TypeDecl::capability("Shape")).unwrap();
    b.add_member(shape, MemberDecl::method("area").returns(Type::double()));
    b.add_type(TypeDecl::class("Blob").implements(shape)).unwrap();

    let pair = b.add_type(TypeDecl::class("Pair")).unwrap();
    for params in [[string, object], [object, string]] {
        b.add_member(
            pair,
            MemberDecl::constructor()
                .params(params)
                .native(move |_, _| Ok(Value::object(Object::new(pair)))),
        );
    }

    b.build()
}

fn instance(reg: &Registry, type_name: &str) -> Value {
    let ty = reg.type_named(type_name).unwrap();
    Value::object(Object::new(ty))
}

#[test]
fn test_integer_value_of() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let integer = reg.boxed_type(Primitive::Int);

    assert_eq!(dispatcher.invoke_static(integer, "valueOf", &[Value::Int(5)]).unwrap(), Value::Int(5));
    // int accepts a boxed long and narrows it.
    assert_eq!(dispatcher.invoke_static(integer, "valueOf", &[Value::Long(7)]).unwrap(), Value::Int(7));
    assert_eq!(
        dispatcher.invoke_static(integer, "valueOf", &[Value::str("12")]).unwrap(),
        Value::Int(12)
    );
}

#[test]
fn test_unknown_member() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);

    let err = dispatcher
        .invoke_static_by_name("Integer", "frobnicate", &[Value::str("x")])
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoMatchingMember { kind: MemberKind::Method, .. }));
    assert_eq!(
        err.to_string(),
        "No matching frobnicate method found in Integer for argtypes: String"
    );
}

#[test]
fn test_unknown_type() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    assert!(matches!(
        dispatcher.invoke_static_by_name("Nope", "valueOf", &[]),
        Err(DispatchError::UnknownType(name)) if name == "Nope"
    ));
}

#[test]
fn test_callee_error_passes_through() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);

    let err = dispatcher
        .invoke_static_by_name("Integer", "parseInt", &[Value::str("abc")])
        .unwrap_err();
    let callee = err.callee().expect("callee error");
    assert_eq!(
        callee.downcast_ref::<NumberFormatError>(),
        Some(&NumberFormatError {
            input: "abc".to_string()
        })
    );
    assert_eq!(err.to_string(), "For input string: \"abc\"");
}

#[test]
fn test_callee_error_from_instance_method() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let err = dispatcher
        .invoke_instance(&Value::str("a"), "concat", &[Value::Null])
        .unwrap_err();
    assert!(matches!(err, DispatchError::Callee(_)));
}

#[test]
fn test_string_value_of_overloads() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let string = reg.string_type();

    for (arg, expected) in [
        (Value::Int(5), "5"),
        (Value::TRUE, "true"),
        (Value::Char('q'), "q"),
        (Value::Double(1.5), "1.5"),
        (Value::Double(f64::INFINITY), "Infinity"),
        (Value::Double(f64::NEG_INFINITY), "-Infinity"),
        (Value::Null, "null"),
    ] {
        assert_eq!(dispatcher.invoke_static(string, "valueOf", &[arg]).unwrap(), Value::str(expected));
    }
}

#[test]
fn test_string_instance_methods() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let s = Value::str("héllo");

    assert_eq!(dispatcher.invoke_instance(&s, "length", &[]).unwrap(), Value::Int(5));
    // Length counts UTF-16 units, so a supplementary character counts twice.
    let clef = Value::str("\u{1D11E}");
    assert_eq!(dispatcher.invoke_instance(&clef, "length", &[]).unwrap(), Value::Int(2));
    assert_eq!(dispatcher.invoke_instance(&s, "isEmpty", &[]).unwrap(), Value::FALSE);
    assert_eq!(
        dispatcher.invoke_instance(&s, "concat", &[Value::str("!")]).unwrap(),
        Value::str("héllo!")
    );
    // Inherited from the root type.
    assert_eq!(dispatcher.invoke_instance(&s, "equals", &[Value::str("héllo")]).unwrap(), Value::TRUE);
}

#[test]
fn test_number_methods_on_wrappers() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    assert_eq!(dispatcher.invoke_instance(&Value::Double(2.9), "intValue", &[]).unwrap(), Value::Int(2));
    assert_eq!(dispatcher.invoke_instance(&Value::Int(-4), "longValue", &[]).unwrap(), Value::Long(-4));
}

#[test]
fn test_static_fields() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let integer = reg.boxed_type(Primitive::Int);
    let boolean = reg.boxed_type(Primitive::Boolean);

    assert_eq!(
        dispatcher.get_field(Target::Type(integer), "MAX_VALUE").unwrap(),
        Value::Int(i32::MAX)
    );
    assert_eq!(dispatcher.get_field(Target::Type(boolean), "TRUE").unwrap(), Value::TRUE);

    let counter = reg.type_named("Counter").unwrap();
    let returned = dispatcher
        .set_field(Target::Type(counter), "count", Value::Int(4))
        .unwrap();
    assert_eq!(returned, Value::Int(4));
    assert_eq!(dispatcher.get_field(Target::Type(counter), "count").unwrap(), Value::Long(4));

    let err = dispatcher.get_field(Target::Type(counter), "missing").unwrap_err();
    assert_eq!(err.to_string(), "No missing field found in Counter");
}

#[test]
fn test_static_fields_by_type_name() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);

    assert_eq!(
        dispatcher.get_static_field_by_name("Long", "MIN_VALUE").unwrap(),
        Value::Long(i64::MIN)
    );
    dispatcher
        .set_static_field_by_name("Counter", "count", Value::Short(9))
        .unwrap();
    assert_eq!(dispatcher.get_static_field_by_name("Counter", "count").unwrap(), Value::Long(9));

    let err = dispatcher.get_static_field_by_name("Nope", "count").unwrap_err();
    assert!(matches!(err, DispatchError::UnknownType(ref name) if name == "Nope"));
    assert!(matches!(
        dispatcher.set_static_field_by_name("Nope", "count", Value::Int(1)),
        Err(DispatchError::UnknownType(_))
    ));
}

#[test]
fn test_new_routes_to_constructor() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let point = reg.type_named("Point").unwrap();

    let p = dispatcher
        .invoke_static(point, "new", &[Value::Int(1), Value::Long(2)])
        .unwrap();
    assert_eq!(reg.runtime_type(&p), Some(Type::reference(point)));
    assert_eq!(dispatcher.get_field(Target::Instance(&p), "x").unwrap(), Value::Int(1));
    // Coerced to the parameter's int on the way in.
    assert_eq!(dispatcher.get_field(Target::Instance(&p), "y").unwrap(), Value::Int(2));

    let mut config = Config::default();
    config.dispatch.static_new_alias = false;
    let plain = Dispatcher::with_config(&reg, config);
    assert!(matches!(
        plain.invoke_static(point, "new", &[Value::Int(1), Value::Int(2)]),
        Err(DispatchError::NoMatchingMember { .. })
    ));
}

#[test]
fn test_ambiguous_constructors() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let pair = reg.type_named("Pair").unwrap();

    let err = dispatcher
        .invoke_constructor(pair, &[Value::str("a"), Value::str("b")])
        .unwrap_err();
    match &err {
        DispatchError::AmbiguousMember { kind, candidates, .. } => {
            assert_eq!(*kind, MemberKind::Constructor);
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("Expected AmbiguousMember, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Found multiple constructors in Pair for argtypes: String,String");

    // One side narrower resolves.
    let made = dispatcher.invoke_constructor(pair, &[Value::str("a"), Value::Int(1)]);
    assert!(made.is_ok());
}

#[test]
fn test_promotion_to_visible_capability() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let target = instance(&reg, "HiddenGreeter");
    let hidden = reg.type_named("HiddenGreeter").unwrap();

    let greet = dispatcher.find_instance_method(hidden, "greet", &[]).unwrap().unwrap();
    assert_eq!(greet.declaring, reg.type_named("Greeter").unwrap());
    assert_eq!(dispatcher.invoke_instance(&target, "greet", &[]).unwrap(), Value::str("hi"));

    let err = dispatcher.invoke_instance(&target, "secret", &[]).unwrap_err();
    assert!(matches!(err, DispatchError::Inaccessible(_)));
}

#[test]
fn test_abstract_member_is_mechanism_failure() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let blob = instance(&reg, "Blob");

    let err = dispatcher.invoke_instance(&blob, "area", &[]).unwrap_err();
    assert!(matches!(err, DispatchError::ReflectiveCall { .. }));
    assert!(err.callee().is_none());
}

#[test]
fn test_invoke_resolved_coerces_arguments() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let long = reg.boxed_type(Primitive::Long);
    let arg_types = dispatcher.arg_types(&[Value::Int(3)]);
    assert_eq!(arg_types, vec![Some(Type::reference(reg.boxed_type(Primitive::Int)))]);

    // Long.valueOf(long) does not accept a boxed int, only valueOf(String)
    // is left and that does not match either.
    assert_eq!(dispatcher.find_static_method(long, "valueOf", &arg_types).unwrap(), None);

    let value_of = dispatcher
        .find_static_method(long, "valueOf", &[Some(Type::int())])
        .unwrap()
        .unwrap();
    assert_eq!(dispatcher.invoke_resolved(&value_of, None, &[Value::Int(3)]).unwrap(), Value::Long(3));
    assert!(matches!(
        dispatcher.invoke_resolved(&value_of, None, &[Value::str("3")]),
        Err(DispatchError::Coercion(_))
    ));
}

#[test]
fn test_no_arg_member() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    let point = reg.type_named("Point").unwrap();
    let p = dispatcher.invoke_constructor(point, &[Value::Int(3), Value::Int(4)]).unwrap();

    assert_eq!(dispatcher.invoke_no_arg_member(&p, "x", false).unwrap(), Value::Int(3));
    assert_eq!(dispatcher.invoke_no_arg_member(&p, "y", true).unwrap(), Value::Int(4));
    assert!(matches!(
        dispatcher.invoke_no_arg_member(&p, "z", false),
        Err(DispatchError::NoSuchField { .. })
    ));
}

#[test]
fn test_cache_from_config() {
    let reg = registry();
    let config = Config::from_toml_str("[cache]\nenabled = true\nmax_entries = 8\n").unwrap();
    let dispatcher = Dispatcher::with_config(&reg, config);
    let integer = reg.boxed_type(Primitive::Int);

    for _ in 0..3 {
        assert_eq!(dispatcher.invoke_static(integer, "valueOf", &[Value::Int(5)]).unwrap(), Value::Int(5));
    }
    let cache = dispatcher.cache().expect("cache enabled");
    assert_eq!(cache.len(), 1);

    dispatcher.invoke_static(integer, "valueOf", &[Value::str("5")]).unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cache_disabled_by_default() {
    let reg = registry();
    let dispatcher = Dispatcher::new(&reg);
    assert!(dispatcher.cache().is_none());
}

#[test]
fn test_shared_across_threads() {
    let reg = registry();
    let dispatcher = Dispatcher::with_config(&reg, Config::new().with_cache(64));
    let integer = reg.boxed_type(Primitive::Int);

    std::thread::scope(|scope| {
        for i in 0..4 {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                let got = dispatcher.invoke_static(integer, "valueOf", &[Value::Int(i)]).unwrap();
                assert_eq!(got, Value::Int(i));
            });
        }
    });
}
