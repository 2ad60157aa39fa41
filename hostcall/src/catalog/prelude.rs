//! Host types every registry starts with.
//!
//! The root type, strings, the abstract number type and one wrapper per
//! primitive. Their ids are fixed by registration order, see
//! [`Prelude::LAYOUT`].

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use thiserror::Error;

use crate::types::{Primitive, Type, TypeId};
use crate::value::{Object, Value};

use super::registry::{MemberDecl, RegistryBuilder, TypeDecl};
use super::CallFailure;

/// Raised by the `parse*` and `valueOf(String)` natives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("For input string: \"{input}\"")]
pub struct NumberFormatError {
    pub input: String,
}

/// Ids of the prelude types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    pub root: TypeId,
    pub string: TypeId,
    pub number: TypeId,
    boxed: [TypeId; 8],
}

impl Prelude {
    pub(crate) const LAYOUT: Prelude = Prelude {
        root: TypeId::new(0),
        string: TypeId::new(1),
        number: TypeId::new(2),
        boxed: [
            TypeId::new(3),
            TypeId::new(4),
            TypeId::new(5),
            TypeId::new(6),
            TypeId::new(7),
            TypeId::new(8),
            TypeId::new(9),
            TypeId::new(10),
        ],
    };

    /// The wrapper type boxing `primitive`.
    pub fn boxed(&self, primitive: Primitive) -> TypeId {
        self.boxed[primitive as usize]
    }
}

fn wrapper_name(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Boolean => "Boolean",
        Primitive::Char => "Character",
        Primitive::Byte => "Byte",
        Primitive::Short => "Short",
        Primitive::Int => "Integer",
        Primitive::Long => "Long",
        Primitive::Float => "Float",
        Primitive::Double => "Double",
    }
}

pub(super) fn install(b: &mut RegistryBuilder) {
    let layout = Prelude::LAYOUT;

    let root = b.push_type(TypeDecl::class("Object"));
    let string = b.push_type(TypeDecl::class("String"));
    let number = b.push_type(TypeDecl::class("Number"));
    debug_assert_eq!((root, string, number), (layout.root, layout.string, layout.number));

    for primitive in Primitive::ALL {
        let parent = if primitive.is_numeric() { number } else { root };
        let id = b.push_type(
            TypeDecl::class(wrapper_name(primitive))
                .extends(parent)
                .boxing(primitive),
        );
        debug_assert_eq!(id, layout.boxed(primitive));
    }

    install_root(b, &layout);
    install_string(b, &layout);
    install_number(b, &layout);
    for primitive in Primitive::ALL {
        install_wrapper(b, &layout, primitive);
    }
}

fn install_root(b: &mut RegistryBuilder, layout: &Prelude) {
    let root = layout.root;
    let string = Type::reference(layout.string);

    b.add_member(
        root,
        MemberDecl::constructor().native(move |_, _| Ok(Value::object(Object::new(root)))),
    );
    b.add_member(
        root,
        MemberDecl::method("toString")
            .returns(string)
            .native(|recv, _| Ok(recv.map_or(Value::Null, |r| Value::str(r.to_string())))),
    );
    b.add_member(
        root,
        MemberDecl::method("hashCode")
            .returns(Type::int())
            .native(|recv, _| Ok(Value::Int(recv.map_or(0, host_hash)))),
    );
    b.add_member(
        root,
        MemberDecl::method("equals")
            .params([Type::reference(root)])
            .returns(Type::boolean())
            .native(|recv, args| Ok(Value::from(recv.is_some_and(|r| *r == args[0])))),
    );
}

fn install_string(b: &mut RegistryBuilder, layout: &Prelude) {
    let string_id = layout.string;
    let string = Type::reference(string_id);

    b.add_member(
        string_id,
        MemberDecl::method("length")
            .returns(Type::int())
            .native(|recv, _| {
                let s = receiver_str(recv)?;
                Ok(Value::Int(s.encode_utf16().count() as i32))
            }),
    );
    b.add_member(
        string_id,
        MemberDecl::method("isEmpty")
            .returns(Type::boolean())
            .native(|recv, _| Ok(Value::from(receiver_str(recv)?.is_empty()))),
    );
    b.add_member(
        string_id,
        MemberDecl::method("concat")
            .params([string])
            .returns(string)
            .native(|recv, args| {
                let head = receiver_str(recv)?;
                match &args[0] {
                    Value::Str(tail) => Ok(Value::str(format!("{}{}", head, tail))),
                    Value::Null => Err(CallFailure::raised(NullArgument("concat"))),
                    other => Err(CallFailure::mechanism(format!("expected a string, got {:?}", other))),
                }
            }),
    );

    // String.valueOf overloads
    let render = |_: Option<&Value>, args: &[Value]| Ok(Value::str(args[0].to_string()));
    for param in [
        Type::reference(layout.root),
        Type::boolean(),
        Type::char(),
        Type::int(),
        Type::long(),
        Type::float(),
        Type::double(),
    ] {
        b.add_member(
            string_id,
            MemberDecl::method("valueOf")
                .params([param])
                .returns(string)
                .static_member()
                .native(render),
        );
    }
}

fn install_number(b: &mut RegistryBuilder, layout: &Prelude) {
    let number = layout.number;

    b.add_member(
        number,
        MemberDecl::method("intValue")
            .returns(Type::int())
            .native(|recv, _| Ok(Value::Int(receiver_number(recv)?.to_i64().unwrap_or(0) as i32))),
    );
    b.add_member(
        number,
        MemberDecl::method("longValue")
            .returns(Type::long())
            .native(|recv, _| Ok(Value::Long(receiver_number(recv)?.to_i64().unwrap_or(0)))),
    );
    b.add_member(
        number,
        MemberDecl::method("doubleValue")
            .returns(Type::double())
            .native(|recv, _| Ok(Value::Double(receiver_number(recv)?.to_f64().unwrap_or(0.0)))),
    );
}

fn install_wrapper(b: &mut RegistryBuilder, layout: &Prelude, primitive: Primitive) {
    let wrapper_id = layout.boxed(primitive);
    let wrapper = Type::reference(wrapper_id);
    let unboxed = Type::Primitive(primitive);
    let string = Type::reference(layout.string);

    // valueOf(primitive) boxes; the coerced argument already is the box.
    b.add_member(
        wrapper_id,
        MemberDecl::method("valueOf")
            .params([unboxed])
            .returns(wrapper)
            .static_member()
            .native(|_, args| Ok(args[0].clone())),
    );

    if let Some((extremes, parse_name)) = numeric_facts(primitive) {
        let (max, min) = extremes;
        b.add_member(
            wrapper_id,
            MemberDecl::field("MAX_VALUE", unboxed).static_member().initial(max),
        );
        b.add_member(
            wrapper_id,
            MemberDecl::field("MIN_VALUE", unboxed).static_member().initial(min),
        );
        add_parsers(b, wrapper_id, wrapper, unboxed, string, primitive, parse_name);
    }

    match primitive {
        Primitive::Boolean => {
            b.add_member(
                wrapper_id,
                MemberDecl::field("TRUE", wrapper).static_member().initial(Value::TRUE),
            );
            b.add_member(
                wrapper_id,
                MemberDecl::field("FALSE", wrapper).static_member().initial(Value::FALSE),
            );
            b.add_member(
                wrapper_id,
                MemberDecl::method("booleanValue")
                    .returns(Type::boolean())
                    .native(|recv, _| match recv {
                        Some(Value::Boolean(v)) => Ok(Value::from(*v)),
                        _ => Err(CallFailure::mechanism("receiver is not a boolean")),
                    }),
            );
            add_parsers(b, wrapper_id, wrapper, unboxed, string, primitive, "parseBoolean");
        }
        Primitive::Char => {
            b.add_member(
                wrapper_id,
                MemberDecl::method("charValue")
                    .returns(Type::char())
                    .native(|recv, _| match recv {
                        Some(Value::Char(c)) => Ok(Value::Char(*c)),
                        _ => Err(CallFailure::mechanism("receiver is not a character")),
                    }),
            );
            b.add_member(
                wrapper_id,
                MemberDecl::method("isDigit")
                    .params([Type::char()])
                    .returns(Type::boolean())
                    .static_member()
                    .native(|_, args| match &args[0] {
                        Value::Char(c) => Ok(Value::from(c.is_ascii_digit())),
                        _ => Err(CallFailure::mechanism("expected a character")),
                    }),
            );
        }
        _ => {}
    }
}

/// `MAX_VALUE`/`MIN_VALUE` and the parse method name of a numeric wrapper.
fn numeric_facts(primitive: Primitive) -> Option<((Value, Value), &'static str)> {
    Some(match primitive {
        Primitive::Byte => ((Value::Byte(i8::MAX), Value::Byte(i8::MIN)), "parseByte"),
        Primitive::Short => ((Value::Short(i16::MAX), Value::Short(i16::MIN)), "parseShort"),
        Primitive::Int => ((Value::Int(i32::MAX), Value::Int(i32::MIN)), "parseInt"),
        Primitive::Long => ((Value::Long(i64::MAX), Value::Long(i64::MIN)), "parseLong"),
        // Floating MIN_VALUE is the smallest positive subnormal.
        Primitive::Float => (
            (Value::Float(f32::MAX), Value::Float(f32::from_bits(1))),
            "parseFloat",
        ),
        Primitive::Double => (
            (Value::Double(f64::MAX), Value::Double(f64::from_bits(1))),
            "parseDouble",
        ),
        Primitive::Boolean | Primitive::Char => return None,
    })
}

/// `parseX(String)` returning the primitive and `valueOf(String)` returning
/// the wrapper.
fn add_parsers(
    b: &mut RegistryBuilder,
    wrapper_id: TypeId,
    wrapper: Type,
    unboxed: Type,
    string: Type,
    primitive: Primitive,
    parse_name: &'static str,
) {
    let parse: fn(&str) -> Option<Value> = match primitive {
        Primitive::Byte => |s| s.parse::<i8>().ok().map(Value::Byte),
        Primitive::Short => |s| s.parse::<i16>().ok().map(Value::Short),
        Primitive::Int => |s| s.parse::<i32>().ok().map(Value::Int),
        Primitive::Long => |s| s.parse::<i64>().ok().map(Value::Long),
        Primitive::Float => |s| s.trim().parse::<f32>().ok().map(Value::Float),
        Primitive::Double => |s| s.trim().parse::<f64>().ok().map(Value::Double),
        Primitive::Boolean => |s| Some(Value::from(s.eq_ignore_ascii_case("true"))),
        Primitive::Char => return,
    };
    let native = move |_: Option<&Value>, args: &[Value]| match &args[0] {
        Value::Str(s) => parse(s).ok_or_else(|| {
            CallFailure::raised(NumberFormatError {
                input: s.to_string(),
            })
        }),
        // parseBoolean(null) is false; numeric parsers reject null.
        Value::Null if primitive == Primitive::Boolean => Ok(Value::FALSE),
        Value::Null => Err(CallFailure::raised(NumberFormatError {
            input: "null".to_string(),
        })),
        other => Err(CallFailure::mechanism(format!("expected a string, got {:?}", other))),
    };

    b.add_member(
        wrapper_id,
        MemberDecl::method(parse_name)
            .params([string])
            .returns(unboxed)
            .static_member()
            .native(native),
    );
    b.add_member(
        wrapper_id,
        MemberDecl::method("valueOf")
            .params([string])
            .returns(wrapper)
            .static_member()
            .native(native),
    );
}

/// Raised when a native receives null where it needs a value.
#[derive(Debug, Clone, Error)]
#[error("null argument to {0}")]
struct NullArgument(&'static str);

fn receiver_str(recv: Option<&Value>) -> Result<Arc<str>, CallFailure> {
    match recv {
        Some(Value::Str(s)) => Ok(s.clone()),
        _ => Err(CallFailure::mechanism("receiver is not a string")),
    }
}

fn receiver_number(recv: Option<&Value>) -> Result<&Value, CallFailure> {
    match recv {
        Some(v) if v.is_number() => Ok(v),
        _ => Err(CallFailure::mechanism("receiver is not a number")),
    }
}

/// Host hash codes: wrappers and strings hash by value the way the host
/// does, objects by identity.
fn host_hash(value: &Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Boolean(true) => 1231,
        Value::Boolean(false) => 1237,
        Value::Char(c) => *c as i32,
        Value::Byte(v) => *v as i32,
        Value::Short(v) => *v as i32,
        Value::Int(v) => *v,
        Value::Long(v) => (*v ^ ((*v as u64) >> 32) as i64) as i32,
        Value::Float(v) => v.to_bits() as i32,
        Value::Double(v) => {
            let bits = v.to_bits();
            (bits ^ (bits >> 32)) as i32
        }
        Value::Str(s) => s
            .encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32)),
        Value::Object(o) => {
            let mut hasher = FxHasher::default();
            (Arc::as_ptr(o) as usize).hash(&mut hasher);
            hasher.finish() as i32
        }
    }
}
