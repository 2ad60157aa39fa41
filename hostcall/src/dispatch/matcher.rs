//! Per-position applicability.

use crate::catalog::TypeCatalog;
use crate::types::{ArgType, Primitive, Type};

/// How one argument type fits one parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMatch {
    /// The argument type is the parameter type.
    Exact,
    /// Accepted through assignability, boxing or the widening table.
    Compatible,
    Incompatible,
}

impl ParamMatch {
    pub fn is_applicable(self) -> bool {
        self != ParamMatch::Incompatible
    }
}

/// Classify an argument type against a parameter type.
pub fn applicable<C: TypeCatalog + ?Sized>(catalog: &C, param: &Type, arg: &ArgType) -> ParamMatch {
    let Some(arg) = arg else {
        // Null fits any reference.
        return if param.is_primitive() {
            ParamMatch::Incompatible
        } else {
            ParamMatch::Compatible
        };
    };

    if param == arg {
        return ParamMatch::Exact;
    }

    let fits = match param {
        Type::Primitive(p) => widens(catalog, *p, arg),
        Type::Reference(_) => is_assignable(catalog, param, arg),
        Type::Void => false,
    };
    if fits {
        ParamMatch::Compatible
    } else {
        ParamMatch::Incompatible
    }
}

/// Whether a primitive parameter accepts `arg` through the host's fixed
/// table of primitive and boxed sources.
///
/// `int` accepts `long` and `Long`: integral arguments usually arrive as
/// longs.
pub fn widens<C: TypeCatalog + ?Sized>(catalog: &C, param: Primitive, arg: &Type) -> bool {
    use Primitive::*;

    let (primitive_sources, boxed_sources): (&[Primitive], &[Primitive]) = match param {
        Int => (&[Long, Short, Byte], &[Int, Long]),
        Long => (&[Int, Short, Byte], &[Long]),
        Float => (&[Double], &[Float]),
        Double => (&[Float], &[Double]),
        Char => (&[], &[Char]),
        Short => (&[], &[Short]),
        Byte => (&[], &[Byte]),
        Boolean => (&[], &[Boolean]),
    };

    match arg {
        Type::Primitive(p) => primitive_sources.contains(p),
        Type::Reference(id) => catalog
            .unboxed(*id)
            .is_some_and(|boxed| boxed_sources.contains(&boxed)),
        Type::Void => false,
    }
}

/// Whether a value of type `from` may be stored where `to` is declared.
/// Primitives are only assignable to themselves.
pub fn is_assignable<C: TypeCatalog + ?Sized>(catalog: &C, to: &Type, from: &Type) -> bool {
    match (to, from) {
        _ if to == from => true,
        (Type::Reference(to), Type::Reference(from)) => catalog.is_subtype(*from, *to),
        _ => false,
    }
}

/// Match a whole parameter list. Returns the number of Exact positions when
/// every position is applicable.
pub fn match_signature<C: TypeCatalog + ?Sized>(
    catalog: &C,
    params: &[Type],
    arg_types: &[ArgType],
) -> Option<usize> {
    if params.len() != arg_types.len() {
        return None;
    }
    params
        .iter()
        .zip(arg_types)
        .try_fold(0, |exact, (param, arg)| match applicable(catalog, param, arg) {
            ParamMatch::Exact => Some(exact + 1),
            ParamMatch::Compatible => Some(exact),
            ParamMatch::Incompatible => None,
        })
}
