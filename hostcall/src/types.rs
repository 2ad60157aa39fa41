//! Type tags used by resolution.
//!
//! A [`Type`] is the semantic tag of a parameter, return value or argument.
//! Primitive kinds are distinguished from reference kinds; every reference
//! kind carries the [`TypeId`] of a catalog type so assignability can be
//! checked against the catalog's supertype and capability graph.

use std::fmt;

use crate::catalog::TypeCatalog;

/// Identity of a type registered in a [`TypeCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId {
    /// Index into the owning catalog's type table.
    pub index: u32,
}

impl TypeId {
    /// Create a type id from a raw index.
    pub const fn new(index: u32) -> Self {
        Self { index }
    }
}

/// Primitive value kinds of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    /// Every primitive kind, in declaration order.
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Char,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    /// The host spelling of this primitive.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Whether this primitive is one of the numeric kinds.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Boolean | Primitive::Char)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter, return or argument type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value (return position only).
    Void,
    /// An unboxed primitive.
    Primitive(Primitive),
    /// A reference to a catalog type.
    Reference(TypeId),
}

impl Type {
    pub const fn boolean() -> Self {
        Type::Primitive(Primitive::Boolean)
    }

    pub const fn char() -> Self {
        Type::Primitive(Primitive::Char)
    }

    pub const fn byte() -> Self {
        Type::Primitive(Primitive::Byte)
    }

    pub const fn short() -> Self {
        Type::Primitive(Primitive::Short)
    }

    pub const fn int() -> Self {
        Type::Primitive(Primitive::Int)
    }

    pub const fn long() -> Self {
        Type::Primitive(Primitive::Long)
    }

    pub const fn float() -> Self {
        Type::Primitive(Primitive::Float)
    }

    pub const fn double() -> Self {
        Type::Primitive(Primitive::Double)
    }

    pub const fn reference(id: TypeId) -> Self {
        Type::Reference(id)
    }

    /// Primitive in the host sense: `void` counts, references do not.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_) | Type::Void)
    }

    /// The primitive kind, if this is an unboxed primitive.
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// The referenced type, if this is a reference.
    pub fn as_reference(&self) -> Option<TypeId> {
        match self {
            Type::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

/// Run-time type of one call argument. `None` means the argument was null.
pub type ArgType = Option<Type>;

/// Render a type using the catalog's names.
pub fn type_name<C: TypeCatalog + ?Sized>(catalog: &C, ty: &Type) -> String {
    match ty {
        Type::Void => "void".to_string(),
        Type::Primitive(p) => p.name().to_string(),
        Type::Reference(id) => catalog.type_name(*id),
    }
}

/// Render an argument type vector as `int,String,null`.
pub fn describe_arg_types<C: TypeCatalog + ?Sized>(catalog: &C, arg_types: &[ArgType]) -> String {
    arg_types
        .iter()
        .map(|arg| match arg {
            Some(ty) => type_name(catalog, ty),
            None => "null".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a parameter list as `(int, String)`.
pub fn describe_params<C: TypeCatalog + ?Sized>(catalog: &C, params: &[Type]) -> String {
    let rendered: Vec<_> = params.iter().map(|p| type_name(catalog, p)).collect();
    format!("({})", rendered.join(", "))
}
