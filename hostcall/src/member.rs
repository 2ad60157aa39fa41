//! Member descriptors.

use std::fmt;

use crate::catalog::TypeCatalog;
use crate::types::{describe_params, type_name, Type, TypeId};

/// Identity of a member within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId {
    pub index: u32,
}

impl MemberId {
    pub const fn new(index: u32) -> Self {
        Self { index }
    }
}

/// What kind of callable a member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberKind::Method => "method",
            MemberKind::Constructor => "constructor",
            MemberKind::Field => "field",
        })
    }
}

/// Whether a type or member can be reached by external callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    NonPublic,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

/// A callable member of a catalog type.
///
/// Descriptors are immutable and owned by the catalog; resolution only reads
/// and clones them.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescriptor {
    /// The member's identity in its catalog.
    pub id: MemberId,
    /// Method, constructor or field.
    pub kind: MemberKind,
    /// The member's name. Constructors have none.
    pub name: Option<String>,
    /// Parameter types. Empty for fields.
    pub params: Vec<Type>,
    /// Return type. Constructors return their declaring type, fields their
    /// field type.
    pub ret: Type,
    /// The type that declares this member.
    pub declaring: TypeId,
    /// The member's own visibility.
    pub visibility: Visibility,
    /// Whether the member is accessed without a receiver.
    pub is_static: bool,
    /// Compiler-generated forwarding member.
    pub is_bridge: bool,
}

impl MemberDescriptor {
    /// The member's name, or `"new"` for constructors.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("new")
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Same name and identical parameter list.
    pub fn same_signature(&self, other: &MemberDescriptor) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// Render as `String Greeter.greet(String)`.
    pub fn signature<C: TypeCatalog + ?Sized>(&self, catalog: &C) -> String {
        let owner = catalog.type_name(self.declaring);
        let params = describe_params(catalog, &self.params);
        match self.kind {
            MemberKind::Constructor => format!("{}{}", owner, params),
            MemberKind::Method => format!(
                "{}{} {}.{}{}",
                if self.is_static { "static " } else { "" },
                type_name(catalog, &self.ret),
                owner,
                self.display_name(),
                params
            ),
            MemberKind::Field => format!(
                "{}{} {}.{}",
                if self.is_static { "static " } else { "" },
                type_name(catalog, &self.ret),
                owner,
                self.display_name()
            ),
        }
    }
}
