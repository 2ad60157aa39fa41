//! Accessibility promotion.
//!
//! A member listed on a non-visible type cannot be called from outside even
//! when the member itself is public. Promotion swaps it for the same member
//! as declared on a visible capability or supertype.

use thiserror::Error;
use tracing::debug;

use crate::catalog::TypeCatalog;
use crate::member::{MemberDescriptor, MemberKind};
use crate::types::TypeId;

/// No visible declaration of the member exists anywhere up the hierarchy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Can't call public {kind} of non-public type: {member}")]
pub struct InaccessibleError {
    pub kind: MemberKind,
    /// Rendered signature of the member that could not be promoted.
    pub member: String,
}

/// Return `member` if its declaring type is visible, or an equivalent member
/// declared on a visible base of `on_type`.
pub fn promote<C: TypeCatalog + ?Sized>(
    catalog: &C,
    member: &MemberDescriptor,
    on_type: TypeId,
) -> Result<MemberDescriptor, InaccessibleError> {
    if catalog.is_visible(member.declaring) {
        return Ok(member.clone());
    }

    let promoted = match member.kind {
        MemberKind::Method => accessible_base(catalog, member, on_type),
        // Capabilities carry no constructors, so there is nothing to swap in.
        MemberKind::Constructor => None,
        MemberKind::Field => return Ok(member.clone()),
    };

    match promoted {
        Some(base) => {
            debug!(
                "promoted {} to {}",
                member.signature(catalog),
                catalog.type_name(base.declaring)
            );
            Ok(base.clone())
        }
        None => Err(InaccessibleError {
            kind: member.kind,
            member: member.signature(catalog),
        }),
    }
}

fn accessible_base<'c, C: TypeCatalog + ?Sized>(
    catalog: &'c C,
    member: &MemberDescriptor,
    ty: TypeId,
) -> Option<&'c MemberDescriptor> {
    let twin = |m: &MemberDescriptor| {
        m.kind == MemberKind::Method && m.is_static == member.is_static && m.same_signature(member)
    };

    for &capability in catalog.capabilities_of(ty) {
        if let Some(found) = catalog.members(capability).iter().find(|&m| twin(m)) {
            return Some(found);
        }
    }

    let supertype = catalog.supertype_of(ty)?;
    catalog
        .members(supertype)
        .iter()
        .find(|&m| twin(m) && catalog.is_visible(m.declaring))
        .or_else(|| accessible_base(catalog, member, supertype))
}
