//! The "more specific" partial order over applicable candidates.

use crate::catalog::TypeCatalog;
use crate::member::MemberDescriptor;
use crate::types::Type;

use super::matcher::is_assignable;

/// Whether parameter list `a` is strictly more specific than `b`.
///
/// Every position must be identical, or `a`'s a reference where `b`'s is a
/// primitive, or `b`'s assignable from `a`'s; at least one position must
/// differ. Presumes equal lengths.
pub fn subsumes<C: TypeCatalog + ?Sized>(catalog: &C, a: &[Type], b: &[Type]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    let mut better = false;
    for (pa, pb) in a.iter().zip(b) {
        if pa == pb {
            continue;
        }
        if (!pa.is_primitive() && pb.is_primitive()) || is_assignable(catalog, pb, pa) {
            better = true;
        } else {
            return false;
        }
    }
    better
}

/// Whether `a`'s return type is strictly narrower than `b`'s.
pub fn returns_narrower<C: TypeCatalog + ?Sized>(
    catalog: &C,
    a: &MemberDescriptor,
    b: &MemberDescriptor,
) -> bool {
    a.ret != b.ret && is_assignable(catalog, &b.ret, &a.ret)
}

/// Whether `lhs` can stand in for `rhs`: same name, declared on a visible
/// type, and every `lhs` parameter accepts the corresponding `rhs` one.
pub fn signature_covers<C: TypeCatalog + ?Sized>(
    catalog: &C,
    lhs: &MemberDescriptor,
    rhs: &MemberDescriptor,
) -> bool {
    if lhs.name != rhs.name || !catalog.is_visible(lhs.declaring) {
        return false;
    }
    lhs.arity() == rhs.arity()
        && lhs
            .params
            .iter()
            .zip(&rhs.params)
            .all(|(l, r)| is_assignable(catalog, l, r))
}
