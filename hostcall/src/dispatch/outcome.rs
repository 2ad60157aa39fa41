//! Resolution outcome.

use crate::member::MemberDescriptor;

/// Result of candidate resolution.
///
/// Not-found and ambiguous are ordinary outcomes of a dynamic call site, so
/// they are variants here rather than errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A unique best member was found.
    Unique(MemberDescriptor),
    /// No candidate accepts the argument types.
    NoMatch,
    /// Two or more candidates tie; all of them, in catalog order.
    Ambiguous(Vec<MemberDescriptor>),
}

impl MatchOutcome {
    /// The winning member, if resolution succeeded.
    pub fn unique(&self) -> Option<&MemberDescriptor> {
        match self {
            MatchOutcome::Unique(member) => Some(member),
            _ => None,
        }
    }
}
