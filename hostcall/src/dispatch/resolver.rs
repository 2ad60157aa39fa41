//! Candidate resolution.

use std::cmp::Ordering;

use crate::catalog::TypeCatalog;
use crate::member::MemberDescriptor;
use crate::types::ArgType;

use super::matcher::match_signature;
use super::outcome::MatchOutcome;
use super::specificity::{returns_narrower, subsumes};

/// An applicable candidate and its count of Exact positions.
#[derive(Debug, Clone, Copy)]
struct Applicable<'m> {
    member: &'m MemberDescriptor,
    exact: usize,
}

/// Resolves one call site against a candidate set.
pub struct CandidateResolver<'a, C: TypeCatalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: TypeCatalog + ?Sized> CandidateResolver<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Pick the unique best candidate for `arg_types`.
    ///
    /// Candidates of a different arity are ignored, so callers may pass
    /// every same-named member.
    pub fn resolve(&self, candidates: &[MemberDescriptor], arg_types: &[ArgType]) -> MatchOutcome {
        // Step 1: Filter to applicable members
        let applicable: Vec<_> = candidates
            .iter()
            .filter_map(|member| {
                let exact = match_signature(self.catalog, &member.params, arg_types)?;
                Some(Applicable { member, exact })
            })
            .collect();

        // Step 2: Trivial outcomes
        match applicable.len() {
            0 => return MatchOutcome::NoMatch,
            1 => return MatchOutcome::Unique(applicable[0].member.clone()),
            _ => {}
        }

        let applicable = self.collapse_duplicates(applicable);
        if let [only] = applicable.as_slice() {
            return MatchOutcome::Unique(only.member.clone());
        }

        // Step 3: Any full-exact match dominates
        let arity = arg_types.len();
        let full_exact: Vec<_> = applicable
            .iter()
            .copied()
            .filter(|c| c.exact == arity)
            .collect();
        if !full_exact.is_empty() {
            return self.settle_by_return(full_exact);
        }

        // Step 4: Keep what nothing is more specific than
        let maximal = maximal_by(applicable, |a, b| self.is_more_specific(a.member, b.member));
        if let [only] = maximal.as_slice() {
            return MatchOutcome::Unique(only.member.clone());
        }

        // Step 5: Identical lists split by return type
        let first = maximal[0].member;
        if maximal.iter().all(|c| c.member.params == first.params) {
            return self.settle_by_return(maximal);
        }

        MatchOutcome::Ambiguous(maximal.iter().map(|c| c.member.clone()).collect())
    }

    /// Check if a member is applicable to the given argument types.
    pub fn is_applicable(&self, member: &MemberDescriptor, arg_types: &[ArgType]) -> bool {
        match_signature(self.catalog, &member.params, arg_types).is_some()
    }

    /// Check if `a` is strictly more specific than `b`.
    pub fn is_more_specific(&self, a: &MemberDescriptor, b: &MemberDescriptor) -> bool {
        a.arity() == b.arity() && subsumes(self.catalog, &a.params, &b.params)
    }

    /// Compare the specificity of two members.
    ///
    /// Returns:
    /// - Ordering::Less if `a` is more specific
    /// - Ordering::Greater if `b` is more specific
    /// - Ordering::Equal if neither is (potential ambiguity)
    pub fn compare_specificity(&self, a: &MemberDescriptor, b: &MemberDescriptor) -> Ordering {
        match (self.is_more_specific(a, b), self.is_more_specific(b, a)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    /// Among candidates with identical parameter lists, the narrowest return
    /// type wins.
    fn settle_by_return(&self, tied: Vec<Applicable<'_>>) -> MatchOutcome {
        let narrowest = maximal_by(tied, |a, b| returns_narrower(self.catalog, a.member, b.member));
        match narrowest.as_slice() {
            [only] => MatchOutcome::Unique(only.member.clone()),
            _ => MatchOutcome::Ambiguous(narrowest.iter().map(|c| c.member.clone()).collect()),
        }
    }

    /// Members with identical parameters and return type are one callable
    /// seen through several declaring types. Keep one, preferring a visible
    /// declaring type.
    fn collapse_duplicates<'m>(&self, applicable: Vec<Applicable<'m>>) -> Vec<Applicable<'m>> {
        applicable.into_iter().fold(Vec::new(), |mut kept, candidate| {
            let twin = kept.iter_mut().find(|k: &&mut Applicable<'m>| {
                k.member.params == candidate.member.params && k.member.ret == candidate.member.ret
            });
            match twin {
                Some(twin) => {
                    if !self.catalog.is_visible(twin.member.declaring)
                        && self.catalog.is_visible(candidate.member.declaring)
                    {
                        *twin = candidate;
                    }
                }
                None => kept.push(candidate),
            }
            kept
        })
    }
}

/// Fold `items` into the elements no other element beats.
///
/// The accumulator is the running front of unbeaten items: a newcomer is
/// dropped if something in the front beats it, otherwise it evicts what it
/// beats and joins. For a transitive `beats` the front is the same set
/// whatever the input order; survivors keep their input order.
fn maximal_by<T: Copy>(items: impl IntoIterator<Item = T>, beats: impl Fn(&T, &T) -> bool) -> Vec<T> {
    items.into_iter().fold(Vec::new(), |mut front, item| {
        if front.iter().any(|kept| beats(kept, &item)) {
            return front;
        }
        front.retain(|kept| !beats(&item, kept));
        front.push(item);
        front
    })
}

#[cfg(test)]
mod tests {
    use super::maximal_by;

    #[test]
    fn test_maximal_by_keeps_unbeaten() {
        let front = maximal_by([3, 1, 4, 1, 5], |a, b| a > b);
        assert_eq!(front, vec![5]);
    }

    #[test]
    fn test_maximal_by_keeps_incomparable() {
        // Beats only within the same parity.
        let front = maximal_by([2, 3, 8, 5], |a: &i32, b: &i32| a % 2 == b % 2 && a > b);
        assert_eq!(front, vec![8, 5]);
    }

    #[test]
    fn test_maximal_by_empty() {
        let front: Vec<i32> = maximal_by(Vec::new(), |a, b| a > b);
        assert!(front.is_empty());
    }
}
