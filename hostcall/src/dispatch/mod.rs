//! Run-time overload resolution.
//!
//! This module selects which catalog member a dynamically typed call site
//! should reach, given only the member name and the run-time types of the
//! arguments.
//!
//! # Algorithm Overview
//!
//! 1. **Collect candidates**: members with matching kind, name and static-ness
//! 2. **Filter applicable**: same arity, every argument Exact or Compatible
//! 3. **Prefer full-exact**: an all-Exact candidate dominates the rest
//! 4. **Order by specificity**: keep only candidates nothing beats
//! 5. **Split identical lists by return type**: the narrower return wins
//! 6. **Promote**: swap a member of a non-visible type for a visible twin
//!
//! # Module Structure
//!
//! - [`matcher`] - per-position applicability and the widening table
//! - [`specificity`] - the "more specific" partial order
//! - [`outcome`] - resolution outcome
//! - [`resolver`] - the resolution algorithm
//! - [`promote`] - accessibility promotion
//! - [`cache`] - optional memoization of outcomes

mod cache;
mod matcher;
mod outcome;
mod promote;
mod resolver;
mod specificity;


pub use cache::{ResolutionCache, ResolutionKey};

pub use matcher::{applicable, is_assignable, match_signature, widens, ParamMatch};

pub use outcome::MatchOutcome;

pub use promote::{promote, InaccessibleError};

pub use resolver::CandidateResolver;

pub use specificity::{returns_narrower, signature_covers, subsumes};
