//! Optional memoization of resolution outcomes.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::member::MemberKind;
use crate::types::{ArgType, TypeId};

use super::outcome::MatchOutcome;

/// Everything a resolution outcome depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    pub ty: TypeId,
    pub kind: MemberKind,
    pub name: Option<String>,
    pub is_static: bool,
    pub arg_types: Vec<ArgType>,
}

/// A bounded outcome cache shared across threads.
///
/// Once `max_entries` outcomes are stored the cache stops admitting new
/// ones; existing entries stay valid for the catalog's lifetime.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<FxHashMap<ResolutionKey, MatchOutcome>>,
    max_entries: usize,
}

impl ResolutionCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            max_entries,
        }
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<MatchOutcome> {
        self.entries.read().get(key).cloned()
    }

    /// Store an outcome. Returns false if the cache is full.
    pub fn insert(&self, key: ResolutionKey, outcome: MatchOutcome) -> bool {
        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, outcome);
        true
    }

    /// Look `key` up, computing and storing the outcome on a miss.
    pub fn get_or_insert_with(
        &self,
        key: ResolutionKey,
        resolve: impl FnOnce() -> MatchOutcome,
    ) -> MatchOutcome {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let outcome = resolve();
        if !self.insert(key, outcome.clone()) {
            trace!("resolution cache full");
        }
        outcome
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
