use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{FlagKind, FlagValue};

/// The in-memory flag map, keyed by `(kind, id)`.
///
/// This is the single source of truth for reads. The same id may exist
/// under both kinds without collision. Reads never block on I/O and
/// never trigger a load; a miss resolves to the caller's fallback.
///
/// The table is mutated only by the fast loader (once) and the dynamic
/// refresher (each cycle). Entries the store stops returning are left
/// in place; [`clear_dynamic`](FlagTable::clear_dynamic) is the explicit
/// out-of-band clear for store deletions.
#[derive(Clone, Default)]
pub struct FlagTable {
    entries: Arc<RwLock<HashMap<(FlagKind, String), FlagValue>>>,
}

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `(fast, id)`, falling back silently on a miss.
    pub fn read_fast(&self, id: &str, fallback: impl Into<FlagValue>) -> FlagValue {
        self.get(FlagKind::Fast, id).unwrap_or_else(|| fallback.into())
    }

    /// Look up `(dynamic, id)`, falling back silently on a miss.
    pub fn read_dynamic(&self, id: &str, fallback: impl Into<FlagValue>) -> FlagValue {
        self.get(FlagKind::Dynamic, id)
            .unwrap_or_else(|| fallback.into())
    }

    pub fn get(&self, kind: FlagKind, id: &str) -> Option<FlagValue> {
        self.entries.read().get(&(kind, id.to_string())).cloned()
    }

    /// Overwrite an entry, returning the previously cached value.
    ///
    /// The returned value is the diffing primitive: `None` means first
    /// sighting, `Some(prev)` lets the refresher compare old vs. new.
    pub fn insert(&self, kind: FlagKind, id: impl Into<String>, value: FlagValue) -> Option<FlagValue> {
        self.entries.write().insert((kind, id.into()), value)
    }

    pub fn contains(&self, kind: FlagKind, id: &str) -> bool {
        self.entries.read().contains_key(&(kind, id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every dynamic entry.
    ///
    /// Refresh cycles never evict ids the store stopped returning, so
    /// store deletions require this explicit clear followed by a refresh.
    pub fn clear_dynamic(&self) {
        self.entries
            .write()
            .retain(|(kind, _), _| *kind != FlagKind::Dynamic);
    }

    /// Snapshot of one partition, for diagnostics.
    pub fn snapshot(&self, kind: FlagKind) -> HashMap<String, FlagValue> {
        self.entries
            .read()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), value)| (id.clone(), value.clone()))
            .collect()
    }
}
