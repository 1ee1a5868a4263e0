//! Store adapter seam.
//!
//! The cache owns no persistence: it hands a [`FlagQuery`] to a
//! [`FlagStore`] implementation and gets back the matching flag
//! records. Backends (document store clients, fixtures, in-memory
//! stores for tests) implement this trait.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{FlagKind, FlagRecord};

/// A query descriptor: the kind tag plus optional extra equality
/// predicates merged in by the filter hook.
#[derive(Debug, Clone)]
pub struct FlagQuery {
    pub kind: FlagKind,
    pub predicate: Option<HashMap<String, serde_json::Value>>,
}

impl FlagQuery {
    pub fn for_kind(kind: FlagKind) -> Self {
        Self {
            kind,
            predicate: None,
        }
    }

    pub fn with_predicate(
        kind: FlagKind,
        predicate: Option<HashMap<String, serde_json::Value>>,
    ) -> Self {
        Self { kind, predicate }
    }
}

/// Backing-store client.
///
/// `find` is expected to be all-or-nothing: either the full result set
/// or an error, never a partial stream. Implementations must apply the
/// kind tag and every extra predicate as equality filters. Report a
/// query that executed and failed as
/// [`ErrorCode::StoreQueryFailed`](crate::ErrorCode::StoreQueryFailed)
/// and a backend that could not be reached at all as
/// [`ErrorCode::StoreUnavailable`](crate::ErrorCode::StoreUnavailable).
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn find(&self, query: &FlagQuery) -> Result<Vec<FlagRecord>>;
}
