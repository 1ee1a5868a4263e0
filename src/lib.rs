//! In-memory feature-flag cache in front of a document store.
//!
//! Two flag kinds are served: *fast* flags, loaded once and immutable
//! for the process lifetime, and *dynamic* flags, refreshed on a timer
//! with change notifications emitted whenever a value differs from its
//! previously cached one. The refresh interval is itself readable from
//! a reserved dynamic flag, so the cache can retime its own polling at
//! runtime when that is enabled.
//!
//! The backing store is an external collaborator behind the
//! [`FlagStore`] trait: given a kind tag and optional extra equality
//! predicates, it returns the matching flag records.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use flagcache::{FlagCacheClient, FlagCacheOptions, FlagStore};
//!
//! async fn run(store: Arc<dyn FlagStore>) -> flagcache::Result<()> {
//!     let options = FlagCacheOptions::builder()
//!         .refresh_rate_ms(30_000)
//!         .self_reconfigure(true)
//!         .build();
//!     let client = FlagCacheClient::new(store, options)?;
//!
//!     // Populate the fast partition, then start polling.
//!     client.load_fast_once().await?;
//!     client.start();
//!
//!     // Reads never block and never fail; misses use the fallback.
//!     let enabled = client.read_fast("FFlagNewNavbar", false);
//!     let limit = client.read_dynamic("DFlagRequestLimit", 100);
//!
//!     client.subscribe("DFlagRequestLimit", |change| {
//!         println!("{} -> {:?} (was {:?})", change.id, change.new_value, change.old_value);
//!     });
//!
//!     client.stop().await;
//!     let _ = (enabled, limit);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod refresher;
pub mod scheduler;
pub mod store;
pub mod types;

pub use cache::FlagTable;
pub use client::FlagCacheClient;
pub use config::{
    FilterHook, FlagCacheOptions, FlagCacheOptionsBuilder, DEFAULT_REFRESH_RATE,
    REFRESH_RATE_FLAG_ID,
};
pub use error::{ErrorCode, FlagCacheError, Result};
pub use events::{ChangeBus, ChangeListener, FlagChange, RateListener, RefreshRateChange};
pub use refresher::Refresher;
pub use scheduler::RefreshScheduler;
pub use store::{FlagQuery, FlagStore};
pub use types::{FlagKind, FlagRecord, FlagValue};
