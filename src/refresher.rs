//! Fast-flag loading and dynamic-flag refreshing.
//!
//! The refresher is the only writer to the flag table. Fast flags go
//! through [`Refresher::load_fast_once`], a one-shot, idempotent load;
//! dynamic flags go through [`Refresher::refresh_dynamic_once`], which
//! overwrites the dynamic partition and emits change notifications for
//! every value transition it observes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::FlagTable;
use crate::config::FilterHook;
use crate::error::Result;
use crate::events::{ChangeBus, FlagChange};
use crate::store::{FlagQuery, FlagStore};
use crate::types::FlagKind;

pub struct Refresher {
    store: Arc<dyn FlagStore>,
    table: FlagTable,
    bus: ChangeBus,
    filter_hook: Option<FilterHook>,
    loaded: AtomicBool,
    fast_guard: Mutex<()>,
    refresh_guard: Mutex<()>,
}

impl Refresher {
    pub fn new(
        store: Arc<dyn FlagStore>,
        table: FlagTable,
        bus: ChangeBus,
        filter_hook: Option<FilterHook>,
    ) -> Self {
        Self {
            store,
            table,
            bus,
            filter_hook,
            loaded: AtomicBool::new(false),
            fast_guard: Mutex::new(()),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Whether the initial fast load has completed.
    ///
    /// This is the barrier the scheduler checks before allowing dynamic
    /// refresh ticks.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Populate the fast partition, exactly once per process.
    ///
    /// Subsequent calls resolve immediately without touching the store.
    /// Concurrent first calls are single-flight: late arrivals wait for
    /// the in-flight load and then no-op. On failure the loaded barrier
    /// stays down, so a retry starts from scratch; records already
    /// written from a failed batch are not rolled back.
    pub async fn load_fast_once(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let _guard = self.fast_guard.lock().await;
        // Another caller may have finished the load while we waited.
        if self.is_loaded() {
            return Ok(());
        }

        let query = self.build_query(FlagKind::Fast);
        let records = self.store.find(&query).await?;

        let count = records.len();
        for record in records {
            self.table.insert(FlagKind::Fast, record.id, record.value);
        }
        self.loaded.store(true, Ordering::SeqCst);
        tracing::debug!(flags = count, "Fast flags loaded");
        Ok(())
    }

    /// Run one dynamic refresh cycle: fetch, overwrite, diff, notify.
    ///
    /// Cycles are single-flight: a call arriving while another refresh
    /// is in flight is deduplicated and returns immediately. Every
    /// fetched record overwrites its cache entry whether or not the
    /// value changed; a notification fires only for a transition, never
    /// for a first sighting. Ids the store stopped returning are left
    /// in the table untouched.
    pub async fn refresh_dynamic_once(&self) -> Result<()> {
        let Ok(_guard) = self.refresh_guard.try_lock() else {
            tracing::debug!("Dynamic refresh already in flight, skipping");
            return Ok(());
        };

        let query = self.build_query(FlagKind::Dynamic);
        let records = self.store.find(&query).await?;

        let mut changed = 0usize;
        for record in records {
            let old = self
                .table
                .insert(FlagKind::Dynamic, record.id.clone(), record.value.clone());
            if let Some(old_value) = old {
                if old_value != record.value {
                    changed += 1;
                    self.bus.emit_change(&FlagChange {
                        id: record.id,
                        new_value: record.value,
                        old_value,
                    });
                }
            }
        }
        if changed > 0 {
            tracing::debug!(changed, "Dynamic refresh detected changes");
        }
        Ok(())
    }

    fn build_query(&self, kind: FlagKind) -> FlagQuery {
        let predicate = self.filter_hook.as_ref().and_then(|hook| hook(kind));
        FlagQuery::with_predicate(kind, predicate)
    }
}
