use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::FlagTable;
use crate::config::{FlagCacheOptions, REFRESH_RATE_FLAG_ID};
use crate::error::Result;
use crate::events::{ChangeBus, FlagChange, RefreshRateChange};
use crate::refresher::Refresher;
use crate::scheduler::RefreshScheduler;
use crate::store::FlagStore;
use crate::types::{FlagKind, FlagValue};

/// Facade owning the flag table, refresher, scheduler and change bus.
///
/// Reads are non-blocking and reflect the last completed load or
/// refresh. The fast load is never triggered implicitly: call
/// [`load_fast_once`](Self::load_fast_once) before (or after) starting
/// the scheduler; until it completes, scheduler ticks are no-ops.
pub struct FlagCacheClient {
    options: FlagCacheOptions,
    table: FlagTable,
    bus: ChangeBus,
    refresher: Arc<Refresher>,
    scheduler: Arc<RefreshScheduler>,
}

impl std::fmt::Debug for FlagCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagCacheClient").finish_non_exhaustive()
    }
}

impl FlagCacheClient {
    pub fn new(store: Arc<dyn FlagStore>, options: FlagCacheOptions) -> Result<Self> {
        options.validate()?;

        let table = FlagTable::new();
        let bus = ChangeBus::new();
        let refresher = Arc::new(Refresher::new(
            store,
            table.clone(),
            bus.clone(),
            options.filter_hook.clone(),
        ));
        let scheduler = Arc::new(RefreshScheduler::new(options.refresh_rate));

        let client = Self {
            options,
            table,
            bus,
            refresher,
            scheduler,
        };
        if client.options.self_reconfigure {
            client.wire_self_reconfiguration();
        }
        Ok(client)
    }

    /// React to the reserved rate flag by retiming the scheduler.
    ///
    /// The handler is a listener like any other, kept apart from the
    /// generic refresh path. Retiming observed this way has a one-cycle
    /// lag: the new rate is only seen by a refresh running at the old
    /// rate.
    fn wire_self_reconfiguration(&self) {
        let scheduler = Arc::clone(&self.scheduler);
        let bus = self.bus.clone();
        self.bus.subscribe(REFRESH_RATE_FLAG_ID, move |change| {
            let Some(ms) = change.new_value.as_number() else {
                tracing::warn!(
                    value = ?change.new_value,
                    "Refresh-rate flag is not numeric, ignoring"
                );
                return;
            };
            if !ms.is_finite() || ms < 1.0 {
                tracing::warn!(ms, "Refresh-rate flag value out of range, ignoring");
                return;
            }
            let rate = Duration::from_millis(ms as u64);
            if rate == scheduler.refresh_rate() {
                return;
            }
            let previous = scheduler.set_refresh_rate(rate);
            bus.emit_rate_change(&RefreshRateChange {
                current: rate,
                previous,
            });
        });
    }

    // Read API

    pub fn read_fast(&self, id: &str, fallback: impl Into<FlagValue>) -> FlagValue {
        self.table.read_fast(id, fallback)
    }

    pub fn read_dynamic(&self, id: &str, fallback: impl Into<FlagValue>) -> FlagValue {
        self.table.read_dynamic(id, fallback)
    }

    // Lifecycle API

    /// One-shot fast-flag load; see [`Refresher::load_fast_once`].
    pub async fn load_fast_once(&self) -> Result<()> {
        self.refresher.load_fast_once().await
    }

    /// One dynamic refresh cycle; see
    /// [`Refresher::refresh_dynamic_once`].
    pub async fn refresh_dynamic_once(&self) -> Result<()> {
        self.refresher.refresh_dynamic_once().await
    }

    /// Start the periodic scheduler.
    pub fn start(&self) {
        self.scheduler.start(Arc::clone(&self.refresher));
    }

    /// Stop the periodic scheduler; an in-flight refresh completes.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub fn is_loaded(&self) -> bool {
        self.refresher.is_loaded()
    }

    pub fn refresh_rate(&self) -> Duration {
        self.scheduler.refresh_rate()
    }

    // Subscription API

    /// Subscribe to `(new, old)` change notifications for one flag id.
    pub fn subscribe<F>(&self, id: impl Into<String>, listener: F)
    where
        F: Fn(&FlagChange) + Send + Sync + 'static,
    {
        self.bus.subscribe(id, listener);
    }

    /// Subscribe to `{current, previous}` refresh-rate notifications.
    pub fn subscribe_refresh_rate<F>(&self, listener: F)
    where
        F: Fn(&RefreshRateChange) + Send + Sync + 'static,
    {
        self.bus.subscribe_refresh_rate(listener);
    }

    /// Drop every dynamic entry.
    ///
    /// Refresh cycles never evict ids the store stopped returning; this
    /// is the explicit out-of-band clear for store deletions. The next
    /// refresh repopulates the partition (every entry it brings back
    /// counts as a first sighting, so no notifications fire).
    pub fn clear_dynamic(&self) {
        self.table.clear_dynamic();
    }

    // Diagnostics

    pub fn snapshot(&self, kind: FlagKind) -> HashMap<String, FlagValue> {
        self.table.snapshot(kind)
    }

    pub fn options(&self) -> &FlagCacheOptions {
        &self.options
    }
}
