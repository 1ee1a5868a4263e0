use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flagcache::{
    FlagCacheClient, FlagCacheOptions, FlagKind, FlagQuery, FlagRecord, FlagStore, FlagValue,
    Result, REFRESH_RATE_FLAG_ID,
};

struct MemoryStore {
    records: Mutex<Vec<FlagRecord>>,
    dynamic_queries: AtomicUsize,
    fail_dynamic_once: AtomicUsize,
    dynamic_delay: Duration,
}

impl MemoryStore {
    fn new(records: Vec<FlagRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            dynamic_queries: AtomicUsize::new(0),
            fail_dynamic_once: AtomicUsize::new(0),
            dynamic_delay: Duration::ZERO,
        })
    }

    fn with_dynamic_delay(records: Vec<FlagRecord>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            dynamic_queries: AtomicUsize::new(0),
            fail_dynamic_once: AtomicUsize::new(0),
            dynamic_delay: delay,
        })
    }

    fn set_records(&self, records: Vec<FlagRecord>) {
        *self.records.lock() = records;
    }

    fn dynamic_query_count(&self) -> usize {
        self.dynamic_queries.load(Ordering::SeqCst)
    }

    fn fail_next_dynamic_queries(&self, count: usize) {
        self.fail_dynamic_once.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn find(&self, query: &FlagQuery) -> Result<Vec<FlagRecord>> {
        if query.kind == FlagKind::Dynamic {
            self.dynamic_queries.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_dynamic_once.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_dynamic_once.store(remaining - 1, Ordering::SeqCst);
                return Err(flagcache::FlagCacheError::store_error("injected failure"));
            }
            if !self.dynamic_delay.is_zero() {
                tokio::time::sleep(self.dynamic_delay).await;
            }
        }
        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|r| r.kind == query.kind)
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn ticks_are_gated_on_the_fast_load_barrier() {
    let store = MemoryStore::new(vec![FlagRecord::new("DFlagA", FlagKind::Dynamic, 1)]);
    let options = FlagCacheOptions::builder().refresh_rate_ms(25).build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    client.start();
    tokio::time::sleep(Duration::from_millis(110)).await;
    assert_eq!(store.dynamic_query_count(), 0);

    client.load_fast_once().await.unwrap();
    tokio::time::sleep(Duration::from_millis(110)).await;
    assert!(store.dynamic_query_count() >= 2);
    assert_eq!(client.read_dynamic("DFlagA", 0), FlagValue::from(1));

    client.stop().await;
}

#[tokio::test]
async fn a_failed_cycle_does_not_stop_future_ticks() {
    let store = MemoryStore::new(vec![FlagRecord::new("DFlagA", FlagKind::Dynamic, 1)]);
    let options = FlagCacheOptions::builder().refresh_rate_ms(25).build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    client.load_fast_once().await.unwrap();
    store.fail_next_dynamic_queries(2);
    client.start();

    tokio::time::sleep(Duration::from_millis(200)).await;
    client.stop().await;

    // The first cycles failed and were swallowed; later ones landed.
    assert!(store.dynamic_query_count() > 2);
    assert_eq!(client.read_dynamic("DFlagA", 0), FlagValue::from(1));
}

#[tokio::test]
async fn rate_flag_change_retimes_the_scheduler() {
    // The reserved rate flag starts at the configured rate, then drops.
    let store = MemoryStore::new(vec![FlagRecord::new(
        REFRESH_RATE_FLAG_ID,
        FlagKind::Dynamic,
        200,
    )]);
    let options = FlagCacheOptions::builder()
        .refresh_rate_ms(200)
        .self_reconfigure(true)
        .build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    let rate_changes = Arc::new(Mutex::new(Vec::new()));
    let rate_changes_clone = Arc::clone(&rate_changes);
    client.subscribe_refresh_rate(move |change| {
        rate_changes_clone.lock().push(*change);
    });

    client.load_fast_once().await.unwrap();

    // First sighting of the rate flag: no reconfiguration.
    client.refresh_dynamic_once().await.unwrap();
    assert!(rate_changes.lock().is_empty());
    assert_eq!(client.refresh_rate(), Duration::from_millis(200));

    // The flag now asks for a faster cadence. The change is observed by
    // a refresh running at the old rate, then the timer re-arms.
    store.set_records(vec![FlagRecord::new(
        REFRESH_RATE_FLAG_ID,
        FlagKind::Dynamic,
        40,
    )]);
    client.refresh_dynamic_once().await.unwrap();

    assert_eq!(client.refresh_rate(), Duration::from_millis(40));
    {
        let changes = rate_changes.lock();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].current, Duration::from_millis(40));
        assert_eq!(changes[0].previous, Duration::from_millis(200));
    }

    // Ticks now arrive at the new, faster rate.
    client.start();
    let before = store.dynamic_query_count();
    tokio::time::sleep(Duration::from_millis(220)).await;
    client.stop().await;
    assert!(store.dynamic_query_count() - before >= 3);
}

#[tokio::test]
async fn restart_during_inflight_refresh_keeps_ticking() {
    // A stop issued while a refresh is still in flight leaves the old
    // loop alive briefly; a scheduler restarted in that window must not
    // be torn down when the stale loop finally winds up.
    let store = MemoryStore::with_dynamic_delay(
        vec![FlagRecord::new("DFlagA", FlagKind::Dynamic, 1)],
        Duration::from_millis(120),
    );
    let options = FlagCacheOptions::builder().refresh_rate_ms(30).build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    client.load_fast_once().await.unwrap();
    client.start();

    // Let the first tick fire and park inside the slow store query.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(store.dynamic_query_count() >= 1);

    client.stop().await;
    client.start();

    // The in-flight cycle completes, the stale loop exits, and the new
    // loop keeps issuing queries at its own cadence.
    let at_restart = store.dynamic_query_count();
    tokio::time::sleep(Duration::from_millis(400)).await;
    client.stop().await;
    assert!(
        store.dynamic_query_count() > at_restart,
        "restarted scheduler stopped ticking: {} then {}",
        at_restart,
        store.dynamic_query_count()
    );
}

#[tokio::test]
async fn armed_timer_reacts_to_a_rate_flag_change() {
    // The rate flag is first sighted before the scheduler starts, so
    // the timer arms at a deliberately slow cadence; the change driven
    // through a later refresh must abandon the in-progress sleep and
    // tick at the new rate well before the old interval elapses.
    let store = MemoryStore::new(vec![FlagRecord::new(
        REFRESH_RATE_FLAG_ID,
        FlagKind::Dynamic,
        60_000,
    )]);
    let options = FlagCacheOptions::builder()
        .refresh_rate_ms(60_000)
        .self_reconfigure(true)
        .build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    client.load_fast_once().await.unwrap();
    client.refresh_dynamic_once().await.unwrap();
    client.start();

    // One minute to the first tick: nothing arrives on its own.
    tokio::time::sleep(Duration::from_millis(60)).await;

    store.set_records(vec![FlagRecord::new(
        REFRESH_RATE_FLAG_ID,
        FlagKind::Dynamic,
        30,
    )]);
    client.refresh_dynamic_once().await.unwrap();
    assert_eq!(client.refresh_rate(), Duration::from_millis(30));
    let before = store.dynamic_query_count();

    tokio::time::sleep(Duration::from_millis(200)).await;
    client.stop().await;

    // Several ticks landed at the new cadence; at the old rate the
    // first one was still tens of seconds away.
    assert!(store.dynamic_query_count() - before >= 3);
}

#[tokio::test]
async fn stop_is_graceful_and_restartable() {
    let store = MemoryStore::new(vec![FlagRecord::new("DFlagA", FlagKind::Dynamic, 1)]);
    let options = FlagCacheOptions::builder().refresh_rate_ms(25).build();
    let client = FlagCacheClient::new(Arc::clone(&store) as Arc<dyn FlagStore>, options).unwrap();

    client.load_fast_once().await.unwrap();
    client.start();
    tokio::time::sleep(Duration::from_millis(80)).await;
    client.stop().await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    let at_stop = store.dynamic_query_count();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(store.dynamic_query_count(), at_stop);

    client.start();
    tokio::time::sleep(Duration::from_millis(80)).await;
    client.stop().await;
    assert!(store.dynamic_query_count() > at_stop);
}
