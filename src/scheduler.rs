//! Periodic refresh scheduling.
//!
//! The scheduler is a cancelable timer loop driving the dynamic
//! refresher. It starts in an idle posture: ticks are no-ops until the
//! fast-load barrier is up (the crate never triggers the fast load on
//! its own). Once armed, each tick runs one refresh cycle, swallowing
//! failures so one bad cycle never halts future ticks. The interval can
//! be retimed at runtime; a retime abandons the in-progress sleep and
//! re-arms at the new rate, but never cancels an in-flight refresh.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::refresher::Refresher;

pub struct RefreshScheduler {
    refresh_rate: Arc<Mutex<Duration>>,
    is_running: Arc<AtomicBool>,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    rearm_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl RefreshScheduler {
    pub fn new(refresh_rate: Duration) -> Self {
        Self {
            refresh_rate: Arc::new(Mutex::new(refresh_rate)),
            is_running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Mutex::new(None),
            rearm_tx: Mutex::new(None),
        }
    }

    /// Spawn the timer loop.
    ///
    /// Idempotent: a second call while running is a no-op.
    pub fn start(&self, refresher: Arc<Refresher>) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (rearm_tx, mut rearm_rx) = mpsc::channel::<()>(4);
        *self.shutdown_tx.lock() = Some(shutdown_tx);
        *self.rearm_tx.lock() = Some(rearm_tx);

        let refresh_rate = Arc::clone(&self.refresh_rate);
        let is_running = Arc::clone(&self.is_running);

        tokio::spawn(async move {
            loop {
                let current = *refresh_rate.lock();

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Refresh scheduler shutting down");
                        break;
                    }
                    _ = rearm_rx.recv() => {
                        // Rate changed: abandon this sleep and re-arm.
                        continue;
                    }
                    _ = tokio::time::sleep(current) => {
                        if !is_running.load(Ordering::SeqCst) {
                            break;
                        }
                        if !refresher.is_loaded() {
                            tracing::debug!("Fast load pending, refresh tick skipped");
                            continue;
                        }
                        if let Err(err) = refresher.refresh_dynamic_once().await {
                            tracing::warn!(error = %err, "Dynamic refresh cycle failed");
                        }
                    }
                }
            }

            // The running flag belongs to stop(): a loop that exits
            // late, after a quick stop/start has already spawned its
            // successor, must not tear that successor down.
        });

        let rate = *self.refresh_rate.lock();
        tracing::debug!(?rate, "Refresh scheduler started");
    }

    /// Stop the timer loop.
    ///
    /// Graceful: an in-flight refresh completes; only future ticks are
    /// cancelled.
    pub async fn stop(&self) {
        if !self.is_running.load(Ordering::SeqCst) {
            return;
        }
        self.is_running.store(false, Ordering::SeqCst);

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(()).await;
        }
        *self.rearm_tx.lock() = None;
        tracing::debug!("Refresh scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn refresh_rate(&self) -> Duration {
        *self.refresh_rate.lock()
    }

    /// Replace the interval and re-arm the timer, returning the
    /// previous rate. Takes effect from the next tick onward.
    pub fn set_refresh_rate(&self, rate: Duration) -> Duration {
        let previous = {
            let mut current = self.refresh_rate.lock();
            std::mem::replace(&mut *current, rate)
        };
        if let Some(tx) = self.rearm_tx.lock().as_ref() {
            let _ = tx.try_send(());
        }
        tracing::debug!(?rate, ?previous, "Refresh rate updated");
        previous
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}
