//! Periodic background refresh.
//!
//! A tokio task refreshes a shared [`TableCache`] on a fixed interval and
//! reports each outcome as a [`RefreshNotice`] over an `mpsc` channel, so the
//! front end learns about new tables and failures without polling the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use dashboard_core::settings::DEFAULT_REFRESH_MINUTES;
use tokio::sync::mpsc;
use tokio::time;

use crate::cache::TableCache;

/// Interval used when none, or a zero one, is given.
pub const DEFAULT_REFRESH_INTERVAL: Duration =
    Duration::from_secs(DEFAULT_REFRESH_MINUTES as u64 * 60);

// ── RefreshNotice ─────────────────────────────────────────────────────────────

/// Outcome of one scheduled refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshNotice {
    /// A new table is current.
    Refreshed { rows: usize, at: DateTime<Local> },
    /// The refresh failed; `kept_previous` tells whether an older table is
    /// still being served.
    Failed { reason: String, kept_previous: bool },
}

// ── RefreshScheduler ──────────────────────────────────────────────────────────

/// Drives [`TableCache::refresh`] on an interval.
pub struct RefreshScheduler {
    interval: Duration,
    cache: Arc<TableCache>,
}

impl RefreshScheduler {
    /// A zero `interval` falls back to [`DEFAULT_REFRESH_INTERVAL`].
    pub fn new(interval: Duration, cache: Arc<TableCache>) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "zero refresh interval; using {} minutes",
                DEFAULT_REFRESH_MINUTES
            );
            DEFAULT_REFRESH_INTERVAL
        } else {
            interval
        };
        Self { interval, cache }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the refresh loop.
    ///
    /// The first refresh runs immediately. The loop ends when the receiver or
    /// the [`RefreshHandle`] is dropped, or on [`RefreshHandle::stop`].
    pub fn start(self) -> (mpsc::Receiver<RefreshNotice>, RefreshHandle) {
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.refresh_loop(tx).await;
        });

        (rx, RefreshHandle { handle })
    }

    async fn refresh_loop(self, tx: mpsc::Sender<RefreshNotice>) {
        let mut interval = time::interval(self.interval);

        loop {
            // The first tick completes immediately.
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("refresh channel closed; exiting loop");
                break;
            }

            let notice = refresh_once(Arc::clone(&self.cache)).await;
            if tx.send(notice).await.is_err() {
                tracing::debug!("refresh receiver dropped; exiting loop");
                break;
            }
        }
    }
}

/// Run one blocking refresh on the blocking pool.
pub async fn refresh_once(cache: Arc<TableCache>) -> RefreshNotice {
    let worker = Arc::clone(&cache);
    let outcome = tokio::task::spawn_blocking(move || worker.refresh()).await;

    match outcome {
        Ok(Ok(cached)) => RefreshNotice::Refreshed {
            rows: cached.table.len(),
            at: cached.refreshed_at,
        },
        Ok(Err(e)) => RefreshNotice::Failed {
            reason: e.to_string(),
            kept_previous: cache.get().is_some(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "refresh task failed");
            RefreshNotice::Failed {
                reason: format!("refresh task failed: {}", e),
                kept_previous: cache.get().is_some(),
            }
        }
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// Handle to the background refresh task. Dropping it stops the task.
pub struct RefreshHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the refresh loop. A refresh already running on the blocking pool
    /// finishes, but its result is discarded.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{cache_with, FakeSource};
    use std::sync::atomic::Ordering;

    async fn next(rx: &mut mpsc::Receiver<RefreshNotice>) -> Option<RefreshNotice> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for notice")
    }

    #[tokio::test]
    async fn test_initial_notice_is_sent() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let (mut rx, handle) = RefreshScheduler::new(Duration::from_secs(60), Arc::clone(&cache)).start();

        match next(&mut rx).await {
            Some(RefreshNotice::Refreshed { rows, .. }) => assert_eq!(rows, 1),
            other => panic!("unexpected notice: {other:?}"),
        }
        assert_eq!(cache.get().unwrap().table.len(), 1);

        handle.stop();
    }

    #[tokio::test]
    async fn test_zero_interval_falls_back_to_default() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let scheduler = RefreshScheduler::new(Duration::ZERO, Arc::clone(&cache));
        assert_eq!(scheduler.interval(), DEFAULT_REFRESH_INTERVAL);

        let (mut rx, handle) = scheduler.start();
        assert!(matches!(
            next(&mut rx).await,
            Some(RefreshNotice::Refreshed { rows: 1, .. })
        ));
        assert!(!handle.is_finished());

        handle.stop();
    }

    #[tokio::test]
    async fn test_refreshes_repeat_on_interval() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let (mut rx, handle) =
            RefreshScheduler::new(Duration::from_millis(20), Arc::clone(&cache)).start();

        for expected in 1..=3 {
            match next(&mut rx).await {
                Some(RefreshNotice::Refreshed { rows, .. }) => assert_eq!(rows, expected),
                other => panic!("unexpected notice: {other:?}"),
            }
        }

        handle.stop();
    }

    #[tokio::test]
    async fn test_failure_notice_reports_kept_table() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));
        cache.refresh().unwrap();
        source.fail.store(true, Ordering::SeqCst);

        let (mut rx, handle) = RefreshScheduler::new(Duration::from_secs(60), Arc::clone(&cache)).start();

        match next(&mut rx).await {
            Some(RefreshNotice::Failed {
                reason,
                kept_previous,
            }) => {
                assert!(reason.contains("gone"));
                assert!(kept_previous);
            }
            other => panic!("unexpected notice: {other:?}"),
        }
        assert_eq!(cache.get().unwrap().table.len(), 1);

        handle.stop();
    }

    #[tokio::test]
    async fn test_failure_without_previous_table() {
        let source = FakeSource::new();
        source.fail.store(true, Ordering::SeqCst);
        let cache = Arc::new(cache_with(&source, 300));

        let notice = refresh_once(cache).await;
        assert!(matches!(
            notice,
            RefreshNotice::Failed {
                kept_previous: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let (mut rx, handle) = RefreshScheduler::new(Duration::from_secs(60), cache).start();
        next(&mut rx).await;

        handle.stop();
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_loop() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let (mut rx, handle) = RefreshScheduler::new(Duration::from_secs(60), cache).start();
        next(&mut rx).await;

        drop(handle);
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_dropping_receiver_ends_loop() {
        let source = FakeSource::new();
        let cache = Arc::new(cache_with(&source, 300));

        let (rx, handle) = RefreshScheduler::new(Duration::from_millis(10), cache).start();
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("loop did not exit");
    }
}
