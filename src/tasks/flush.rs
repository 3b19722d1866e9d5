//! Write-Behind Flush Task
//!
//! Background task that periodically drains a write-behind cache's dirty set
//! into its backing store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::Store;
use crate::policy::WriteBehindShared;

/// Spawns the periodic flush loop for a write-behind cache.
///
/// The first flush happens one full interval after spawning. Ticks missed
/// while a slow flush is running are delayed rather than bunched up, and the
/// cache's own flush guard keeps flushes from overlapping with manual ones.
/// The loop exits when `shutdown` is cancelled; a flush already in progress
/// is allowed to finish first.
pub(crate) fn spawn_flush_task<V, S>(
    cache: Arc<WriteBehindShared<V, S>>,
    flush_interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
    S: Store<V> + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting write-behind flush task with interval of {}ms",
            flush_interval.as_millis()
        );

        let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("write-behind flush task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match cache.flush().await {
                        Ok(0) => debug!("write-behind flush: nothing to write"),
                        Ok(count) => info!("write-behind flush: wrote {} entries", count),
                        Err(err) => warn!(error = %err, "write-behind flush failed"),
                    }
                }
            }
        }
    })
}

// == Flush Task Handle ==
/// Owned handle to a running flush task.
///
/// Dropping the handle cancels the task; [`FlushTask::stop`] also waits for
/// it to exit.
#[derive(Debug)]
pub struct FlushTask {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FlushTask {
    pub(crate) fn new(shutdown: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Cancels the task and waits until it has exited.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "write-behind flush task panicked");
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for FlushTask {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
