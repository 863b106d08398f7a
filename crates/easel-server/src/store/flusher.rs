//! Background write-back task.
//!
//! One task per store. It ticks on a fixed interval and runs a flush cycle
//! on Tokio's blocking pool each time. The task holds only a weak reference
//! to the store, so dropping every store handle ends it even without
//! `stop()`.

use std::{sync::Weak, time::Duration};

use easel_core::{Environment, Record};
use tokio::{
    runtime::Handle,
    sync::oneshot,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use super::{Shared, StoreError};
use crate::storage::Storage;

/// Running flusher: shutdown signal plus the task to await.
pub(super) struct FlusherHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl FlusherHandle {
    /// Spawn the flusher on the ambient runtime.
    pub(super) fn spawn<R: Record, S: Storage, E: Environment>(
        shared: Weak<Shared<R, S, E>>,
        period: Duration,
    ) -> Result<Self, StoreError> {
        if period.is_zero() {
            return Err(StoreError::ZeroInterval);
        }
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        let (shutdown, mut rx) = oneshot::channel();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    _ = ticker.tick() => {
                        let Some(shared) = shared.upgrade() else { break };
                        let cycle = tokio::task::spawn_blocking(move || shared.flush_dirty());
                        if let Err(e) = cycle.await {
                            tracing::error!(kind = %R::KIND, error = %e, "flush cycle aborted");
                        }
                    }
                }
            }
        });

        Ok(Self { shutdown, task })
    }

    /// Signal shutdown and wait for any in-flight cycle to finish.
    pub(super) async fn shutdown(self) {
        // The task may already have exited if the store was dropped.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "flusher task failed");
        }
    }
}
