//! Deferred container expiry.
//!
//! Every provisioned container gets a failsafe timer: once its lifetime
//! elapses, the container is stopped and removed regardless of whether the
//! caller ever issued an explicit teardown. The calling application is still
//! expected to track uptime and send its own kill signals — the timer exists
//! so a forgotten container does not run forever, not as a scheduling
//! guarantee. Pending timers live only in process memory and are lost on
//! restart, which is accepted.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::engine::ContainerEngine;

/// Cancellable fire-and-forget expiry tasks, keyed by container name.
pub struct ExpiryScheduler {
    engine: Arc<dyn ContainerEngine>,
    tasks: Arc<DashMap<String, JoinHandle<()>>>,
}

impl ExpiryScheduler {
    /// Create a scheduler that tears containers down through `engine`.
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Arm the expiry failsafe for `container_name` after `delay`.
    ///
    /// The spawned task sleeps, stops the container, and removes it only if
    /// the stop succeeded. If the container was already torn down manually the
    /// stop fails and the task ends silently. A timer already armed for the
    /// same name is replaced.
    pub fn schedule(&self, container_name: &str, delay: Duration) {
        let name = container_name.to_string();

        if let Some((_, stale)) = self.tasks.remove(&name) {
            stale.abort();
            debug!(container = %name, "replaced previously armed expiry");
        }

        info!(
            container = %name,
            delay_secs = delay.as_secs(),
            "armed expiry failsafe"
        );

        let engine = Arc::clone(&self.engine);
        let tasks = Arc::clone(&self.tasks);
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match engine.stop(&task_name).await {
                Ok(_) => match engine.rm(&task_name).await {
                    Ok(_) => info!(container = %task_name, "expired container removed"),
                    Err(e) => {
                        debug!(container = %task_name, error = %e, "expiry rm failed, ignoring")
                    }
                },
                // Already stopped or already gone; nothing left to do.
                Err(e) => debug!(container = %task_name, error = %e, "expiry stop failed, ignoring"),
            }

            tasks.remove(&task_name);
        });

        self.tasks.insert(name, handle);
    }

    /// Cancel a pending expiry, if one is armed for `container_name`.
    ///
    /// Returns whether a timer was actually cancelled.
    pub fn cancel(&self, container_name: &str) -> bool {
        match self.tasks.remove(container_name) {
            Some((_, handle)) => {
                handle.abort();
                debug!(container = %container_name, "cancelled pending expiry");
                true
            }
            None => false,
        }
    }

    /// Number of currently armed timers.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}
