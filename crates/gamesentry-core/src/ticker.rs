//! Periodic status refresh while a session is running.
//!
//! The ticker is a tokio task holding only a [`SharedController`] and a user
//! id. It stops by itself once that user is no longer `Running`, and the
//! returned [`TickHandle`] aborts it on cancel or drop, so no tick can outlive
//! the view that asked for it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::controller::{ControllerState, SharedController, UsageStatus};
use crate::user::UserId;

/// Owns the ticker task. Dropping it stops the ticks.
#[derive(Debug)]
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tick `controller` for `user` every `period`, passing each status to
/// `on_tick`. Must be called from within a tokio runtime.
pub fn spawn_ticker<F>(
    controller: SharedController,
    user: UserId,
    period: Duration,
    mut on_tick: F,
) -> TickHandle
where
    F: FnMut(&UsageStatus) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            // The tick reads and writes storage; keep it off the async workers.
            let shared = controller.clone();
            let id = user.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let mut guard = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if guard.state(&id) != ControllerState::Running {
                    return None;
                }
                Some(guard.tick(&id))
            })
            .await;

            match outcome {
                Ok(Some(Ok(status))) => on_tick(&status),
                Ok(None) => {
                    debug!(user = %user, "session no longer running; ticker exiting");
                    break;
                }
                Ok(Some(Err(err))) => {
                    warn!(user = %user, error = %err, "tick failed; ticker exiting");
                    break;
                }
                Err(err) => {
                    warn!(user = %user, error = %err, "tick task panicked; ticker exiting");
                    break;
                }
            }
        }
    });

    TickHandle { task }
}
