//! Drain-then-exit coordination.
//!
//! The shutdown flag and the in-flight operation count live in one watch
//! channel, so they are read and written under the same lock and drain
//! waiters are woken by the same write that brings the count to zero.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainState {
    pub shutting_down: bool,
    pub active_ops: usize,
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: watch::Sender<DrainState>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(DrainState::default());
        Self { state }
    }

    /// Admit one persistence operation, unless shutdown was requested.
    ///
    /// The flag check and the increment happen under one lock, so an
    /// operation is either admitted before the flag flips (and drained) or
    /// refused. The count is released when the guard drops.
    pub fn begin_op(self: &Arc<Self>) -> Option<OpGuard> {
        let mut admitted = false;
        self.state.send_if_modified(|s| {
            if s.shutting_down {
                return false;
            }
            s.active_ops += 1;
            admitted = true;
            true
        });
        admitted.then(|| OpGuard {
            coord: Arc::clone(self),
        })
    }

    fn end_op(&self) {
        self.state.send_modify(|s| {
            s.active_ops = s.active_ops.saturating_sub(1);
        });
    }

    /// Stop admitting new operations. Returns `true` only for the call that
    /// actually flipped the flag.
    pub fn request_shutdown(&self) -> bool {
        let first = self.state.send_if_modified(|s| {
            if s.shutting_down {
                false
            } else {
                s.shutting_down = true;
                true
            }
        });
        if first {
            info!(active_ops = self.active_ops(), "shutdown requested, draining snapshot writes");
        } else {
            debug!("shutdown already requested");
        }
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.borrow().shutting_down
    }

    pub fn active_ops(&self) -> usize {
        self.state.borrow().active_ops
    }

    pub fn snapshot(&self) -> DrainState {
        *self.state.borrow()
    }

    /// Resolves once no admitted operation is left running.
    pub async fn wait_for_drain(&self) {
        let mut rx = self.state.subscribe();
        // The sender is owned by `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|s| s.active_ops == 0).await;
    }
}

/// One admitted operation. Dropping it ends the operation, whichever way
/// the owning code exits.
#[derive(Debug)]
pub struct OpGuard {
    coord: Arc<ShutdownCoordinator>,
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.coord.end_op();
    }
}
