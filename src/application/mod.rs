//! Application layer - The long-running tasks of the pipeline.
//!
//! - `ChangeListener` - Status Store change channel into the broadcast hub
//! - `Simulator` - Periodic weighted status writes into the Status Store
//!
//! Both run until a shared `watch` shutdown signal flips to `true`.

mod backoff;
mod change_listener;
mod simulator;

pub use backoff::{Backoff, BackoffPolicy};
pub use change_listener::{ChangeListener, ListenerHealth, Liveness};
pub use simulator::{Simulator, SimulatorSettings, TickReport};

use tokio::sync::watch;

/// Completes once shutdown is signalled or the sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
