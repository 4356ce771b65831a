// ABOUTME: Periodic resource usage requests, independent of connection state
// Emits get_resources on a fixed interval for the lifetime of the application

use crate::session::terminal_session::GET_RESOURCES_EVENT;
use crate::terminal::transport::Transport;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub struct ResourcePoller {
    handle: JoinHandle<()>,
}

impl ResourcePoller {
    /// Spawn the polling task. The first request goes out one full `period` after start.
    pub fn spawn(transport: Arc<dyn Transport>, period: Duration) -> Self {
        info!("Polling system resources every {:?}", period);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            // A stalled runtime delays ticks rather than bursting to catch up
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("Requesting system resources");
                transport.emit(GET_RESOURCES_EVENT, None, None);
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ResourcePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
