use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// The hourly ticker switch: turned on every tick, turned off again after a
/// fixed width. A new pulse cancels the pending switch-off of the previous one,
/// so at most one revert is ever scheduled.
pub struct TickerPulse {
    on: Arc<AtomicBool>,
    pending: Mutex<Option<JoinHandle<()>>>,
    width: Duration,
}

impl TickerPulse {
    pub fn new(width: Duration) -> Self {
        Self {
            on: Arc::new(AtomicBool::new(false)),
            pending: Mutex::new(None),
            width,
        }
    }

    #[cfg(test)]
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub async fn pulse(&self) {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        self.on.store(true, Ordering::SeqCst);
        debug!("hourlyTickerSwitch turned ON");

        let on = Arc::clone(&self.on);
        let width = self.width;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(width).await;
            on.store(false, Ordering::SeqCst);
            debug!("hourlyTickerSwitch turned OFF after {:?}", width);
        }));
    }
}
