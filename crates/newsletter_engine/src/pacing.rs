use std::time::Duration;

use engine_logging::engine_debug;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

use crate::{FetchError, FetchOutput, Fetcher};

/// Process-wide request pacing: consecutive request starts are at least
/// `min_interval` apart, however many callers share the pacer.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Waits until the next request may start and claims that slot.
    ///
    /// The lock is held across the sleep so concurrent callers queue up behind
    /// each other instead of starting together.
    pub async fn wait_turn(&self) {
        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            match previous.checked_add(self.min_interval) {
                Some(ready_at) => {
                    let now = Instant::now();
                    if ready_at > now {
                        engine_debug!("pacing: sleeping {:?}", ready_at - now);
                        sleep_until(ready_at).await;
                    }
                }
                // Past the clock's range: `sleep` saturates instead of overflowing.
                None => sleep(self.min_interval).await,
            }
        }
        *last_start = Some(Instant::now());
    }
}

/// Wraps a fetcher so every request goes through a shared [`Pacer`].
pub struct PacedFetcher<F> {
    inner: F,
    pacer: Pacer,
}

impl<F: Fetcher> PacedFetcher<F> {
    pub fn new(inner: F, min_interval: Duration) -> Self {
        Self {
            inner,
            pacer: Pacer::new(min_interval),
        }
    }
}

#[async_trait::async_trait]
impl<F: Fetcher> Fetcher for PacedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.pacer.wait_turn().await;
        self.inner.fetch(url).await
    }
}
