use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Source of delays for the orchestrator, swapped for a fake in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineElapsed;

/// Runs `fut` unless `clock` reaches `deadline` first.
pub async fn with_deadline<C, F>(clock: &C, deadline: Duration, fut: F) -> Result<F::Output, DeadlineElapsed>
where
    C: Clock + ?Sized,
    F: Future,
{
    tokio::select! {
        biased;
        out = fut => Ok(out),
        _ = clock.sleep(deadline) => Err(DeadlineElapsed),
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::Clock;

    /// Clock that returns immediately and records every requested sleep.
    ///
    /// Each sleep yields once, so a future raced against it gets one poll to finish.
    #[derive(Debug, Clone, Default)]
    pub struct MockClock {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().clone()
        }

        /// Sum of every requested sleep.
        pub fn elapsed(&self) -> Duration {
            self.sleeps.lock().iter().sum()
        }
    }

    #[async_trait]
    impl Clock for MockClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
            tokio::task::yield_now().await;
        }
    }
}
