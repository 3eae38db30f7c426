//! Background refresh task.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// A repeating task that runs `tick` every `period`, first firing one period
/// after it is spawned.
///
/// The task is aborted when the `Poller` is dropped. It also ends on its own
/// once `tick` returns `None`, which is how it notices that its owner is gone.
#[derive(Debug)]
pub(crate) struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub(crate) fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Option<Fut> + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                match tick() {
                    Some(refresh) => refresh.await,
                    None => {
                        debug!("Poll owner dropped; stopping");
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
