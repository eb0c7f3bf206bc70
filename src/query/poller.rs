use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::QueryKey;

/// Run `tick` every `every` on a background task until the handle is aborted.
///
/// The first tick fires one full interval after spawning, since the page that
/// starts a poller has just fetched.
pub fn spawn_refetch<F, Fut>(key: QueryKey, every: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + every;
        let mut interval = tokio::time::interval_at(start, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            debug!(query = key.name(), "interval refetch");
            tick().await;
        }
    })
}
