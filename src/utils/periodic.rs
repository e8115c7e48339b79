use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs `tick` every `period` until `cancel` fires. The first run happens one
/// full period after spawning. A zero period disables the task.
pub(crate) fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        if period.is_zero() {
            debug!(task = name, "periodic task disabled");
            return;
        }
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(task = name, "periodic task stopped");
                    return;
                }
                _ = ticker.tick() => tick(),
            }
        }
    })
}
