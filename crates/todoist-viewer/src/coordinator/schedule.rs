//! Background polling loop.
//!
//! One task per coordinator. It holds only a weak reference, so dropping every
//! [`Coordinator`] handle ends the loop even without an explicit shutdown.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Coordinator, Inner};

/// First tick fires one full period from now, not immediately.
fn rearm(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub(super) async fn run(
    inner: Weak<Inner>,
    cancel: CancellationToken,
    mut interval_rx: watch::Receiver<Duration>,
) {
    let mut ticker = rearm(*interval_rx.borrow_and_update());

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let period = *interval_rx.borrow_and_update();
                debug!(interval_secs = period.as_secs(), "Re-arming refresh timer");
                ticker = rearm(period);
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let coordinator = Coordinator { inner };
                // Failures are already recorded in the coordinator state.
                if let Err(e) = coordinator.request_refresh().await {
                    debug!(entry_id = %coordinator.entry_id(), error = %e, "Scheduled refresh failed");
                }
            }
        }
    }

    info!("Periodic refresh stopped");
}
