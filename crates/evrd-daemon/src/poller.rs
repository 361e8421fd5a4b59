use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use evrd_engine::Coalescer;
use evrd_store::EventQueue;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Long-running driver over `event_queue`: claim, hand off to the
/// coalescer, mark sent. A crash between the hand-off and `mark_sent`
/// leaves the row `claimed`; `recover_stale` is what makes that window
/// survivable rather than a silent drop.
pub struct Poller {
    claimant_id: String,
    queue: Arc<dyn EventQueue>,
    coalescer: Coalescer,
    poll_interval: Duration,
    max_concurrent_events: u32,
    stale_recovery_window: Duration,
}

impl Poller {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        coalescer: Coalescer,
        poll_interval: Duration,
        max_concurrent_events: u32,
        stale_recovery_window: Duration,
    ) -> Self {
        Self {
            claimant_id: format!("evrd-daemon-{}", Uuid::new_v4()),
            queue,
            coalescer,
            poll_interval,
            max_concurrent_events,
            stale_recovery_window,
        }
    }

    /// Runs until `cancel` fires, then returns once the in-flight tick
    /// completes. Does not drain pending coalescer buckets — that's the
    /// caller's job during shutdown.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        // Run the stale-recovery sweep on a coarser cadence than the claim
        // loop; every tick would be needless load against the queue table.
        let mut recovery_ticker = tokio::time::interval(self.stale_recovery_window);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("poller cancelled, exiting tick loop");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = recovery_ticker.tick() => {
                    self.recover_stale().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let claimed = match self.queue.claim_pending(&self.claimant_id, self.max_concurrent_events).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "claim_pending failed");
                return;
            }
        };

        for event in claimed {
            let event_id = event.event_id.clone();

            if event.organization_id.0 == 0 {
                warn!(event_id, "event has organization_id 0, rejecting to dead letter");
                if let Err(e) = self
                    .queue
                    .mark_dead_letter(&event_id, "organization_id 0 or unset")
                    .await
                {
                    error!(event_id, error = %e, "mark_dead_letter failed");
                }
                continue;
            }

            self.coalescer.accept(event).await;

            if let Err(e) = self.queue.mark_sent(&event_id).await {
                warn!(event_id, error = %e, "mark_sent failed, event remains claimed for stale recovery");
            }
        }
    }

    async fn recover_stale(&self) {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.stale_recovery_window).unwrap();
        match self.queue.recover_stale(cutoff).await {
            Ok(0) => {}
            Ok(n) => info!(count = n, "recovered stale claimed events"),
            Err(e) => error!(error = %e, "recover_stale failed"),
        }
    }
}
