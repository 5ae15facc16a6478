mod logic;
pub(crate) mod s3_upload;
pub(crate) mod db_dump;

use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{info, warn};

use crate::schedule::CycleScheduler;
pub use db_dump::{RedisCliProducer, SnapshotProducer};
pub use logic::{BackupOrchestrator, CycleOutcome};
pub use s3_upload::{ArchiveUploader, S3Uploader};

/// How often the loop checks whether a cycle is due.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the orchestrator and the scheduler; at most one cycle runs at a time.
pub struct BackupService<P, U> {
    orchestrator: BackupOrchestrator<P, U>,
    scheduler: CycleScheduler<Local>,
}

impl<P: SnapshotProducer, U: ArchiveUploader> BackupService<P, U> {
    pub fn new(orchestrator: BackupOrchestrator<P, U>, cron_schedule: &str) -> Self {
        let scheduler = CycleScheduler::new(cron_schedule, Local::now());
        info!(
            recurrence = ?scheduler.recurrence(),
            "First scheduled backup at {}",
            scheduler.next_fire()
        );
        Self { orchestrator, scheduler }
    }

    /// Runs the eager startup cycle. The first scheduled fire is left where it was.
    pub async fn start(&self) -> CycleOutcome {
        info!("Running initial backup");
        self.orchestrator.run_cycle().await
    }

    /// Runs one cycle if the next fire time has passed.
    pub async fn poll(&mut self) -> Option<CycleOutcome> {
        self.poll_at(Local::now()).await
    }

    /// Same as `poll`, with `now` as the poll instant.
    pub async fn poll_at(&mut self, now: DateTime<Local>) -> Option<CycleOutcome> {
        if !self.scheduler.is_due(&now) {
            return None;
        }
        Some(self.fire(now).await)
    }

    async fn fire(&mut self, polled_at: DateTime<Local>) -> CycleOutcome {
        self.scheduler.begin_fire();
        let outcome = self.orchestrator.run_cycle().await;
        // Rescheduled from the end of the cycle, which is never before the poll instant.
        let ended = Local::now().max(polled_at);
        self.scheduler.finish_fire(ended);
        match &outcome {
            CycleOutcome::Success { key } => {
                info!(key = %key, "Cycle finished; next backup at {}", self.scheduler.next_fire())
            }
            CycleOutcome::Failed(reason) => {
                warn!("Cycle skipped ({}); next backup at {}", reason, self.scheduler.next_fire())
            }
        }
        outcome
    }

    /// Initial cycle, then poll forever.
    pub async fn run(mut self, poll_interval: Duration) {
        self.start().await;
        loop {
            tokio::time::sleep(poll_interval).await;
            self.poll().await;
        }
    }
}
