//! Forwarder loop and manual control surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, error, info};

use punchgate_auth::SessionAuthority;
use punchgate_core::config::ForwarderConfig;
use punchgate_core::error::AppError;
use punchgate_database::repositories::QueueRepository;
use punchgate_entity::attendance::AttendanceEvent;
use punchgate_entity::queue::QueueEntry;
use punchgate_upstream::ErpClient;

/// Runtime-adjustable drain settings.
#[derive(Debug, Clone)]
struct Settings {
    /// Seconds between drain cycles.
    sync_interval: Duration,
    /// Maximum entries claimed per cycle.
    batch_size: i64,
    /// Attempts before terminal failure.
    max_attempts: i32,
    /// Age at which synced entries are prunable.
    retention: chrono::Duration,
}

impl Settings {
    fn from_config(config: &ForwarderConfig) -> Self {
        Self {
            sync_interval: Duration::from_secs(config.sync_interval_seconds),
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
            retention: chrono::Duration::days(config.retention_days as i64),
        }
    }
}

/// Partial update applied by `PUT /sync/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfigUpdate {
    /// New drain period in seconds.
    pub sync_interval_seconds: Option<u64>,
    /// New per-cycle claim limit.
    pub batch_size: Option<i64>,
    /// New attempt budget.
    pub max_attempts: Option<i32>,
}

/// Forwarder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwarderState {
    /// Not started or shut down.
    Stopped,
    /// Waiting for the next cycle.
    Running,
    /// A drain cycle is in progress.
    Draining,
}

/// Result of one drain cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrainSummary {
    /// Entries claimed this cycle.
    pub claimed: usize,
    /// Entries accepted upstream.
    pub synced: usize,
    /// Entries that failed but keep attempt budget.
    pub failed: usize,
    /// Entries promoted to terminal failure.
    pub terminal: usize,
}

/// Point-in-time view of the forwarder for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderStatus {
    /// Current lifecycle state.
    pub state: ForwarderState,
    /// Seconds between drain cycles.
    pub sync_interval_seconds: u64,
    /// Per-cycle claim limit.
    pub batch_size: i64,
    /// Attempt budget.
    pub max_attempts: i32,
    /// Summary of the most recent drain.
    pub last_drain: Option<DrainSummary>,
    /// When the most recent drain finished.
    pub last_drain_at: Option<DateTime<Utc>>,
}

/// Internal mutable status.
#[derive(Debug)]
struct StatusInner {
    state: ForwarderState,
    last_drain: Option<DrainSummary>,
    last_drain_at: Option<DateTime<Utc>>,
}

/// The background forwarder.
///
/// One instance exists per process, shared between the scheduled loop and
/// the sync-control handlers. The drain mutex makes cycles mutually
/// exclusive no matter which side initiates them.
#[derive(Debug, Clone)]
pub struct Forwarder {
    queue: Arc<QueueRepository>,
    upstream: Arc<ErpClient>,
    authority: Arc<SessionAuthority>,
    settings: Arc<RwLock<Settings>>,
    drain_lock: Arc<Mutex<()>>,
    status: Arc<RwLock<StatusInner>>,
    reschedule: watch::Sender<()>,
}

impl Forwarder {
    /// Creates a forwarder over the shared queue, upstream client, and
    /// session authority.
    pub fn new(
        queue: Arc<QueueRepository>,
        upstream: Arc<ErpClient>,
        authority: Arc<SessionAuthority>,
        config: &ForwarderConfig,
    ) -> Self {
        let (reschedule, _) = watch::channel(());
        Self {
            queue,
            upstream,
            authority,
            settings: Arc::new(RwLock::new(Settings::from_config(config))),
            drain_lock: Arc::new(Mutex::new(())),
            status: Arc::new(RwLock::new(StatusInner {
                state: ForwarderState::Stopped,
                last_drain: None,
                last_drain_at: None,
            })),
            reschedule,
        }
    }

    /// Runs the forwarder until the shutdown signal flips.
    ///
    /// Starts with an immediate drain, then cycles on the configured
    /// interval. Config updates reschedule the timer; shutdown waits for
    /// the in-flight cycle to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut reschedule = self.reschedule.subscribe();

        self.set_state(ForwarderState::Running).await;
        info!("Forwarder started");

        if let Err(e) = self.drain_once().await {
            error!(error = %e, "Initial drain cycle failed");
        }

        loop {
            let interval = self.settings.read().await.sync_interval;

            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender also means the service is going down.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = reschedule.changed() => {
                    debug!("Forwarder timer rescheduled");
                    continue;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.drain_once().await {
                        error!(error = %e, "Drain cycle failed");
                    }
                    self.session_sweep().await;
                }
            }
        }

        // A concurrent manual drain may still hold the lock; taking it is
        // the quiescent point.
        let _guard = self.drain_lock.lock().await;
        self.set_state(ForwarderState::Stopped).await;
        info!("Forwarder stopped");
    }

    /// Runs one drain cycle now (manual trigger shares the cycle mutex).
    pub async fn drain_once(&self) -> Result<DrainSummary, AppError> {
        let _guard = self.drain_lock.lock().await;
        let resume_state = self.enter_draining().await;

        let (batch_size, max_attempts) = {
            let settings = self.settings.read().await;
            (settings.batch_size, settings.max_attempts)
        };

        let entries = self.queue.claim(batch_size, max_attempts).await?;
        let summary = if entries.is_empty() {
            DrainSummary::default()
        } else {
            self.deliver(entries, max_attempts).await?
        };

        self.record_summary(&summary).await;
        self.set_state(resume_state).await;
        Ok(summary)
    }

    /// Resets terminal failures to pending, then drains. Returns how many
    /// entries were reset alongside the drain summary.
    pub async fn retry_failed(&self) -> Result<(u64, DrainSummary), AppError> {
        let reset = self.queue.reset_terminal().await?;
        info!(reset, "Terminal entries reset for retry");
        let summary = self.drain_once().await?;
        Ok((reset, summary))
    }

    /// Claims exactly the listed entries (ignoring the attempt cap) and
    /// drains them.
    pub async fn force_sync(&self, ids: &[i64]) -> Result<DrainSummary, AppError> {
        let _guard = self.drain_lock.lock().await;
        let resume_state = self.enter_draining().await;

        let max_attempts = self.settings.read().await.max_attempts;
        let entries = self.queue.claim_by_ids(ids).await?;
        let summary = if entries.is_empty() {
            DrainSummary::default()
        } else {
            self.deliver(entries, max_attempts).await?
        };

        self.record_summary(&summary).await;
        self.set_state(resume_state).await;
        Ok(summary)
    }

    /// Atomically applies a config update and reschedules the timer.
    pub async fn update_config(&self, update: SyncConfigUpdate) -> Result<(), AppError> {
        if let Some(secs) = update.sync_interval_seconds {
            if secs == 0 {
                return Err(AppError::validation("sync_interval_seconds must be > 0"));
            }
        }
        if let Some(size) = update.batch_size {
            if size <= 0 {
                return Err(AppError::validation("batch_size must be > 0"));
            }
        }
        if let Some(attempts) = update.max_attempts {
            if attempts <= 0 {
                return Err(AppError::validation("max_attempts must be > 0"));
            }
        }

        {
            let mut settings = self.settings.write().await;
            if let Some(secs) = update.sync_interval_seconds {
                settings.sync_interval = Duration::from_secs(secs);
            }
            if let Some(size) = update.batch_size {
                settings.batch_size = size;
            }
            if let Some(attempts) = update.max_attempts {
                settings.max_attempts = attempts;
            }
            info!(
                sync_interval_seconds = settings.sync_interval.as_secs(),
                batch_size = settings.batch_size,
                max_attempts = settings.max_attempts,
                "Forwarder configuration updated"
            );
        }

        let _ = self.reschedule.send(());
        Ok(())
    }

    /// Prunes synced entries past retention. Returns how many were deleted.
    pub async fn prune(&self) -> Result<u64, AppError> {
        let retention = self.settings.read().await.retention;
        let cutoff = Utc::now() - retention;
        let pruned = self.queue.prune(cutoff).await?;
        info!(pruned, "Synced entries pruned");
        Ok(pruned)
    }

    /// Current status snapshot.
    pub async fn status(&self) -> ForwarderStatus {
        let settings = self.settings.read().await;
        let status = self.status.read().await;
        ForwarderStatus {
            state: status.state,
            sync_interval_seconds: settings.sync_interval.as_secs(),
            batch_size: settings.batch_size,
            max_attempts: settings.max_attempts,
            last_drain: status.last_drain.clone(),
            last_drain_at: status.last_drain_at,
        }
    }

    /// Delivers claimed entries and applies per-record transitions.
    async fn deliver(
        &self,
        entries: Vec<QueueEntry>,
        max_attempts: i32,
    ) -> Result<DrainSummary, AppError> {
        let events: Vec<AttendanceEvent> = entries.iter().map(|e| e.event.0.clone()).collect();
        let outcomes = self.upstream.submit_many(&events).await;

        let mut summary = DrainSummary {
            claimed: entries.len(),
            ..DrainSummary::default()
        };

        for (entry, outcome) in entries.iter().zip(outcomes) {
            if outcome.success {
                self.queue.mark_synced(entry.id).await?;
                summary.synced += 1;
            } else {
                let error = outcome.error.as_deref().unwrap_or("Upstream delivery failed");
                let marked = self.queue.mark_failed(entry.id, error, max_attempts).await?;
                if marked.terminal {
                    summary.terminal += 1;
                } else {
                    summary.failed += 1;
                }
            }
        }

        info!(
            claimed = summary.claimed,
            synced = summary.synced,
            failed = summary.failed,
            terminal = summary.terminal,
            "Drain cycle complete"
        );

        Ok(summary)
    }

    /// Terminates lapsed sessions and deletes rows past retention.
    async fn session_sweep(&self) {
        match self.authority.sweep().await {
            Ok((expired, deleted)) if expired > 0 || deleted > 0 => {
                info!(expired, deleted, "Session sweep complete");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Session sweep failed"),
        }
    }

    /// Marks the forwarder draining, returning the state to restore after —
    /// a manual drain on a stopped forwarder must not leave it "running".
    async fn enter_draining(&self) -> ForwarderState {
        let mut status = self.status.write().await;
        let prev = status.state;
        status.state = ForwarderState::Draining;
        match prev {
            ForwarderState::Stopped => ForwarderState::Stopped,
            _ => ForwarderState::Running,
        }
    }

    async fn set_state(&self, state: ForwarderState) {
        self.status.write().await.state = state;
    }

    async fn record_summary(&self, summary: &DrainSummary) {
        let mut status = self.status.write().await;
        status.last_drain = Some(summary.clone());
        status.last_drain_at = Some(Utc::now());
    }
}
