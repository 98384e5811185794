//! Permanent removal of soft-deleted rows.
//!
//! A sweep purges keys, then namespaces, then users, then credentials. Each
//! step is its own store transaction and re-reads its target set, so a failed
//! step never blocks the ones after it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SweeperConfig;
use crate::error::Result;
use crate::store::Store;
use crate::types::RetentionCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStep {
    Count,
    Keys,
    Namespaces,
    Users,
    Credentials,
}

impl fmt::Display for SweepStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepStep::Count => "count",
            SweepStep::Keys => "keys",
            SweepStep::Namespaces => "namespaces",
            SweepStep::Users => "users",
            SweepStep::Credentials => "credentials",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: SweepStep,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// What was waiting before the sweep started.
    pub pending: RetentionCounts,
    pub keys_purged: usize,
    pub namespaces_purged: usize,
    pub users_purged: usize,
    /// Deleted users kept because they still own an active namespace.
    pub users_skipped: Vec<i64>,
    pub credentials_purged: usize,
    pub failures: Vec<StepFailure>,
}

impl SweepReport {
    #[must_use]
    pub fn total_purged(&self) -> usize {
        self.keys_purged + self.namespaces_purged + self.users_purged + self.credentials_purged
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RetentionSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    log_detailed: bool,
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, log_detailed: bool) -> Self {
        Self {
            store,
            clock,
            log_detailed,
        }
    }

    /// Runs one full sweep. Blocking; call from a blocking context.
    pub fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        if let Some(pending) = self.step(&mut report, SweepStep::Count, || {
            self.store.retention_counts(self.clock.now())
        }) {
            if self.log_detailed {
                info!(
                    keys = pending.keys,
                    namespaces = pending.namespaces,
                    users = pending.users,
                    credentials = pending.credentials,
                    expired_credentials = pending.expired_credentials,
                    "retention sweep starting"
                );
            }
            report.pending = pending;
        }

        if let Some(purged) = self.step(&mut report, SweepStep::Keys, || {
            self.store.purge_deleted_keys()
        }) {
            report.keys_purged = purged;
        }

        if let Some(purged) = self.step(&mut report, SweepStep::Namespaces, || {
            self.store.purge_deleted_namespaces()
        }) {
            report.namespaces_purged = purged;
        }

        if let Some(outcome) = self.step(&mut report, SweepStep::Users, || {
            self.store.purge_deleted_users()
        }) {
            for user_id in &outcome.skipped {
                warn!(user_id, "skipping purge of deleted user who still owns an active namespace");
            }
            report.users_purged = outcome.purged;
            report.users_skipped = outcome.skipped;
        }

        if let Some(purged) = self.step(&mut report, SweepStep::Credentials, || {
            self.store.purge_dead_credentials(self.clock.now())
        }) {
            report.credentials_purged = purged;
        }

        info!(
            keys = report.keys_purged,
            namespaces = report.namespaces_purged,
            users = report.users_purged,
            credentials = report.credentials_purged,
            failures = report.failures.len(),
            "retention sweep finished"
        );
        report
    }

    fn step<T>(
        &self,
        report: &mut SweepReport,
        step: SweepStep,
        op: impl FnOnce() -> Result<T>,
    ) -> Option<T> {
        match op() {
            Ok(value) => {
                debug!(%step, "sweep step complete");
                Some(value)
            }
            Err(e) => {
                error!(%step, "sweep step failed: {e}");
                report.failures.push(StepFailure {
                    step,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

/// Runs the sweeper on a fixed interval until told to stop.
pub struct SweepScheduler {
    sweeper: Arc<RetentionSweeper>,
    config: SweeperConfig,
    shutdown_tx: broadcast::Sender<()>,
    completed: AtomicU64,
}

impl SweepScheduler {
    #[must_use]
    pub fn new(sweeper: Arc<RetentionSweeper>, config: SweeperConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            sweeper,
            config,
            shutdown_tx,
            completed: AtomicU64::new(0),
        }
    }

    /// Start the background task. Returns a handle to it.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            self.run(shutdown_rx).await;
        })
    }

    /// Signal the task to stop. A sweep already running finishes first.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of sweeps finished so far.
    #[must_use]
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            start_delay_secs = self.config.start_delay().as_secs(),
            interval_secs = self.config.interval().as_secs(),
            "retention sweeper scheduled"
        );

        tokio::select! {
            () = sleep(self.config.start_delay()) => {}
            _ = shutdown_rx.recv() => {
                info!("retention sweeper stopped before first run");
                return;
            }
        }

        let mut ticker = interval(self.config.interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => break,
            }

            let sweeper = Arc::clone(&self.sweeper);
            match tokio::task::spawn_blocking(move || sweeper.run_once()).await {
                Ok(report) if !report.is_clean() => {
                    warn!(failures = report.failures.len(), "retention sweep finished with failures");
                }
                Ok(_) => {}
                Err(e) => error!("retention sweep task failed: {e}"),
            }
            self.completed.fetch_add(1, Ordering::Relaxed);
        }

        info!("retention sweeper stopped");
    }
}
