//! Agent runtime - drives a dispatcher from its notification inbox
//!
//! Every notification becomes a task in a [`JoinSet`]. Tasks for the same job
//! id are serialized behind a per-job mutex; different jobs run concurrently.
//! A failed task is logged with its job id and phase and never stops the loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use acp_types::{JobId, Notification};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::env::AgentRole;
use crate::error::Result;

/// Reacts to one notification
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    fn role(&self) -> AgentRole;

    async fn handle(&self, notification: Notification) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How long in-flight tasks may run after shutdown before being aborted
    pub drain_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Task counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub handled: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl RunSummary {
    fn record(&mut self, joined: std::result::Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(TaskOutcome::Handled) => self.handled += 1,
            Ok(TaskOutcome::Failed) => self.failed += 1,
            Err(e) if e.is_cancelled() => self.aborted += 1,
            Err(e) => {
                error!(error = %e, "task panicked");
                self.failed += 1;
            }
        }
    }
}

enum TaskOutcome {
    Handled,
    Failed,
}

type JobLocks = DashMap<JobId, Arc<Mutex<()>>>;

/// A task's claim on its job's mutex. Dropping it, on completion or abort,
/// removes the map entry once no other task holds the same job.
struct JobSlot {
    locks: Arc<JobLocks>,
    job_id: JobId,
    lock: Option<Arc<Mutex<()>>>,
}

impl JobSlot {
    fn claim(locks: &Arc<JobLocks>, job_id: JobId) -> Self {
        let lock = locks.entry(job_id).or_default().clone();
        Self {
            locks: Arc::clone(locks),
            job_id,
            lock: Some(lock),
        }
    }

    async fn acquire(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        // release our reference first so the count only sees other tasks
        self.lock.take();
        self.locks
            .remove_if(&self.job_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct AgentRuntime<H: TaskHandler> {
    handler: Arc<H>,
    inbox: mpsc::Receiver<Notification>,
    config: RuntimeConfig,
    locks: Arc<JobLocks>,
}

impl<H: TaskHandler> AgentRuntime<H> {
    pub fn new(handler: Arc<H>, inbox: mpsc::Receiver<Notification>, config: RuntimeConfig) -> Self {
        Self {
            handler,
            inbox,
            config,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Handle notifications until `shutdown` resolves or the inbox closes,
    /// then drain in-flight tasks.
    pub async fn run<F>(self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let Self {
            handler,
            mut inbox,
            config,
            locks,
        } = self;
        let role = handler.role();
        let mut tasks = JoinSet::new();
        let mut summary = RunSummary::default();

        info!(%role, "agent runtime started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(%role, "shutdown requested");
                    break;
                }
                received = inbox.recv() => match received {
                    Some(notification) => spawn_task(&mut tasks, &handler, &locks, notification),
                    None => {
                        info!(%role, "notification channel closed");
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => summary.record(joined),
            }
        }

        inbox.close();
        drain(&mut tasks, &mut summary, config.drain_timeout).await;

        info!(
            %role,
            handled = summary.handled,
            failed = summary.failed,
            aborted = summary.aborted,
            "agent runtime stopped"
        );
        summary
    }
}

fn spawn_task<H: TaskHandler>(
    tasks: &mut JoinSet<TaskOutcome>,
    handler: &Arc<H>,
    locks: &Arc<JobLocks>,
    notification: Notification,
) {
    let job_id = notification.job.id;
    let phase = notification.job.phase;
    let slot = JobSlot::claim(locks, job_id);
    let handler = Arc::clone(handler);
    let span = info_span!("task", role = %handler.role(), job_id = %job_id, phase = %phase);

    tasks.spawn(
        async move {
            let result = {
                let _guard = slot.acquire().await;
                handler.handle(notification).await
            };
            drop(slot);

            match result {
                Ok(()) => {
                    debug!("task handled");
                    TaskOutcome::Handled
                }
                Err(e) => {
                    error!(job_id = %job_id, phase = %phase, error = %e, "task failed");
                    TaskOutcome::Failed
                }
            }
        }
        .instrument(span),
    );
}

async fn drain(tasks: &mut JoinSet<TaskOutcome>, summary: &mut RunSummary, timeout: Duration) {
    if tasks.is_empty() {
        return;
    }
    info!(in_flight = tasks.len(), "draining in-flight tasks");

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, tasks.join_next()).await {
            Ok(Some(joined)) => summary.record(joined),
            Ok(None) => return,
            Err(_) => {
                warn!(remaining = tasks.len(), "drain timeout elapsed, aborting tasks");
                tasks.abort_all();
                while let Some(joined) = tasks.join_next().await {
                    summary.record(joined);
                }
                return;
            }
        }
    }
}
