//! Schedule Manager
//!
//! Owns the single recurring job that posts unprompted statements:
//! - Idle / Armed state machine, disarm-then-arm on every re-arm
//! - Error hook injected at construction; a failing tick is reported and
//!   the schedule keeps firing
//! - No backoff or retry: the next tick always runs on time

use crate::alert::AlertSink;
use crate::model::TextModel;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised while arming the schedule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid interval '{0}'")]
    InvalidInterval(String),
}

/// Identity of one registered job
pub type JobId = Uuid;

/// Body of a recurring job, invoked once per tick
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Invoked with the job's identity whenever a tick fails
pub type ErrorHook = Arc<dyn Fn(JobId, anyhow::Error) -> BoxFuture<'static, ()> + Send + Sync>;

/// Interval in both human-readable and parsed form.
///
/// Grammar: one or more `<n><unit>` pairs with units `ms`, `s`, `m`, `h`,
/// `d`, `w` (`25m`, `1h30m`). A bare number is seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSpec {
    original: String,
    period: Duration,
}

impl IntervalSpec {
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let original = input.trim().to_string();
        let invalid = || ScheduleError::InvalidInterval(input.to_string());

        if original.is_empty() {
            return Err(invalid());
        }
        if let Ok(secs) = original.parse::<u64>() {
            return Self::checked(original, Duration::from_secs(secs)).ok_or_else(invalid);
        }

        let mut total_ms: u64 = 0;
        let mut rest = original.as_str();
        while !rest.is_empty() {
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return Err(invalid());
            }
            let n: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];

            let unit_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
            let unit_ms: u64 = match rest[..unit_len].to_ascii_lowercase().as_str() {
                "ms" => 1,
                "s" => 1_000,
                "m" => 60_000,
                "h" => 3_600_000,
                "d" => 86_400_000,
                "w" => 604_800_000,
                _ => return Err(invalid()),
            };
            rest = &rest[unit_len..];

            total_ms = n
                .checked_mul(unit_ms)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(invalid)?;
        }

        Self::checked(original, Duration::from_millis(total_ms)).ok_or_else(invalid)
    }

    fn checked(original: String, period: Duration) -> Option<Self> {
        (!period.is_zero()).then_some(Self { original, period })
    }

    /// The interval as configured, e.g. `25m`
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Cancellation capability for a registered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
}

/// Primitive for recurring jobs
pub trait JobScheduler: Send + Sync {
    /// Install the hook that receives job errors
    fn register_error_hook(&self, hook: ErrorHook);

    /// Run `callback` every `interval`, first tick one interval from now
    fn schedule(&self, interval: &IntervalSpec, callback: JobCallback) -> JobHandle;

    fn cancel(&self, handle: &JobHandle);

    /// Number of jobs currently registered
    fn active_jobs(&self) -> usize;
}

/// `JobScheduler` on tokio timers, one task per job
#[derive(Default)]
pub struct TokioJobScheduler {
    jobs: parking_lot::Mutex<HashMap<JobId, JoinHandle<()>>>,
    error_hook: parking_lot::RwLock<Option<ErrorHook>>,
}

impl TokioJobScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobScheduler for TokioJobScheduler {
    fn register_error_hook(&self, hook: ErrorHook) {
        *self.error_hook.write() = Some(hook);
    }

    fn schedule(&self, interval: &IntervalSpec, callback: JobCallback) -> JobHandle {
        let id = Uuid::new_v4();
        let period = interval.period();
        let hook = self.error_hook.read().clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("Job {} tick", id);

                if let Err(e) = callback().await {
                    match &hook {
                        Some(hook) => hook(id, e).await,
                        None => warn!("Job {} failed: {}", id, e),
                    }
                }
            }
        });

        self.jobs.lock().insert(id, task);
        JobHandle { id }
    }

    fn cancel(&self, handle: &JobHandle) {
        if let Some(task) = self.jobs.lock().remove(&handle.id) {
            task.abort();
            debug!("Job {} cancelled", handle.id);
        }
    }

    fn active_jobs(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Drop for TokioJobScheduler {
    fn drop(&mut self) {
        for (_, task) in self.jobs.lock().drain() {
            task.abort();
        }
    }
}

/// The active recurring job
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    pub job: JobHandle,
    pub interval: IntervalSpec,
    pub armed_at: DateTime<Utc>,
}

/// Error hook that reports job failures to the owner
pub fn alert_hook(alerts: AlertSink) -> ErrorHook {
    Arc::new(move |id: JobId, error: anyhow::Error| {
        let alerts = alerts.clone();
        async move {
            let msg = format!("Scheduler intercepted error in job {}: {}", id, error);
            alerts.notify(&msg).await;
        }
        .boxed()
    })
}

/// Job that composes one statement and posts it
pub fn posting_job(model: Arc<dyn TextModel>, transport: Arc<dyn Transport>) -> JobCallback {
    Arc::new(move || post_statement(model.clone(), transport.clone()).boxed())
}

async fn post_statement(
    model: Arc<dyn TextModel>,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<()> {
    let statement = model.compose_statement().await?;
    let id = transport.post(&statement).await?;
    info!("Posted {}: {}", id, statement);
    Ok(())
}

pub struct ScheduleManager {
    scheduler: Arc<dyn JobScheduler>,
    alerts: AlertSink,
    current: tokio::sync::Mutex<Option<ScheduleHandle>>,
}

impl ScheduleManager {
    /// Registers `on_error` with the scheduler once, here
    pub fn new(scheduler: Arc<dyn JobScheduler>, on_error: ErrorHook, alerts: AlertSink) -> Self {
        scheduler.register_error_hook(on_error);
        Self {
            scheduler,
            alerts,
            current: tokio::sync::Mutex::new(None),
        }
    }

    /// Replace any active job with `job` running every `interval`
    pub async fn arm(&self, interval: IntervalSpec, job: JobCallback) -> ScheduleHandle {
        let handle = {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.take() {
                self.scheduler.cancel(&previous.job);
                info!("Disarmed job {} ({})", previous.job.id, previous.interval);
            }

            let handle = ScheduleHandle {
                job: self.scheduler.schedule(&interval, job),
                interval,
                armed_at: Utc::now(),
            };
            *current = Some(handle.clone());
            handle
        };

        self.alerts
            .notify(&format!("Now posting every {}.", handle.interval))
            .await;
        handle
    }

    /// Cancel the active job, if any
    pub async fn disarm(&self) -> Option<ScheduleHandle> {
        let previous = self.current.lock().await.take();
        if let Some(previous) = &previous {
            self.scheduler.cancel(&previous.job);
            info!("Disarmed job {} ({})", previous.job.id, previous.interval);
        }
        previous
    }

    pub async fn current(&self) -> Option<ScheduleHandle> {
        self.current.lock().await.clone()
    }

    pub async fn is_armed(&self) -> bool {
        self.current.lock().await.is_some()
    }
}
