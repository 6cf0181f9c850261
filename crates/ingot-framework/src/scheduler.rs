//! Cron-driven background tasks contributed by plugins.
//!
//! Task specs are collected while plugins load and bound to triggers by
//! [`TaskScheduler::activate`]. Each bound task runs in its own tokio task
//! that sleeps until the next cron fire time, runs the action under
//! isolated failure handling, and loops. A failing action is logged with
//! the task's name and never cancels the trigger or touches other tasks.
//!
//! Activation is idempotent per process lifetime: a spec is bound at most
//! once, so a full registry refresh cannot duplicate triggers.

use std::str::FromStr;

use chrono::Local;
use cron::Schedule;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::plugin::TaskSpec;

struct TaskEntry {
    spec: TaskSpec,
    bound: bool,
}

struct ScheduledTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Collects plugin task specs and drives their cron triggers.
#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<Vec<TaskEntry>>,
    jobs: Mutex<Vec<ScheduledTask>>,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends task specs collected during plugin load.
    ///
    /// Specs without a name or cron expression are dropped.
    pub fn collect(&self, specs: Vec<TaskSpec>) {
        let mut tasks = self.tasks.lock();
        for spec in specs {
            if spec.name.is_empty() || spec.cron.is_empty() {
                continue;
            }
            tasks.push(TaskEntry { spec, bound: false });
        }
    }

    /// Number of collected specs.
    pub fn collected(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Number of live triggers.
    pub fn active(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Binds every collected, not-yet-bound spec to a cron trigger.
    pub fn activate(&self) {
        let mut tasks = self.tasks.lock();
        for entry in tasks.iter_mut().filter(|e| !e.bound) {
            entry.bound = true;
            let schedule = match parse_schedule(&entry.spec.cron) {
                Ok(schedule) => schedule,
                Err(err) => {
                    warn!(
                        task = %entry.spec.name,
                        cron = %entry.spec.cron,
                        error = %err,
                        "invalid cron expression, task not scheduled"
                    );
                    continue;
                }
            };

            let spec = entry.spec.clone();
            let name = spec.name.clone();
            let handle = tokio::spawn(run_task(schedule, spec));
            self.jobs.lock().push(ScheduledTask { name, handle });
        }
    }

    /// Aborts every live trigger.
    pub fn shutdown(&self) {
        let mut jobs = self.jobs.lock();
        for job in jobs.drain(..) {
            job.handle.abort();
            debug!(task = %job.name, "scheduled task aborted");
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for job in self.jobs.lock().drain(..) {
            job.handle.abort();
        }
    }
}

async fn run_task(schedule: Schedule, spec: TaskSpec) {
    loop {
        let now = Local::now();
        let Some(next) = schedule.after(&now).next() else {
            debug!(task = %spec.name, "cron expression has no future fire time, stopping");
            break;
        };
        let delay = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(delay).await;

        if spec.log {
            info!(task = %spec.name, "scheduled task started");
        }
        match (spec.run)().await {
            Ok(()) => {
                if spec.log {
                    info!(task = %spec.name, "scheduled task finished");
                }
            }
            Err(err) => {
                error!(task = %spec.name, error = %err, "scheduled task failed");
            }
        }
    }
}

/// Parses a cron expression, accepting plain 5-field crontab syntax by
/// prepending a seconds field.
fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    let trimmed = expr.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_owned()
    };
    Schedule::from_str(&normalized)
}
