//! The scheduling core: admission, selection, dispatch, reallocation.

use crate::job_selector::{job_selector_for, JobSelector, SelectError};
use crate::monitor::CapacityMonitor;
use crate::queue_selector::{queue_selector_for, QueueSelector};
use crate::staging::{build_stage_lists, StageQueueKind, StagingQueue};
use crate::trigger::JobTrigger;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use strata_config::AppConfig;
use strata_core::{BusMessage, Job, LevelLimits, SortKeyName, StrataResult, SystemResources};
use tracing::{debug, error, info, warn};

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A job was dispatched and capacity debited.
    Dispatched,
    /// No queue yielded a feasible job; the drain loop stops.
    Empty,
}

/// Behavioral knobs of the consumer, split off so construction stays
/// readable.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Topic carrying new-job notifications.
    pub topic_new_job: String,

    /// Topic carrying job-complete notifications.
    pub topic_job_complete: String,

    /// Format for parsing inbound job timestamps.
    pub date_format: String,

    /// Which job time orders the staging queues.
    pub sort_key_name: SortKeyName,

    /// Renew the target level's priorities before every insert.
    pub is_renew_before_insert: bool,
}

impl ConsumerOptions {
    /// Extracts the options from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> StrataResult<Self> {
        Ok(Self {
            topic_new_job: config.kafka.topic_new_job_notify.clone(),
            topic_job_complete: config.kafka.topic_job_complete_notify.clone(),
            date_format: config.date_format.clone(),
            sort_key_name: config.sort_key_name()?,
            is_renew_before_insert: config.scheduler.is_renew_before_insert,
        })
    }
}

/// Consumes bus events, stages jobs by deadline slack, and dispatches them
/// while capacity lasts.
///
/// All state lives here and mutates on one task: the staging queues, the
/// capacity monitor, and both selector cursors. The only async edges are
/// the trigger call and the caller's bus poll.
pub struct JobConsumer {
    options: ConsumerOptions,
    level_limits: LevelLimits,
    stage_lists: Vec<Box<dyn StagingQueue>>,
    monitor: CapacityMonitor,
    queue_selector: Box<dyn QueueSelector>,
    job_selector: Box<dyn JobSelector>,
    trigger: Arc<dyn JobTrigger>,
}

impl JobConsumer {
    /// Creates a consumer from explicit parts.
    #[must_use]
    pub fn new(
        options: ConsumerOptions,
        level_limits: LevelLimits,
        stage_lists: Vec<Box<dyn StagingQueue>>,
        monitor: CapacityMonitor,
        queue_selector: Box<dyn QueueSelector>,
        job_selector: Box<dyn JobSelector>,
        trigger: Arc<dyn JobTrigger>,
    ) -> Self {
        Self {
            options,
            level_limits,
            stage_lists,
            monitor,
            queue_selector,
            job_selector,
            trigger,
        }
    }

    /// Wires the consumer from configuration: staging variant, level
    /// limits, capacity monitor, and both selection strategies.
    pub fn from_config(config: &AppConfig, trigger: Arc<dyn JobTrigger>) -> StrataResult<Self> {
        let level_limits = config.level_limits()?;
        let kind: StageQueueKind = config.scheduler.stage_queue.parse()?;

        Ok(Self::new(
            ConsumerOptions::from_config(config)?,
            level_limits.clone(),
            build_stage_lists(kind, level_limits.total_level()),
            CapacityMonitor::from_config(config)?,
            queue_selector_for(config)?,
            job_selector_for(&config.selection.job_select_method)?,
            trigger,
        ))
    }

    /// Handles one bus event.
    ///
    /// New-job events admit a job and then drain: dispatch until capacity
    /// runs out or no queue yields a feasible job. Complete events credit
    /// capacity back and attempt a single dispatch. Per-message errors are
    /// logged and dropped; the consumer never stops on them.
    pub async fn consume_msg(&mut self, msg: &BusMessage) {
        if msg.topic == self.options.topic_new_job {
            match Job::from_event(
                msg.key.as_deref(),
                &msg.value,
                &self.options.date_format,
                self.options.sort_key_name,
            ) {
                Ok(job) => self.admit_job(job, wall_now()),
                Err(e) => warn!(error = %e, "Dropping malformed new-job event"),
            }

            self.drain().await;
        } else if msg.topic == self.options.topic_job_complete {
            let cpu = msg.value.get("cpu").and_then(Value::as_i64);
            let mem = msg.value.get("mem").and_then(Value::as_i64);
            match (cpu, mem) {
                (Some(cpu), Some(mem)) => {
                    self.monitor.update_current_system_resources(cpu, mem);
                    debug!(
                        resources = ?self.monitor.fetch_current_system_resources(),
                        "Resources released"
                    );
                    let _ = self.send_next().await;
                }
                _ => warn!(value = %msg.value, "Dropping malformed job-complete event"),
            }
        } else {
            debug!(topic = %msg.topic, "Ignoring message on unmonitored topic");
        }
    }

    /// Resolves resources, classifies, and stages a new job.
    fn admit_job(&mut self, mut job: Job, now: NaiveDateTime) {
        match self.monitor.get_single_job_resources(&job) {
            Ok(demand) => job.job_resources = demand,
            Err(e) => {
                error!(job = %job, error = %e, "Dropping job with unknown type");
                return;
            }
        }

        match job.resources_override() {
            Ok(Some(demand)) => job.job_resources = demand,
            Ok(None) => {
                // No caller override: derive the computing time from the
                // workload-size hint.
                if let Some(num) = job.num() {
                    job.job_resources.computing_time = computing_time_for(num);
                }
            }
            Err(e) => {
                warn!(job = %job, error = %e, "Dropping job with bad resources override");
                return;
            }
        }

        job.discount_computing_time();
        debug!(schedule_time = job.job_times.schedule_time, job = %job, "Classifying job");

        let level = self.level_limits.level_for(job.sort_key);
        if self.options.is_renew_before_insert {
            self.stage_lists[level].renew_jobs_priority(now);
        }

        self.stage_lists[level].insert(job);
    }

    /// Greedy dispatch: keep sending until free CPU drops below 1 or the
    /// selection comes back empty.
    async fn drain(&mut self) {
        while self.monitor.fetch_current_system_resources().cpu >= 1 {
            if self.send_next().await == DrainOutcome::Empty {
                return;
            }
        }

        warn!(
            resources = ?self.monitor.fetch_current_system_resources(),
            "No more resources"
        );
    }

    /// One dispatch attempt: queue selection, job selection with
    /// cross-level fallback, removal, dispatch, debit.
    pub async fn send_next(&mut self) -> DrainOutcome {
        let Some(job) = self.pick_next_job() else {
            warn!("No staging or valid job in all queues");
            for queue in &self.stage_lists {
                debug!(level = queue.level(), jobs = queue.len(), "Queue status");
            }
            return DrainOutcome::Empty;
        };

        info!(job = %job, resources = ?job.job_resources, times = ?job.job_times, "Pick job");
        self.trigger.send(&job).await;
        self.monitor
            .update_current_system_resources(-job.job_resources.cpu, -job.job_resources.mem);

        DrainOutcome::Dispatched
    }

    fn pick_next_job(&mut self) -> Option<Job> {
        let free = self.monitor.fetch_current_system_resources();
        let level = self.queue_selector.select_queue(&self.stage_lists);
        info!(
            level,
            length = self.stage_lists[level].len(),
            "Current queue"
        );

        let view = self.stage_lists[level].jobs();
        match self.job_selector.select_job(&view, &free) {
            Ok(job) => {
                let job_id = job.job_id.clone();
                self.stage_lists[level].remove(&job_id)
            }
            Err(SelectError::EmptyList) => None,
            Err(e @ SelectError::NoValidJob { .. }) => {
                warn!(level, error = %e, "No feasible job at selected level");
                self.repick_from_other_levels(level, &free)
            }
        }
    }

    /// Cross-level fallback: walk the remaining levels in numeric order and
    /// take the first feasible job.
    fn repick_from_other_levels(
        &mut self,
        invalid_level: usize,
        free: &SystemResources,
    ) -> Option<Job> {
        let candidates: Vec<usize> = (0..self.stage_lists.len())
            .filter(|level| *level != invalid_level && !self.stage_lists[*level].is_empty())
            .collect();
        warn!(?candidates, "Other non-empty queues");

        for level in candidates {
            let view = self.stage_lists[level].jobs();
            match self.job_selector.select_job(&view, free) {
                Ok(job) => {
                    let job_id = job.job_id.clone();
                    warn!(level, "Final pick level");
                    return self.stage_lists[level].remove(&job_id);
                }
                Err(e) => {
                    warn!(level, error = %e, "Skipping level");
                }
            }
        }

        None
    }

    /// Periodic re-prioritization pass against the wall clock.
    pub fn reallocate(&mut self) {
        self.reallocate_at(wall_now());
    }

    /// Re-prioritization pass against an explicit clock.
    ///
    /// Every level's priorities are renewed; jobs whose shrunken slack now
    /// classifies them into a more urgent level are migrated there. Only
    /// the overflow level may keep jobs whose slack exceeds its bounds.
    pub fn reallocate_at(&mut self, now: NaiveDateTime) {
        for level in 0..self.stage_lists.len() {
            self.stage_lists[level].renew_jobs_priority(now);
            if level == 0 {
                continue;
            }

            loop {
                let migration = match self.stage_lists[level].peek() {
                    Some(job) => {
                        let target = self.level_limits.level_for(job.sort_key);
                        (target < level).then(|| (job.job_id.clone(), target))
                    }
                    None => None,
                };

                let Some((job_id, target)) = migration else {
                    break;
                };
                let Some(job) = self.stage_lists[level].remove(&job_id) else {
                    break;
                };

                debug!(from = level, to = target, job = %job, "Reallocating job");
                self.stage_lists[target].insert(job);
            }
        }
    }

    /// Free capacity snapshot.
    #[must_use]
    pub fn free_resources(&self) -> SystemResources {
        self.monitor.fetch_current_system_resources()
    }

    /// Number of staged jobs per level.
    #[must_use]
    pub fn queue_lengths(&self) -> Vec<usize> {
        self.stage_lists.iter().map(|queue| queue.len()).collect()
    }

    /// Ordered view of one level's staged jobs.
    #[must_use]
    pub fn jobs_at(&self, level: usize) -> Vec<&Job> {
        self.stage_lists[level].jobs()
    }
}

fn wall_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Computing time derived from the workload-size hint:
/// `floor((num - 50) / 50 * 15 + 30)` seconds.
fn computing_time_for(num: i64) -> i64 {
    (((num - 50) as f64 / 50.0) * 15.0 + 30.0).floor() as i64
}
