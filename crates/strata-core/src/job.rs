//! Job entity and its deadline-derived ordering key.

use crate::error::{StrataError, StrataResult};
use crate::resources::JobResources;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Unique job identifier, carried as the message key of the new-job event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the job ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which entry of [`JobTimes`] the scheduler orders jobs by.
///
/// Datetime keys are compared as Unix seconds; `schedule_time` is already an
/// integer number of slack seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKeyName {
    /// Remaining slack in seconds (default).
    #[default]
    ScheduleTime,
    /// Absolute deadline.
    Deadline,
    /// Time the job was requested.
    RequestTime,
}

impl FromStr for SortKeyName {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule_time" => Ok(Self::ScheduleTime),
            "deadline" => Ok(Self::Deadline),
            "request_time" => Ok(Self::RequestTime),
            other => Err(StrataError::configuration(format!(
                "unknown JOB_SORT_KEY: {other}"
            ))),
        }
    }
}

/// Absolute timestamps of a job plus the derived scheduling slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTimes {
    /// Latest acceptable completion time.
    pub deadline: NaiveDateTime,

    /// Time the upstream producer requested the job.
    pub request_time: NaiveDateTime,

    /// Seconds of slack; recomputed by [`Job::renew_priority`].
    pub schedule_time: i64,
}

/// A job awaiting execution.
///
/// Identity and parameters are immutable after construction; only
/// `job_times.schedule_time` (and with it `sort_key`) moves as deadlines
/// approach, and `job_resources` is filled in once at ingress from the
/// resource catalog or a caller-supplied override.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique identifier from the event key.
    pub job_id: JobId,

    /// Key into the resource catalog.
    pub job_type: String,

    /// Opaque parameters forwarded on dispatch. Carries the workload-size
    /// hint `num` and an optional `resources` override.
    pub job_params: Map<String, Value>,

    /// Deadline, request time, and derived slack.
    pub job_times: JobTimes,

    /// Resource demand, resolved at ingress.
    pub job_resources: JobResources,

    /// Current ordering key; equals the configured [`JobTimes`] entry.
    pub sort_key: i64,

    sort_key_name: SortKeyName,
}

impl Job {
    /// Builds a job from a new-job event.
    ///
    /// `key` is the message key (the job ID), `value` the decoded JSON
    /// payload. Fails with [`StrataError::MalformedJob`] when a required
    /// field is missing or a timestamp does not match `date_format`.
    pub fn from_event(
        key: Option<&str>,
        value: &Value,
        date_format: &str,
        sort_key_name: SortKeyName,
    ) -> StrataResult<Self> {
        let job_id = key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| StrataError::malformed_job("missing message key (job_id)"))?;

        let job_type = value
            .get("job_type")
            .and_then(Value::as_str)
            .ok_or_else(|| StrataError::malformed_job("missing job_type"))?;

        let job_params = value
            .get("job_parameters")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| StrataError::malformed_job("missing job_parameters"))?;

        let job_config = value
            .get("job_config")
            .and_then(Value::as_object)
            .ok_or_else(|| StrataError::malformed_job("missing job_config"))?;

        let deadline = parse_time(job_config, "deadline", date_format)?;
        let request_time = parse_time(job_config, "request_time", date_format)?;
        let schedule_time = (deadline - request_time).num_seconds();

        let mut job = Self {
            job_id: JobId::from(job_id),
            job_type: job_type.to_string(),
            job_params,
            job_times: JobTimes {
                deadline,
                request_time,
                schedule_time,
            },
            job_resources: JobResources::default(),
            sort_key: 0,
            sort_key_name,
        };
        job.refresh_sort_key();

        Ok(job)
    }

    /// Recomputes the slack against the current clock:
    /// `schedule_time = deadline - now - computing_time`, floored at 0 so
    /// overdue jobs classify into the most urgent level.
    pub fn renew_priority(&mut self, now: NaiveDateTime) {
        let slack =
            (self.job_times.deadline - now).num_seconds() - self.job_resources.computing_time;
        self.job_times.schedule_time = slack.max(0);
        self.refresh_sort_key();
    }

    /// Subtracts the resolved computing time from the slack. Done once at
    /// ingress, after the resource demand is known.
    pub fn discount_computing_time(&mut self) {
        self.job_times.schedule_time -= self.job_resources.computing_time;
        self.refresh_sort_key();
    }

    /// Workload-size hint from the job parameters.
    #[must_use]
    pub fn num(&self) -> Option<i64> {
        self.job_params.get("num").and_then(Value::as_i64)
    }

    /// Caller-supplied resource override, when the `resources` parameter is
    /// present and non-null.
    pub fn resources_override(&self) -> StrataResult<Option<JobResources>> {
        match self.job_params.get("resources") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let demand: JobResources = serde_json::from_value(value.clone())
                    .map_err(|e| StrataError::malformed_job(format!("bad resources override: {e}")))?;
                Ok(Some(demand))
            }
        }
    }

    fn refresh_sort_key(&mut self) {
        self.sort_key = match self.sort_key_name {
            SortKeyName::ScheduleTime => self.job_times.schedule_time,
            SortKeyName::Deadline => self.job_times.deadline.and_utc().timestamp(),
            SortKeyName::RequestTime => self.job_times.request_time.and_utc().timestamp(),
        };
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.job_id, self.job_type, self.sort_key)
    }
}

fn parse_time(
    config: &Map<String, Value>,
    field: &str,
    format: &str,
) -> StrataResult<NaiveDateTime> {
    let raw = config
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| StrataError::malformed_job(format!("missing job_config.{field}")))?;

    NaiveDateTime::parse_from_str(raw, format)
        .map_err(|e| StrataError::malformed_job(format!("bad job_config.{field} ({raw}): {e}")))
}
