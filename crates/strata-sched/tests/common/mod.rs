//! Common test infrastructure for scheduler scenario tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Mutex};
use strata_core::{BusMessage, Job, JobResources};
use strata_sched::JobTrigger;

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Records dispatched jobs instead of calling a backend.
pub struct RecordingTrigger {
    sent: Mutex<Vec<Job>>,
}

impl RecordingTrigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|job| job.job_id.to_string())
            .collect()
    }

    pub fn sent_jobs(&self) -> Vec<Job> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobTrigger for RecordingTrigger {
    async fn send(&self, job: &Job) {
        self.sent.lock().unwrap().push(job.clone());
    }
}

/// New-job event with a deadline `slack_secs` from now and an explicit
/// resource override.
pub fn new_job_msg_with_resources(
    id: &str,
    slack_secs: i64,
    resources: JobResources,
) -> BusMessage {
    let now = Utc::now().naive_utc();
    let value = json!({
        "job_type": "demand_forecasting_1hr",
        "job_parameters": {
            "num": 50,
            "resources": {
                "executors": resources.executors,
                "cpu": resources.cpu,
                "mem": resources.mem,
                "computing_time": resources.computing_time,
            },
        },
        "job_config": {
            "deadline": (now + chrono::Duration::seconds(slack_secs))
                .format(DATE_FORMAT)
                .to_string(),
            "request_time": now.format(DATE_FORMAT).to_string(),
        },
    });

    BusMessage::new("new_job", Some(id.to_string()), value)
}

/// New-job event resolving its demand from the catalog.
pub fn new_job_msg(id: &str, slack_secs: i64) -> BusMessage {
    let now = Utc::now().naive_utc();
    let value = json!({
        "job_type": "demand_forecasting_1hr",
        "job_parameters": { "num": 50, "resources": null },
        "job_config": {
            "deadline": (now + chrono::Duration::seconds(slack_secs))
                .format(DATE_FORMAT)
                .to_string(),
            "request_time": now.format(DATE_FORMAT).to_string(),
        },
    });

    BusMessage::new("new_job", Some(id.to_string()), value)
}

/// Job-complete event releasing the given resources.
pub fn complete_msg(cpu: i64, mem: i64) -> BusMessage {
    BusMessage::new("job_finish", None, json!({ "cpu": cpu, "mem": mem }))
}
