//! Job trigger implementations.
//!
//! A trigger serializes a picked job and pushes it to the execution
//! backend: the job-launch API, an Airflow dag-run endpoint, or nowhere at
//! all for local experiments.

use crate::http::post_json;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use strata_config::{AppConfig, Experiment};
use strata_core::{Job, StrataError, StrataResult};
use tracing::info;

/// Builds the configured trigger.
pub fn job_trigger_for(config: &AppConfig) -> StrataResult<Arc<dyn strata_sched::JobTrigger>> {
    let experiment = Experiment::from_config(config);
    let client = Client::builder()
        .timeout(Duration::from_secs(config.trigger.trigger_timeout_secs))
        .build()
        .map_err(|e| StrataError::internal(format!("cannot build HTTP client: {e}")))?;

    match config.trigger.job_trigger_method.as_str() {
        "test" => Ok(Arc::new(TestTrigger)),
        "api" => Ok(Arc::new(ApiTrigger {
            client,
            url: config.trigger.job_trigger_url.clone(),
            date_format: config.date_format.clone(),
            experiment,
        })),
        "airflow" => Ok(Arc::new(AirflowTrigger {
            client,
            url: config.trigger.airflow_url.clone(),
            date_format: config.date_format.clone(),
        })),
        other => Err(StrataError::configuration(format!(
            "unknown JOB_TRIGGER_METHOD: {other}"
        ))),
    }
}

/// Logs the dispatch without any I/O. For local experiments.
pub struct TestTrigger;

#[async_trait]
impl strata_sched::JobTrigger for TestTrigger {
    async fn send(&self, job: &Job) {
        info!(job = %job, "Fake send success");
    }
}

/// POSTs the job to the job-launch service.
pub struct ApiTrigger {
    client: Client,
    url: String,
    date_format: String,
    experiment: Experiment,
}

impl ApiTrigger {
    /// Creates the trigger.
    #[must_use]
    pub fn new(client: Client, url: String, date_format: String, experiment: Experiment) -> Self {
        Self {
            client,
            url,
            date_format,
            experiment,
        }
    }

    fn body(&self, job: &Job) -> Value {
        json!({
            "job_id": job.job_id,
            "job_type": job.job_type,
            "job_params": merged_params(job, &self.experiment),
            "job_times": job_times_json(job, &self.date_format),
            "job_resources": job.job_resources,
        })
    }
}

#[async_trait]
impl strata_sched::JobTrigger for ApiTrigger {
    async fn send(&self, job: &Job) {
        post_json(&self.client, &self.url, &self.body(job)).await;
    }
}

/// POSTs the job as an Airflow dag-run `conf` envelope.
pub struct AirflowTrigger {
    client: Client,
    url: String,
    date_format: String,
}

impl AirflowTrigger {
    /// Creates the trigger.
    #[must_use]
    pub fn new(client: Client, url: String, date_format: String) -> Self {
        Self {
            client,
            url,
            date_format,
        }
    }

    fn body(&self, job: &Job) -> Value {
        // Airflow takes nested documents as strings inside `conf`.
        let params = Value::Object(job.job_params.clone());
        json!({
            "conf": {
                "job_id": job.job_id,
                "job_type": job.job_type,
                "job_params": params.to_string(),
                "job_times": job_times_json(job, &self.date_format).to_string(),
                "resources": serde_json::to_string(&job.job_resources).unwrap_or_default(),
                "num": job.num(),
                "request_time": job.job_times.request_time.format(&self.date_format).to_string(),
                "deadline": job.job_times.deadline.format(&self.date_format).to_string(),
                "executors": job.job_resources.executors,
                "cpu": job.job_resources.cpu,
                "mem": job.job_resources.mem,
                "computing_time": job.job_resources.computing_time,
            }
        })
    }
}

#[async_trait]
impl strata_sched::JobTrigger for AirflowTrigger {
    async fn send(&self, job: &Job) {
        post_json(&self.client, &self.url, &self.body(job)).await;
    }
}

/// Job times with timestamps re-serialized in the configured format and the
/// slack passed through as integer seconds.
fn job_times_json(job: &Job, date_format: &str) -> Value {
    json!({
        "deadline": job.job_times.deadline.format(date_format).to_string(),
        "request_time": job.job_times.request_time.format(date_format).to_string(),
        "schedule_time": job.job_times.schedule_time,
    })
}

/// Job parameters enriched with the experiment snapshot.
fn merged_params(job: &Job, experiment: &Experiment) -> Value {
    let mut params = job.job_params.clone();
    if let Value::Object(snapshot) = experiment.snapshot() {
        for (key, value) in snapshot {
            params.insert(key, value);
        }
    }

    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_config::AppConfig;
    use strata_core::{JobResources, SortKeyName};
    use strata_sched::JobTrigger;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    fn job() -> Job {
        let value = json!({
            "job_type": "demand_forecasting_1hr",
            "job_parameters": { "num": 80 },
            "job_config": {
                "deadline": "2024-05-01T10:06:40",
                "request_time": "2024-05-01T10:00:00",
            },
        });

        let mut job = Job::from_event(
            Some("job-1"),
            &value,
            DATE_FORMAT,
            SortKeyName::ScheduleTime,
        )
        .unwrap();
        job.job_resources = JobResources {
            executors: 1,
            cpu: 1,
            mem: 1,
            computing_time: 5,
        };
        job
    }

    fn experiment() -> Experiment {
        Experiment::from_config(&AppConfig::default())
    }

    #[tokio::test]
    async fn test_api_trigger_posts_job_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trigger/spark"))
            .and(header("Cache-Control", "no-cache"))
            .and(body_partial_json(json!({
                "job_id": "job-1",
                "job_type": "demand_forecasting_1hr",
                "job_times": {
                    "deadline": "2024-05-01T10:06:40",
                    "request_time": "2024-05-01T10:00:00",
                    "schedule_time": 400,
                },
                "job_resources": { "cpu": 1, "mem": 1 },
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let trigger = ApiTrigger::new(
            Client::new(),
            format!("{}/trigger/spark", server.uri()),
            DATE_FORMAT.to_string(),
            experiment(),
        );
        trigger.send(&job()).await;
    }

    #[tokio::test]
    async fn test_api_trigger_merges_experiment_snapshot_into_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "job_params": {
                    "num": 80,
                    "exp_id": "0.0.0_c1_m1_queueSelect-env_weight_random_select_queue-heap",
                },
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let trigger = ApiTrigger::new(
            Client::new(),
            server.uri(),
            DATE_FORMAT.to_string(),
            experiment(),
        );
        trigger.send(&job()).await;
    }

    #[tokio::test]
    async fn test_airflow_trigger_wraps_conf_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "conf": {
                    "job_id": "job-1",
                    "num": 80,
                    "cpu": 1,
                    "deadline": "2024-05-01T10:06:40",
                },
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let trigger = AirflowTrigger::new(Client::new(), server.uri(), DATE_FORMAT.to_string());
        trigger.send(&job()).await;
    }

    #[tokio::test]
    async fn test_trigger_factory_rejects_unknown_method() {
        let mut config = AppConfig::default();
        config.trigger.job_trigger_method = "carrier_pigeon".to_string();
        assert!(job_trigger_for(&config).is_err());
    }
}
