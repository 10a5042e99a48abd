//! Application configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use strata_core::{LevelLimits, SortKeyName, StrataError, StrataResult};

/// Top-level configuration.
///
/// Sections are flattened so every field answers to the flat environment
/// variable of the same (upper-cased) name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Staging structure and re-prioritization switches.
    #[serde(flatten)]
    pub scheduler: SchedulerSettings,

    /// Queue/job selection strategies.
    #[serde(flatten)]
    pub selection: SelectionSettings,

    /// Cluster capacity made available to the scheduler.
    #[serde(flatten)]
    pub system: SystemSettings,

    /// Message bus connection.
    #[serde(flatten)]
    pub kafka: KafkaSettings,

    /// Downstream job trigger.
    #[serde(flatten)]
    pub trigger: TriggerSettings,

    /// Format for parsing and re-serializing job timestamps.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Experiment identifier, expanded into the dispatch snapshot.
    #[serde(default = "default_exp_id")]
    pub exp_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            selection: SelectionSettings::default(),
            system: SystemSettings::default(),
            kafka: KafkaSettings::default(),
            trigger: TriggerSettings::default(),
            date_format: default_date_format(),
            exp_id: default_exp_id(),
        }
    }
}

/// Staging structure and re-prioritization switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Number of staging levels.
    #[serde(default = "default_total_level")]
    pub total_level: usize,

    /// Comma-separated slack limits, one fewer than `total_level`.
    #[serde(default = "default_level_limit")]
    pub level_limit: String,

    /// Renew the target level's priorities before every insert.
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub is_renew_before_insert: bool,

    /// Run the periodic reallocation pass.
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub is_reallocate: bool,

    /// Seconds between reallocation passes.
    #[serde(default = "default_reallocate_interval")]
    pub reallocate_interval_secs: u64,

    /// Which job time orders the staging queues.
    #[serde(default = "default_job_sort_key")]
    pub job_sort_key: String,

    /// Per-level container variant: `heap`, `deque`, or `bisect`.
    #[serde(default = "default_stage_queue")]
    pub stage_queue: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            total_level: default_total_level(),
            level_limit: default_level_limit(),
            is_renew_before_insert: true,
            is_reallocate: true,
            reallocate_interval_secs: default_reallocate_interval(),
            job_sort_key: default_job_sort_key(),
            stage_queue: default_stage_queue(),
        }
    }
}

/// Queue/job selection strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Queue selector: `top_level_select`, `env_weight_random_select`, or
    /// `env_zip_select`.
    #[serde(default = "default_queue_select_method")]
    pub queue_select_method: String,

    /// Comma-separated per-level weights for the weighted-random selector.
    #[serde(default = "default_select_weight")]
    pub select_weight: String,

    /// Comma-separated per-level quotas for the zip selector.
    #[serde(default = "default_select_order")]
    pub select_order: String,

    /// Job selector: `basic_pick_first` or `basic_check_resource`.
    #[serde(default = "default_job_select_method")]
    pub job_select_method: String,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            queue_select_method: default_queue_select_method(),
            select_weight: default_select_weight(),
            select_order: default_select_order(),
            job_select_method: default_job_select_method(),
        }
    }
}

/// Cluster capacity made available to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Total CPU cores the scheduler may hand out.
    #[serde(default = "default_system_capacity")]
    pub system_cpu: i64,

    /// Total memory (GB) the scheduler may hand out.
    #[serde(default = "default_system_capacity")]
    pub system_mem: i64,

    /// Optional JSON file overriding the built-in job resource catalog.
    #[serde(default)]
    pub job_resource_file: Option<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            system_cpu: default_system_capacity(),
            system_mem: default_system_capacity(),
            job_resource_file: None,
        }
    }
}

/// Message bus connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaSettings {
    /// Bootstrap servers.
    #[serde(default = "default_kafka_brokers")]
    pub kafka_brokers: String,

    /// Consumer group ID.
    #[serde(default = "default_kafka_group_id")]
    pub kafka_group_id: String,

    /// Session timeout in milliseconds.
    #[serde(default = "default_kafka_session_timeout")]
    pub kafka_session_timeout_ms: u64,

    /// Topic carrying new-job notifications.
    #[serde(default = "default_topic_new_job")]
    pub topic_new_job_notify: String,

    /// Topic carrying job-complete notifications.
    #[serde(default = "default_topic_job_complete")]
    pub topic_job_complete_notify: String,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            kafka_brokers: default_kafka_brokers(),
            kafka_group_id: default_kafka_group_id(),
            kafka_session_timeout_ms: default_kafka_session_timeout(),
            topic_new_job_notify: default_topic_new_job(),
            topic_job_complete_notify: default_topic_job_complete(),
        }
    }
}

/// Downstream job trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Dispatcher variant: `test`, `api`, or `airflow`.
    #[serde(default = "default_job_trigger_method")]
    pub job_trigger_method: String,

    /// Job-launch service URL (`api` variant).
    #[serde(default = "default_job_trigger_url")]
    pub job_trigger_url: String,

    /// Airflow dag-run URL (`airflow` variant).
    #[serde(default = "default_airflow_url")]
    pub airflow_url: String,

    /// Outbound request timeout in seconds.
    #[serde(default = "default_trigger_timeout")]
    pub trigger_timeout_secs: u64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            job_trigger_method: default_job_trigger_method(),
            job_trigger_url: default_job_trigger_url(),
            airflow_url: default_airflow_url(),
            trigger_timeout_secs: default_trigger_timeout(),
        }
    }
}

impl AppConfig {
    /// Parses and validates the level-limit vector.
    pub fn level_limits(&self) -> StrataResult<LevelLimits> {
        let limits = parse_csv::<i64>("LEVEL_LIMIT", &self.scheduler.level_limit)?;
        LevelLimits::new(self.scheduler.total_level, limits)
    }

    /// Parses the configured sort key name.
    pub fn sort_key_name(&self) -> StrataResult<SortKeyName> {
        self.scheduler.job_sort_key.parse()
    }

    /// Parses the weighted-random selector weights.
    pub fn select_weights(&self) -> StrataResult<Vec<f64>> {
        parse_csv::<f64>("SELECT_WEIGHT", &self.selection.select_weight)
    }

    /// Parses the zip selector quotas.
    pub fn select_orders(&self) -> StrataResult<Vec<u32>> {
        parse_csv::<u32>("SELECT_ORDER", &self.selection.select_order)
    }

    /// Validates everything that can fail before wiring: numeric shapes,
    /// vector lengths, and the sort key. Strategy names are validated by the
    /// factories that consume them.
    pub fn validate(&self) -> StrataResult<()> {
        self.level_limits()?;
        self.sort_key_name()?;

        let total = self.scheduler.total_level;
        let weights = self.select_weights()?;
        if weights.len() != total {
            return Err(StrataError::configuration(format!(
                "SELECT_WEIGHT must have {total} entries, got {}",
                weights.len()
            )));
        }
        if weights.iter().any(|w| *w < 0.0) {
            return Err(StrataError::configuration(
                "SELECT_WEIGHT entries must be non-negative",
            ));
        }

        let orders = self.select_orders()?;
        if orders.len() != total {
            return Err(StrataError::configuration(format!(
                "SELECT_ORDER must have {total} entries, got {}",
                orders.len()
            )));
        }
        if orders.iter().any(|o| *o == 0) {
            return Err(StrataError::configuration(
                "SELECT_ORDER entries must be positive",
            ));
        }

        if self.system.system_cpu < 0 || self.system.system_mem < 0 {
            return Err(StrataError::configuration(
                "SYSTEM_CPU and SYSTEM_MEM must be non-negative",
            ));
        }

        Ok(())
    }
}

fn parse_csv<T: FromStr>(name: &str, raw: &str) -> StrataResult<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<T>()
                .map_err(|_| StrataError::configuration(format!("bad {name} entry: {part}")))
        })
        .collect()
}

/// Accepts `true`/`false`, `0`/`1`, and the usual string spellings, since the
/// deployment environment exports these switches as integers.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct FlexibleBool;

    impl serde::de::Visitor<'_> for FlexibleBool {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a boolean, integer, or boolean-like string")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<bool, E> {
            match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                other => Err(E::custom(format!("not a boolean: {other}"))),
            }
        }
    }

    deserializer.deserialize_any(FlexibleBool)
}

fn default_total_level() -> usize {
    3
}

fn default_level_limit() -> String {
    "600,1200".to_string()
}

fn default_true() -> bool {
    true
}

fn default_reallocate_interval() -> u64 {
    60
}

fn default_job_sort_key() -> String {
    "schedule_time".to_string()
}

fn default_stage_queue() -> String {
    "heap".to_string()
}

fn default_queue_select_method() -> String {
    "env_weight_random_select".to_string()
}

fn default_select_weight() -> String {
    "10,7,3".to_string()
}

fn default_select_order() -> String {
    "3,2,1".to_string()
}

fn default_job_select_method() -> String {
    "basic_check_resource".to_string()
}

fn default_system_capacity() -> i64 {
    1
}

fn default_kafka_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_kafka_group_id() -> String {
    "qol".to_string()
}

fn default_kafka_session_timeout() -> u64 {
    6000
}

fn default_topic_new_job() -> String {
    "new_job".to_string()
}

fn default_topic_job_complete() -> String {
    "job_finish".to_string()
}

fn default_job_trigger_method() -> String {
    "api".to_string()
}

fn default_job_trigger_url() -> String {
    "http://localhost:5000/trigger/spark".to_string()
}

fn default_airflow_url() -> String {
    "http://localhost:8080/api/experimental/dags/basic_test_job/dag_runs".to_string()
}

fn default_trigger_timeout() -> u64 {
    10
}

fn default_date_format() -> String {
    "%Y-%m-%dT%H:%M:%S".to_string()
}

fn default_exp_id() -> String {
    "0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scheduler.total_level, 3);
        assert_eq!(config.level_limits().unwrap().total_level(), 3);
        assert_eq!(config.select_weights().unwrap(), vec![10.0, 7.0, 3.0]);
        assert_eq!(config.select_orders().unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn test_weight_length_must_match_total_level() {
        let mut config = AppConfig::default();
        config.selection.select_weight = "10,7".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_order_rejected() {
        let mut config = AppConfig::default();
        config.selection.select_order = "3,0,1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_level_limit_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.level_limit = "1200,600".to_string();
        assert!(config.validate().is_err());

        config.scheduler.level_limit = "600".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flexible_bool_accepts_integers() {
        let config: AppConfig =
            serde_json::from_str(r#"{"is_renew_before_insert": 0, "is_reallocate": "1"}"#).unwrap();
        assert!(!config.scheduler.is_renew_before_insert);
        assert!(config.scheduler.is_reallocate);
    }
}
