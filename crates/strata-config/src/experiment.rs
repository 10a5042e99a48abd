//! Experiment identification attached to every dispatch.

use crate::AppConfig;
use serde_json::{json, Value};

/// Snapshot of the scheduling method under experiment.
///
/// The expanded `exp_id` and the method map are merged into dispatched
/// `job_params` so the downstream analysis tables can attribute results to a
/// scheduler configuration.
#[derive(Debug, Clone)]
pub struct Experiment {
    /// Expanded experiment identifier.
    pub exp_id: String,

    /// Method map describing the active scheduling configuration.
    pub method: Value,
}

impl Experiment {
    /// Builds the experiment snapshot from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let exp_id = format!(
            "{}_c{}_m{}_queueSelect-{}_queue-{}",
            config.exp_id,
            config.system.system_cpu,
            config.system.system_mem,
            config.selection.queue_select_method,
            config.scheduler.stage_queue,
        );

        let method = json!({
            "scheduler": {
                "total_level": config.scheduler.total_level,
                "level_limit": config.scheduler.level_limit,
                "is_renew_before_insert": config.scheduler.is_renew_before_insert,
                "is_reallocate": config.scheduler.is_reallocate,
                "job_sort_key": config.scheduler.job_sort_key,
            },
            "queue_select_method": config.selection.queue_select_method,
            "stage_queue": config.scheduler.stage_queue,
            "job_select_method": config.selection.job_select_method,
        });

        Self { exp_id, method }
    }

    /// The object merged into dispatched job parameters.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        json!({
            "exp_id": self.exp_id,
            "method": self.method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_id_expansion() {
        let config = AppConfig::default();
        let experiment = Experiment::from_config(&config);

        assert_eq!(
            experiment.exp_id,
            "0.0.0_c1_m1_queueSelect-env_weight_random_select_queue-heap"
        );
    }

    #[test]
    fn test_snapshot_carries_method_map() {
        let experiment = Experiment::from_config(&AppConfig::default());
        let snapshot = experiment.snapshot();

        assert_eq!(snapshot["method"]["scheduler"]["total_level"], 3);
        assert_eq!(snapshot["method"]["stage_queue"], "heap");
        assert!(snapshot["exp_id"].as_str().unwrap().starts_with("0.0.0_"));
    }
}
