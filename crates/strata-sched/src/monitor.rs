//! Capacity accounting and the job-type resource catalog.

use std::collections::HashMap;
use strata_config::AppConfig;
use strata_core::{Job, JobResources, StrataError, StrataResult, SystemResources};
use tracing::info;

/// Immutable mapping from job type to its resource demand.
///
/// Fetched once at monitor construction; lookups are stateless afterwards.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<String, JobResources>,
}

impl ResourceCatalog {
    /// The built-in catalog used when no override file is configured.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_entries([(
            "demand_forecasting_1hr".to_string(),
            JobResources {
                executors: 2,
                cpu: 1,
                mem: 1,
                computing_time: 5,
            },
        )])
    }

    /// Builds a catalog from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, JobResources)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parses a catalog from a JSON object `{ job_type: {cpu, mem, ...} }`.
    pub fn from_json_str(raw: &str) -> StrataResult<Self> {
        let entries: HashMap<String, JobResources> = serde_json::from_str(raw)?;
        Ok(Self { entries })
    }

    /// Looks up a job type.
    #[must_use]
    pub fn get(&self, job_type: &str) -> Option<&JobResources> {
        self.entries.get(job_type)
    }

    /// Number of known job types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tracks free cluster capacity and resolves per-job resource demand.
#[derive(Debug, Clone)]
pub struct CapacityMonitor {
    system_resources: SystemResources,
    jobs_resources: ResourceCatalog,
}

impl CapacityMonitor {
    /// Creates a monitor with the given free capacity and catalog.
    #[must_use]
    pub fn new(system_resources: SystemResources, jobs_resources: ResourceCatalog) -> Self {
        Self {
            system_resources,
            jobs_resources,
        }
    }

    /// Builds the monitor from configuration: capacity from
    /// `SYSTEM_CPU`/`SYSTEM_MEM`, catalog from `JOB_RESOURCE_FILE` when set,
    /// the built-in table otherwise.
    pub fn from_config(config: &AppConfig) -> StrataResult<Self> {
        let catalog = match &config.system.job_resource_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    StrataError::configuration(format!("cannot read JOB_RESOURCE_FILE {path}: {e}"))
                })?;
                let catalog = ResourceCatalog::from_json_str(&raw)?;
                info!(path, job_types = catalog.len(), "Loaded job resource catalog");
                catalog
            }
            None => ResourceCatalog::builtin(),
        };

        Ok(Self::new(
            SystemResources::new(config.system.system_cpu, config.system.system_mem),
            catalog,
        ))
    }

    /// Resolves a job's resource demand from the catalog.
    pub fn get_single_job_resources(&self, job: &Job) -> StrataResult<JobResources> {
        self.jobs_resources
            .get(&job.job_type)
            .copied()
            .ok_or_else(|| StrataError::UnknownJobType(job.job_type.clone()))
    }

    /// Snapshot of the free capacity.
    #[must_use]
    pub fn fetch_current_system_resources(&self) -> SystemResources {
        self.system_resources
    }

    /// Applies capacity deltas: negative on dispatch, positive on
    /// completion.
    pub fn update_current_system_resources(&mut self, cpu: i64, mem: i64) {
        self.system_resources.cpu += cpu;
        self.system_resources.mem += mem;
    }
}
