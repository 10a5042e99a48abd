//! Resource records for capacity accounting.

use serde::{Deserialize, Serialize};

/// Resource demand of a single job: executor count, CPU cores, memory (GB)
/// and the expected computing time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResources {
    /// Number of executors requested from the compute backend.
    #[serde(default)]
    pub executors: i64,

    /// CPU cores.
    #[serde(default)]
    pub cpu: i64,

    /// Memory in GB.
    #[serde(default)]
    pub mem: i64,

    /// Expected computing time in seconds; subtracted from the deadline
    /// slack when the scheduling time is computed.
    #[serde(default)]
    pub computing_time: i64,
}

/// Currently-free cluster capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemResources {
    /// Free CPU cores.
    pub cpu: i64,

    /// Free memory in GB.
    pub mem: i64,
}

impl SystemResources {
    /// Creates a capacity record.
    #[must_use]
    pub const fn new(cpu: i64, mem: i64) -> Self {
        Self { cpu, mem }
    }

    /// Returns true if a job with the given demand fits into the free
    /// capacity.
    #[must_use]
    pub const fn can_fit(&self, demand: &JobResources) -> bool {
        demand.cpu <= self.cpu && demand.mem <= self.mem
    }
}
