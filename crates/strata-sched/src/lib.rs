//! Scheduling core of Strata.
//!
//! Owns the multi-level staging structure, the pluggable queue/job selection
//! strategies, the capacity monitor, and the consumer that turns bus events
//! into staged and dispatched jobs. Everything here mutates on a single
//! task; the only async edges are the bus poll and the outbound dispatch.

pub mod consumer;
pub mod job_selector;
pub mod monitor;
pub mod queue_selector;
pub mod staging;
pub mod trigger;

pub use consumer::{DrainOutcome, JobConsumer};
pub use job_selector::{job_selector_for, JobSelector, SelectError};
pub use monitor::{CapacityMonitor, ResourceCatalog};
pub use queue_selector::{queue_selector_for, QueueSelector};
pub use staging::{build_stage_lists, StageQueueKind, StagingQueue};
pub use trigger::JobTrigger;
