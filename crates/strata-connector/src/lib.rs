//! External collaborators of the scheduler: the Kafka intake and the HTTP
//! job triggers.
//!
//! Both sides follow the same error policy: per-message problems are logged
//! and skipped, transport failures on dispatch are logged and swallowed,
//! and only broker-level failures surface as [`strata_core::StrataError::Bus`].

pub mod http;
pub mod kafka;
pub mod trigger;

pub use kafka::BusConsumer;
pub use trigger::{job_trigger_for, AirflowTrigger, ApiTrigger, TestTrigger};
