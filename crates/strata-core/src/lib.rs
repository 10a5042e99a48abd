//! Core types for the Strata job scheduler.
//!
//! This crate holds everything the scheduling layers agree on: the [`Job`]
//! entity with its deadline-derived ordering key, the resource records used
//! for capacity accounting, the level-limit vector that maps slack to a
//! staging level, and the unified [`StrataError`] type.

pub mod error;
pub mod job;
pub mod level;
pub mod msg;
pub mod resources;

pub use error::{StrataError, StrataResult};
pub use job::{Job, JobId, JobTimes, SortKeyName};
pub use level::LevelLimits;
pub use msg::BusMessage;
pub use resources::{JobResources, SystemResources};
