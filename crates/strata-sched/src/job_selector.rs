//! Job selection within a level.
//!
//! The selector walks the level's ordered view and picks the first job the
//! free capacity can run. Selection never removes; the caller takes the
//! chosen job out of its container afterwards.

use strata_core::{Job, StrataError, StrataResult, SystemResources};
use thiserror::Error;

/// Control-flow outcome of a failed selection.
///
/// `NoValidJob` drives the cross-level fallback in the scheduling core;
/// `EmptyList` terminates a drain loop. Neither propagates outside
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    /// The staging list is empty.
    #[error("Queue is Empty")]
    EmptyList,

    /// Every staged job exceeds the free capacity.
    #[error("Queue NO VALID JOB - SYSTEM: cpu={} mem={}", .free.cpu, .free.mem)]
    NoValidJob {
        /// Free capacity observed at selection time.
        free: SystemResources,
    },
}

/// Picks a job from a level's ordered view.
pub trait JobSelector: Send {
    /// Returns the first servable job in iteration order.
    fn select_job<'a>(
        &self,
        stage_list: &[&'a Job],
        system_resources: &SystemResources,
    ) -> Result<&'a Job, SelectError>;
}

/// Builds the configured job selector.
pub fn job_selector_for(method: &str) -> StrataResult<Box<dyn JobSelector>> {
    match method {
        "basic_pick_first" => Ok(Box::new(PickFirstSelector)),
        "basic_check_resource" => Ok(Box::new(CheckResourceSelector)),
        other => Err(StrataError::configuration(format!(
            "unknown JOB_SELECT_METHOD: {other}"
        ))),
    }
}

/// Takes the head of the view unconditionally.
pub struct PickFirstSelector;

impl JobSelector for PickFirstSelector {
    fn select_job<'a>(
        &self,
        stage_list: &[&'a Job],
        _system_resources: &SystemResources,
    ) -> Result<&'a Job, SelectError> {
        stage_list.first().copied().ok_or(SelectError::EmptyList)
    }
}

/// Takes the first job whose demand fits into the free capacity.
pub struct CheckResourceSelector;

impl JobSelector for CheckResourceSelector {
    fn select_job<'a>(
        &self,
        stage_list: &[&'a Job],
        system_resources: &SystemResources,
    ) -> Result<&'a Job, SelectError> {
        if stage_list.is_empty() {
            return Err(SelectError::EmptyList);
        }

        stage_list
            .iter()
            .find(|job| system_resources.can_fit(&job.job_resources))
            .copied()
            .ok_or(SelectError::NoValidJob {
                free: *system_resources,
            })
    }
}
