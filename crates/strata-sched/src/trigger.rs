//! Dispatch capability.
//!
//! The scheduling core only knows this trait; the concrete HTTP and Airflow
//! triggers live in the connector crate and are wired in at startup.

use async_trait::async_trait;
use strata_core::Job;

/// Pushes a picked job to the execution backend.
///
/// Dispatch is at-most-once and best-effort: implementations log transport
/// failures and swallow them, so the caller always debits capacity for a
/// sent job. The upstream producer re-submits on timeout.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    /// Sends the job downstream.
    async fn send(&self, job: &Job);
}
