//! Configuration management for the Strata scheduler.
//!
//! Settings are loaded from optional TOML files under `./config` and then
//! overridden by environment variables using the flat names the deployment
//! scripts export (`TOTAL_LEVEL`, `SELECT_WEIGHT`, `KAFKA_BROKERS`, ...).

pub mod app_config;
pub mod experiment;
pub mod loader;

pub use app_config::{
    AppConfig, KafkaSettings, SchedulerSettings, SelectionSettings, SystemSettings,
    TriggerSettings,
};
pub use experiment::Experiment;
