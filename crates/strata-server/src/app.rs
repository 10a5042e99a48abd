//! The consume loop.

use std::future::Future;
use strata_config::AppConfig;
use strata_connector::{job_trigger_for, BusConsumer};
use strata_core::StrataResult;
use strata_sched::JobConsumer;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

/// Wires the components and runs the single-threaded consume loop until
/// `shutdown` resolves or the bus fails.
///
/// One task owns all scheduler state: bus messages and the periodic
/// reallocation tick are multiplexed with `select!`, so no mutation ever
/// happens concurrently.
pub async fn run(config: AppConfig, shutdown: impl Future<Output = ()>) -> StrataResult<()> {
    let trigger = job_trigger_for(&config)?;
    let mut consumer = JobConsumer::from_config(&config, trigger)?;

    let bus = BusConsumer::from_config(&config.kafka)?;
    bus.subscribe()?;

    let is_reallocate = config.scheduler.is_reallocate;
    let mut reallocate_tick = interval(Duration::from_secs(
        config.scheduler.reallocate_interval_secs.max(1),
    ));
    reallocate_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The interval fires immediately once; skip that first tick.
    reallocate_tick.reset();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            message = bus.next_message() => {
                if let Some(msg) = message? {
                    info!(topic = %msg.topic, key = ?msg.key, "Get MSG");
                    consumer.consume_msg(&msg).await;
                }
            }
            _ = reallocate_tick.tick(), if is_reallocate => {
                info!("Reallocating staged jobs");
                consumer.reallocate();
            }
            () = &mut shutdown => {
                warn!("Aborted by user");
                return Ok(());
            }
        }
    }
}
