//! End-to-end scheduling scenarios.
//!
//! Each test wires a full consumer (heap staging, seeded weighted-random
//! queue selection, resource-checking job selection) against a recording
//! trigger and drives it with bus events.

mod common;

use chrono::Utc;
use common::{
    complete_msg, new_job_msg, new_job_msg_with_resources, RecordingTrigger, DATE_FORMAT,
};
use serde_json::json;
use std::sync::Arc;
use strata_core::{
    BusMessage, JobResources, LevelLimits, SortKeyName, SystemResources,
};
use strata_sched::consumer::ConsumerOptions;
use strata_sched::queue_selector::WeightRandomSelector;
use strata_sched::{
    build_stage_lists, job_selector_for, CapacityMonitor, JobConsumer, ResourceCatalog,
    StageQueueKind,
};

fn catalog() -> ResourceCatalog {
    ResourceCatalog::from_entries([(
        "demand_forecasting_1hr".to_string(),
        JobResources {
            executors: 1,
            cpu: 1,
            mem: 1,
            computing_time: 5,
        },
    )])
}

fn consumer(cpu: i64, mem: i64, weights: Vec<f64>, trigger: Arc<RecordingTrigger>) -> JobConsumer {
    let options = ConsumerOptions {
        topic_new_job: "new_job".to_string(),
        topic_job_complete: "job_finish".to_string(),
        date_format: DATE_FORMAT.to_string(),
        sort_key_name: SortKeyName::ScheduleTime,
        is_renew_before_insert: false,
    };

    JobConsumer::new(
        options,
        LevelLimits::new(3, vec![600, 1200]).unwrap(),
        build_stage_lists(StageQueueKind::Heap, 3),
        CapacityMonitor::new(SystemResources::new(cpu, mem), catalog()),
        Box::new(WeightRandomSelector::with_seed(weights, 42)),
        job_selector_for("basic_check_resource").unwrap(),
        trigger,
    )
}

fn one_core_demand() -> JobResources {
    JobResources {
        executors: 1,
        cpu: 1,
        mem: 1,
        computing_time: 5,
    }
}

// S1: a job with 400s of slack classifies into level 0 and dispatches
// immediately, leaving (1, 1) free.
#[tokio::test]
async fn test_classify_and_insert() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(2, 2, vec![10.0, 7.0, 3.0], trigger.clone());

    consumer
        .consume_msg(&new_job_msg_with_resources("job-1", 400, one_core_demand()))
        .await;

    assert_eq!(trigger.sent_ids(), vec!["job-1"]);
    assert_eq!(consumer.free_resources(), SystemResources::new(1, 1));

    let sent = trigger.sent_jobs();
    assert_eq!(sent[0].job_times.schedule_time, 395);
}

// S2: two jobs exhaust the capacity; a third queues at level 0 without
// dispatching.
#[tokio::test]
async fn test_fill_then_queue() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(2, 2, vec![10.0, 7.0, 3.0], trigger.clone());

    for id in ["job-1", "job-2", "job-3"] {
        consumer
            .consume_msg(&new_job_msg_with_resources(id, 400, one_core_demand()))
            .await;
    }

    assert_eq!(trigger.sent_ids(), vec!["job-1", "job-2"]);
    assert_eq!(consumer.free_resources(), SystemResources::new(0, 0));
    assert_eq!(consumer.queue_lengths(), vec![1, 0, 0]);
}

// S3: one completion frees a slot and exactly one queued job drains.
#[tokio::test]
async fn test_release_and_drain() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(2, 2, vec![10.0, 7.0, 3.0], trigger.clone());

    for id in ["job-1", "job-2", "job-3"] {
        consumer
            .consume_msg(&new_job_msg_with_resources(id, 400, one_core_demand()))
            .await;
    }
    consumer.consume_msg(&complete_msg(1, 1)).await;

    assert_eq!(trigger.sent_ids(), vec!["job-1", "job-2", "job-3"]);
    assert_eq!(consumer.free_resources(), SystemResources::new(0, 0));
    assert_eq!(consumer.queue_lengths(), vec![0, 0, 0]);
}

// S4: the selected level has no feasible job; the fallback serves the next
// level and the infeasible job stays queued.
#[tokio::test]
async fn test_cross_level_fallback() {
    let trigger = RecordingTrigger::new();
    // All selection weight on level 0 so the draw always starts there.
    let mut consumer = consumer(1, 1, vec![10.0, 0.0, 0.0], trigger.clone());

    let big = JobResources {
        executors: 1,
        cpu: 2,
        mem: 2,
        computing_time: 5,
    };
    consumer
        .consume_msg(&new_job_msg_with_resources("big", 400, big))
        .await;
    assert_eq!(consumer.queue_lengths(), vec![1, 0, 0]);
    assert!(trigger.sent_ids().is_empty());

    consumer
        .consume_msg(&new_job_msg_with_resources("small", 900, one_core_demand()))
        .await;

    assert_eq!(trigger.sent_ids(), vec!["small"]);
    assert_eq!(consumer.free_resources(), SystemResources::new(0, 0));
    assert_eq!(consumer.queue_lengths(), vec![1, 0, 0]);
}

// S5: reallocation recomputes slack and promotes a level-2 job straight to
// level 0 once its remaining slack falls under the first limit.
#[tokio::test]
async fn test_reallocate_promotes() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(0, 0, vec![10.0, 7.0, 3.0], trigger.clone());

    consumer
        .consume_msg(&new_job_msg_with_resources("job-1", 1705, one_core_demand()))
        .await;
    assert_eq!(consumer.queue_lengths(), vec![0, 0, 1]);

    let later = Utc::now().naive_utc() + chrono::Duration::seconds(1101);
    consumer.reallocate_at(later);

    assert_eq!(consumer.queue_lengths(), vec![1, 0, 0]);
    let staged = consumer.jobs_at(0);
    assert!(staged[0].job_times.schedule_time < 600);
}

// S6: an unknown job type is dropped at ingress; nothing stages or
// dispatches.
#[tokio::test]
async fn test_unknown_type_dropped() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(2, 2, vec![10.0, 7.0, 3.0], trigger.clone());

    let now = Utc::now().naive_utc();
    let value = json!({
        "job_type": "total_mystery",
        "job_parameters": { "num": 50 },
        "job_config": {
            "deadline": (now + chrono::Duration::seconds(400)).format(DATE_FORMAT).to_string(),
            "request_time": now.format(DATE_FORMAT).to_string(),
        },
    });
    consumer
        .consume_msg(&BusMessage::new("new_job", Some("job-x".to_string()), value))
        .await;

    assert!(trigger.sent_ids().is_empty());
    assert_eq!(consumer.queue_lengths(), vec![0, 0, 0]);
    assert_eq!(consumer.free_resources(), SystemResources::new(2, 2));
}

// Randomized churn: dispatches always debit exactly once, completions
// credit exactly once, and capacity never goes negative.
#[tokio::test]
async fn test_capacity_accounting_under_churn() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(3, 3, vec![10.0, 7.0, 3.0], trigger.clone());
    let mut rng = StdRng::seed_from_u64(7);

    let mut submitted = 0u32;
    let mut completed = 0u32;
    for round in 0..200 {
        if rng.gen_bool(0.6) {
            submitted += 1;
            let slack = rng.gen_range(60..3600);
            consumer
                .consume_msg(&new_job_msg_with_resources(
                    &format!("job-{round}"),
                    slack,
                    one_core_demand(),
                ))
                .await;
        } else {
            completed += 1;
            consumer.consume_msg(&complete_msg(1, 1)).await;
        }

        let free = consumer.free_resources();
        assert!(free.cpu >= 0, "cpu went negative at round {round}");
        assert!(free.mem >= 0, "mem went negative at round {round}");
    }

    // Every dispatch debited one core: free = initial - dispatched + credited.
    let dispatched = trigger.sent_ids().len() as i64;
    let free = consumer.free_resources();
    assert_eq!(free.cpu, 3 - dispatched + i64::from(completed));
    let queued: usize = consumer.queue_lengths().iter().sum();
    assert_eq!(dispatched as u32 + queued as u32, submitted);
}

// The drain loop terminates after at most one dispatch per staged job.
#[tokio::test]
async fn test_drain_loop_progress() {
    let trigger = RecordingTrigger::new();
    let mut consumer = consumer(0, 0, vec![10.0, 7.0, 3.0], trigger.clone());

    for index in 0..5 {
        consumer.consume_msg(&new_job_msg(&format!("job-{index}"), 400)).await;
    }
    assert!(trigger.sent_ids().is_empty());
    assert_eq!(consumer.queue_lengths(), vec![5, 0, 0]);

    // Releasing a mountain of capacity drains everything, once each.
    consumer.consume_msg(&complete_msg(100, 100)).await;
    // A complete event attempts a single dispatch; the rest drain as more
    // completions arrive.
    assert_eq!(trigger.sent_ids().len(), 1);

    for _ in 0..10 {
        consumer.consume_msg(&complete_msg(0, 0)).await;
    }
    assert_eq!(trigger.sent_ids().len(), 5);
    assert_eq!(consumer.queue_lengths(), vec![0, 0, 0]);
}
