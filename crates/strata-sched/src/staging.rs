//! Per-level staging containers.
//!
//! Each staging level buffers jobs until capacity frees up. The container
//! variant is chosen once at startup from `STAGE_QUEUE` and shared by every
//! level: a binary min-heap, a sorted-insert list, or a plain FIFO for
//! setups that defer ordering entirely to the selector layer.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::str::FromStr;
use strata_core::{Job, JobId, StrataError};

/// Container variant shared by all staging levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageQueueKind {
    /// Binary min-heap by sort key.
    Heap,
    /// Arrival-order FIFO.
    Deque,
    /// Sorted-insert list, ascending by sort key.
    Bisect,
}

impl FromStr for StageQueueKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heap" => Ok(Self::Heap),
            "deque" => Ok(Self::Deque),
            "bisect" => Ok(Self::Bisect),
            other => Err(StrataError::configuration(format!(
                "unknown STAGE_QUEUE: {other}"
            ))),
        }
    }
}

/// One staging level's job buffer.
///
/// `jobs()` is the ordered view the job selector iterates; selection never
/// removes, so `remove` takes the chosen job out by ID afterwards. `peek`
/// exposes the container's first element for the reallocation sweep.
pub trait StagingQueue: Send {
    /// Importance of this queue; 0 is served most urgently.
    fn level(&self) -> usize;

    /// Number of staged jobs.
    fn len(&self) -> usize;

    /// Returns true when no jobs are staged.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a newly classified job.
    fn insert(&mut self, job: Job);

    /// Removes and returns the job at the container's serving end.
    fn pop(&mut self) -> Option<Job>;

    /// The job at the container's head, without removing it.
    fn peek(&self) -> Option<&Job>;

    /// Removes a specific job, identified by ID.
    fn remove(&mut self, job_id: &JobId) -> Option<Job>;

    /// Recomputes every staged job's priority against `now`.
    fn renew_jobs_priority(&mut self, now: NaiveDateTime);

    /// Ordered view for the job selector.
    fn jobs(&self) -> Vec<&Job>;
}

/// Builds the staging structure: one queue of the given kind per level.
#[must_use]
pub fn build_stage_lists(kind: StageQueueKind, total_level: usize) -> Vec<Box<dyn StagingQueue>> {
    (0..total_level)
        .map(|level| -> Box<dyn StagingQueue> {
            match kind {
                StageQueueKind::Heap => Box::new(HeapStagingQueue::new(level)),
                StageQueueKind::Deque => Box::new(DequeStagingQueue::new(level)),
                StageQueueKind::Bisect => Box::new(BisectStagingQueue::new(level)),
            }
        })
        .collect()
}

/// Heap entry: orders by `(sort_key, seq)` so equal keys pop in insertion
/// order.
#[derive(Debug)]
struct HeapEntry {
    seq: u64,
    job: Job,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.job.sort_key == other.job.sort_key && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.job.sort_key, self.seq).cmp(&(other.job.sort_key, other.seq))
    }
}

/// Staging queue backed by a binary min-heap.
pub struct HeapStagingQueue {
    level: usize,
    heap: BinaryHeap<std::cmp::Reverse<HeapEntry>>,
    seq: u64,
}

impl HeapStagingQueue {
    /// Creates an empty heap queue for a level.
    #[must_use]
    pub fn new(level: usize) -> Self {
        Self {
            level,
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl StagingQueue for HeapStagingQueue {
    fn level(&self) -> usize {
        self.level
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn insert(&mut self, job: Job) {
        self.heap.push(std::cmp::Reverse(HeapEntry {
            seq: self.seq,
            job,
        }));
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<Job> {
        self.heap.pop().map(|entry| entry.0.job)
    }

    fn peek(&self) -> Option<&Job> {
        self.heap.peek().map(|entry| &entry.0.job)
    }

    fn remove(&mut self, job_id: &JobId) -> Option<Job> {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let position = entries
            .iter()
            .position(|entry| entry.0.job.job_id == *job_id);
        let removed = position.map(|at| entries.swap_remove(at));

        // Rebuilding from the vec re-heapifies in O(n).
        self.heap = entries.into_iter().collect();
        removed.map(|entry| entry.0.job)
    }

    fn renew_jobs_priority(&mut self, now: NaiveDateTime) {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        for entry in &mut entries {
            entry.0.job.renew_priority(now);
        }
        self.heap = entries.into_iter().collect();
    }

    fn jobs(&self) -> Vec<&Job> {
        let mut entries: Vec<&HeapEntry> = self.heap.iter().map(|entry| &entry.0).collect();
        entries.sort_by_key(|entry| (entry.job.sort_key, entry.seq));
        entries.into_iter().map(|entry| &entry.job).collect()
    }
}

/// Staging queue kept sorted ascending by sort key.
///
/// `pop` takes the tail (the highest-slack job); the head-first `jobs()`
/// view is what selection consumes.
pub struct BisectStagingQueue {
    level: usize,
    job_list: Vec<Job>,
}

impl BisectStagingQueue {
    /// Creates an empty sorted queue for a level.
    #[must_use]
    pub fn new(level: usize) -> Self {
        Self {
            level,
            job_list: Vec::new(),
        }
    }
}

impl StagingQueue for BisectStagingQueue {
    fn level(&self) -> usize {
        self.level
    }

    fn len(&self) -> usize {
        self.job_list.len()
    }

    fn insert(&mut self, job: Job) {
        // Insertion after equal keys keeps ties in arrival order.
        let at = self
            .job_list
            .partition_point(|staged| staged.sort_key <= job.sort_key);
        self.job_list.insert(at, job);
    }

    fn pop(&mut self) -> Option<Job> {
        self.job_list.pop()
    }

    fn peek(&self) -> Option<&Job> {
        self.job_list.first()
    }

    fn remove(&mut self, job_id: &JobId) -> Option<Job> {
        let position = self
            .job_list
            .iter()
            .position(|staged| staged.job_id == *job_id)?;
        Some(self.job_list.remove(position))
    }

    fn renew_jobs_priority(&mut self, now: NaiveDateTime) {
        for job in &mut self.job_list {
            job.renew_priority(now);
        }
        // Stable sort keeps arrival order among equal keys.
        self.job_list.sort_by_key(|job| job.sort_key);
    }

    fn jobs(&self) -> Vec<&Job> {
        self.job_list.iter().collect()
    }
}

/// Arrival-order staging queue.
pub struct DequeStagingQueue {
    level: usize,
    job_list: VecDeque<Job>,
}

impl DequeStagingQueue {
    /// Creates an empty FIFO queue for a level.
    #[must_use]
    pub fn new(level: usize) -> Self {
        Self {
            level,
            job_list: VecDeque::new(),
        }
    }
}

impl StagingQueue for DequeStagingQueue {
    fn level(&self) -> usize {
        self.level
    }

    fn len(&self) -> usize {
        self.job_list.len()
    }

    fn insert(&mut self, job: Job) {
        self.job_list.push_back(job);
    }

    fn pop(&mut self) -> Option<Job> {
        self.job_list.pop_front()
    }

    fn peek(&self) -> Option<&Job> {
        self.job_list.front()
    }

    fn remove(&mut self, job_id: &JobId) -> Option<Job> {
        let position = self
            .job_list
            .iter()
            .position(|staged| staged.job_id == *job_id)?;
        self.job_list.remove(position)
    }

    fn renew_jobs_priority(&mut self, now: NaiveDateTime) {
        for job in &mut self.job_list {
            job.renew_priority(now);
        }
    }

    fn jobs(&self) -> Vec<&Job> {
        self.job_list.iter().collect()
    }
}
