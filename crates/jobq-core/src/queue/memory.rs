//! In-memory named queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::domain::{Job, JobId, queue_order};

/// A job eligible for dispatch.
///
/// Greatest = next to dispatch: higher priority, then earlier `created_at`,
/// then lower `seq`. `push` hands out increasing seqs and `push_front`
/// decreasing ones, so equal keys pop in insertion order and front
/// insertions win their ties.
#[derive(Debug, Clone)]
struct ReadyJob {
    seq: i64,
    job: Job,
}

impl PartialEq for ReadyJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReadyJob {}

impl PartialOrd for ReadyJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyJob {
    fn cmp(&self, other: &Self) -> Ordering {
        queue_order(&self.job, &other.job)
            .reverse()
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A failed job waiting out its backoff.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first); `seq`
/// keeps equal due times in scheduling order.
#[derive(Debug, Clone)]
struct PendingRetry {
    due_at: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for PendingRetry {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Eq for PendingRetry {}

impl PartialOrd for PendingRetry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRetry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One named queue.
///
/// Invariant: the head is the job with the highest priority, ties broken by
/// earliest `created_at`. Holds after every insertion and every retry
/// re-insertion. Push and pop are O(log n).
#[derive(Debug, Default)]
pub struct NamedQueue {
    /// Jobs eligible for dispatch.
    ready: BinaryHeap<ReadyJob>,

    /// Failed jobs waiting for their backoff to elapse.
    retries: BinaryHeap<PendingRetry>,

    back_seq: i64,
    front_seq: i64,
    retry_seq: u64,
}

impl NamedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job behind everything it ties with.
    pub fn push(&mut self, job: Job) {
        let seq = self.back_seq;
        self.back_seq += 1;
        self.ready.push(ReadyJob { seq, job });
    }

    /// Insert a job ahead of anything it ties with on both priority and
    /// `created_at`.
    pub fn push_front(&mut self, job: Job) {
        self.front_seq -= 1;
        let seq = self.front_seq;
        self.ready.push(ReadyJob { seq, job });
    }

    /// Remove the head job.
    pub fn pop_head(&mut self) -> Option<Job> {
        self.ready.pop().map(|entry| entry.job)
    }

    /// Hold `job` until `due_at`.
    pub fn schedule_retry(&mut self, job: Job, due_at: Instant) {
        let seq = self.retry_seq;
        self.retry_seq += 1;
        self.retries.push(PendingRetry { due_at, seq, job });
    }

    /// Move every retry due at `now` back into the ready jobs.
    ///
    /// Returns the ids of the promoted jobs.
    pub fn promote_due(&mut self, now: Instant) -> Vec<JobId> {
        let mut promoted = Vec::new();
        while let Some(entry) = self.retries.peek() {
            if entry.due_at > now {
                break; // Heap is sorted, so we can stop
            }
            if let Some(entry) = self.retries.pop() {
                promoted.push(entry.job.id);
                self.push_front(entry.job);
            }
        }
        promoted
    }

    /// Earliest pending retry, if any.
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.retries.peek().map(|entry| entry.due_at)
    }

    /// Copy of the ready jobs in dispatch order.
    pub fn snapshot(&self) -> Vec<Job> {
        in_dispatch_order(self.ready.clone())
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn retry_len(&self) -> usize {
        self.retries.len()
    }

    /// Empty the queue, ready jobs first (in dispatch order), then pending
    /// retries.
    pub fn take_all(&mut self) -> Vec<Job> {
        let mut jobs = in_dispatch_order(std::mem::take(&mut self.ready));
        jobs.extend(std::mem::take(&mut self.retries).into_iter().map(|r| r.job));
        jobs
    }
}

fn in_dispatch_order(ready: BinaryHeap<ReadyJob>) -> Vec<Job> {
    ready
        .into_sorted_vec()
        .into_iter()
        .rev()
        .map(|entry| entry.job)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobOptions;
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;
    use ulid::Ulid;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn job(job_type: &str, priority: i32, created: DateTime<Utc>) -> Job {
        Job::new(
            JobId::from_ulid(Ulid::new()),
            job_type,
            serde_json::json!({}),
            created,
            JobOptions::new().priority(priority).resolve(0, 3),
        )
    }

    fn types(q: &NamedQueue) -> Vec<String> {
        q.snapshot().into_iter().map(|j| j.job_type).collect()
    }

    #[test]
    fn push_keeps_priority_then_created_at_order() {
        let mut q = NamedQueue::new();
        q.push(job("a", 5, at(0)));
        q.push(job("b", 5, at(10)));
        q.push(job("c", 10, at(20)));
        q.push(job("d", 0, at(5)));
        q.push(job("e", 5, at(1)));

        assert_eq!(types(&q), vec!["c", "a", "e", "b", "d"]);
    }

    #[test]
    fn order_matches_sorting_for_any_insertion_sequence() {
        let cases = [(3, 40), (1, 10), (3, 20), (7, 30), (1, 0), (7, 5), (0, 50)];
        let mut q = NamedQueue::new();
        let mut expected = Vec::new();
        for (i, (priority, created)) in cases.iter().enumerate() {
            let j = job(&i.to_string(), *priority, at(*created));
            expected.push(j.clone());
            q.push(j);
        }
        expected.sort_by(queue_order);

        assert_eq!(q.snapshot(), expected);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut q = NamedQueue::new();
        q.push(job("first", 1, at(0)));
        q.push(job("second", 1, at(0)));
        assert_eq!(types(&q), vec!["first", "second"]);
    }

    #[test]
    fn pop_head_drains_in_order() {
        let mut q = NamedQueue::new();
        q.push(job("low", 0, at(0)));
        q.push(job("high", 9, at(1)));

        assert_eq!(q.pop_head().map(|j| j.job_type), Some("high".to_string()));
        assert_eq!(q.pop_head().map(|j| j.job_type), Some("low".to_string()));
        assert!(q.pop_head().is_none());
    }

    #[test]
    fn retried_job_keeps_created_at_for_ordering() {
        let mut q = NamedQueue::new();
        let old = job("old", 5, at(0));
        q.push(job("new-same", 5, at(100)));
        q.push(job("new-higher", 6, at(100)));
        q.push_front(old);

        // older created_at wins among equals, higher priority still first
        assert_eq!(types(&q), vec!["new-higher", "old", "new-same"]);
    }

    #[test]
    fn retry_front_insertion_beats_exact_ties() {
        let mut q = NamedQueue::new();
        q.push(job("fresh", 2, at(7)));
        q.push_front(job("retry", 2, at(7)));
        assert_eq!(types(&q), vec!["retry", "fresh"]);
    }

    #[test]
    fn retries_are_promoted_only_when_due() {
        let mut q = NamedQueue::new();
        let base = Instant::now();
        q.schedule_retry(job("later", 0, at(0)), base + Duration::from_secs(10));
        q.schedule_retry(job("sooner", 0, at(1)), base + Duration::from_secs(5));

        assert_eq!(q.next_retry_at(), Some(base + Duration::from_secs(5)));
        assert!(q.promote_due(base).is_empty());
        assert!(q.is_empty());

        assert_eq!(q.promote_due(base + Duration::from_secs(5)).len(), 1);
        assert_eq!(types(&q), vec!["sooner"]);
        assert_eq!(q.retry_len(), 1);

        assert_eq!(q.promote_due(base + Duration::from_secs(60)).len(), 1);
        assert_eq!(types(&q), vec!["later", "sooner"]);
        assert_eq!(q.next_retry_at(), None);
    }

    #[test]
    fn pop_order_matches_sorting_on_a_long_backlog() {
        let mut q = NamedQueue::new();
        let mut expected = Vec::new();
        for i in 0..500_i64 {
            let j = job(&i.to_string(), (i * 7 % 5) as i32, at(i * 13 % 97));
            expected.push(j.clone());
            q.push(j);
        }
        expected.sort_by(queue_order);

        let drained: Vec<Job> = std::iter::from_fn(|| q.pop_head()).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn later_front_insertions_go_first_among_exact_ties() {
        let mut q = NamedQueue::new();
        q.push(job("fresh", 1, at(3)));
        q.push_front(job("retry-1", 1, at(3)));
        q.push_front(job("retry-2", 1, at(3)));
        assert_eq!(types(&q), vec!["retry-2", "retry-1", "fresh"]);
    }

    #[test]
    fn take_all_empties_both_lists() {
        let mut q = NamedQueue::new();
        q.push(job("a", 0, at(0)));
        q.schedule_retry(job("b", 0, at(0)), Instant::now());

        assert_eq!(q.take_all().len(), 2);
        assert!(q.is_empty());
        assert_eq!(q.retry_len(), 0);
    }
}
