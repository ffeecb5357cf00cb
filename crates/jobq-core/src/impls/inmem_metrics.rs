//! InMemoryMetrics - 開発用・テスト用の MetricsSink
//!
//! Counters are keyed by name plus the sorted label set.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::ports::MetricsSink;

type Labels = Vec<(String, String)>;

/// Recording metrics sink.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<(String, Labels), u64>>,
}

/// One counter series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    pub name: String,
    pub labels: Labels,
    pub value: u64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the series with exactly these labels (order-insensitive).
    pub fn get(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = (name.to_string(), normalize(labels));
        self.counters.lock().get(&key).copied().unwrap_or(0)
    }

    /// Sum over every series of `name`.
    pub fn total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, v)| *v)
            .sum()
    }

    pub fn snapshot(&self) -> Vec<CounterSample> {
        self.counters
            .lock()
            .iter()
            .map(|((name, labels), value)| CounterSample {
                name: name.clone(),
                labels: labels.clone(),
                value: *value,
            })
            .collect()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment_counter(&self, name: &str, amount: u64, labels: &[(&str, &str)]) {
        let key = (name.to_string(), normalize(labels));
        *self.counters.lock().entry(key).or_default() += amount;
    }
}

fn normalize(labels: &[(&str, &str)]) -> Labels {
    let mut labels: Labels = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    labels.sort();
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_label_set() {
        let metrics = InMemoryMetrics::new();
        metrics.increment_counter("job_added", 1, &[("queue", "q"), ("type", "a")]);
        metrics.increment_counter("job_added", 2, &[("type", "a"), ("queue", "q")]);
        metrics.increment_counter("job_added", 1, &[("queue", "q"), ("type", "b")]);

        assert_eq!(metrics.get("job_added", &[("queue", "q"), ("type", "a")]), 3);
        assert_eq!(metrics.get("job_added", &[("queue", "q"), ("type", "b")]), 1);
        assert_eq!(metrics.total("job_added"), 4);
        assert_eq!(metrics.total("job_failed"), 0);
        assert_eq!(metrics.snapshot().len(), 2);
    }
}
