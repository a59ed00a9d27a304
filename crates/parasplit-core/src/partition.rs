//! Partitioning of test classes into balanced groups.
//!
//! Classes are packed longest-first into the currently lightest bucket
//! (LPT scheduling). The lightest bucket after packing becomes the
//! exclusion bucket: it is emitted first, as a split that runs everything
//! *not* claimed by the other buckets, so classes missing from the duration
//! history are always run somewhere.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use serde::Serialize;

use crate::model::{Durations, ParallelismMode, Split, TestClass};

/// Classes assigned to one executor, with their summed estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub classes: Vec<String>,
    pub total: Duration,
}

impl Bucket {
    /// Ordering used both to pick where the next class goes and to pick the
    /// exclusion bucket: lightest total, then fewest classes, then index.
    fn load_key(&self, index: usize) -> (Duration, usize, usize) {
        (self.total, self.classes.len(), index)
    }

    fn push(&mut self, class: TestClass) {
        self.total = self.total.saturating_add(class.duration);
        self.classes.push(class.name);
    }
}

/// A computed partition. `buckets()[0]` is the exclusion bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    buckets: Vec<Bucket>,
}

impl Partition {
    /// Pack `durations` into `mode.group_count()` buckets.
    ///
    /// Without any duration data the result is a single empty bucket,
    /// i.e. one undivided split.
    pub fn compute(durations: &Durations, mode: ParallelismMode) -> Self {
        if durations.is_empty() {
            return Self {
                buckets: vec![Bucket::default()],
            };
        }

        let groups = mode.group_count();
        let mut classes: Vec<TestClass> = durations
            .iter()
            .map(|(name, d)| TestClass::new(name.clone(), *d))
            .collect();
        // Longest first; equal durations in identifier order.
        classes.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut buckets = vec![Bucket::default(); groups];
        let mut lightest: BinaryHeap<Reverse<(Duration, usize, usize)>> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| Reverse(b.load_key(i)))
            .collect();

        for class in classes {
            let Some(Reverse((_, _, index))) = lightest.pop() else {
                break;
            };
            let bucket = &mut buckets[index];
            bucket.push(class);
            lightest.push(Reverse(bucket.load_key(index)));
        }

        let exclusion = buckets
            .iter()
            .enumerate()
            .min_by_key(|(i, b)| b.load_key(*i))
            .map_or(0, |(i, _)| i);
        let remainder = buckets.remove(exclusion);
        buckets.insert(0, remainder);

        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Number of executor groups this partition describes.
    pub fn group_count(&self) -> usize {
        self.buckets.len()
    }

    /// Every class with a duration estimate, in bucket order.
    pub fn known_classes(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .iter()
            .flat_map(|b| b.classes.iter().map(String::as_str))
    }

    /// Largest estimated bucket total.
    pub fn max_load(&self) -> Duration {
        self.buckets
            .iter()
            .map(|b| b.total)
            .max()
            .unwrap_or_default()
    }

    /// Caller-facing splits: the exclusion split first, listing every class
    /// claimed by another bucket, then one inclusion split per bucket.
    pub fn splits(&self) -> Vec<Split> {
        let claimed = &self.buckets[1..];
        let excluded: Vec<String> = claimed
            .iter()
            .flat_map(|b| b.classes.iter().cloned())
            .collect();

        std::iter::once(Split::exclusion(excluded))
            .chain(claimed.iter().map(|b| Split::inclusion(b.classes.clone())))
            .collect()
    }
}

/// Partition `durations` into splits for `mode`.
pub fn partition(durations: &Durations, mode: ParallelismMode) -> Vec<Split> {
    Partition::compute(durations, mode).splits()
}
