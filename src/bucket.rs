//! Group flat records by date
//!
//! Dates are opaque keys here: no normalisation, no timezone handling.
//! Buckets keep first-seen date order and input order within a date; the
//! aggregator does the chronological sort.

use crate::records::FlatRecord;
use std::collections::HashMap;

/// Ordered mapping from date to the records sharing that date
#[derive(Debug, Clone)]
pub struct DateBucket<R> {
    buckets: Vec<(String, Vec<R>)>,
    index: HashMap<String, usize>,
}

impl<R> DateBucket<R> {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of distinct dates
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of records across all dates
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn get(&self, date: &str) -> Option<&[R]> {
        self.index.get(date).map(|&i| self.buckets[i].1.as_slice())
    }

    /// Dates in first-seen order
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(date, _)| date.as_str())
    }

    /// `(date, records)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[R])> {
        self.buckets
            .iter()
            .map(|(date, records)| (date.as_str(), records.as_slice()))
    }
}

impl<R: FlatRecord> DateBucket<R> {
    pub fn push(&mut self, record: R) {
        match self.index.get(record.date()) {
            Some(&i) => self.buckets[i].1.push(record),
            None => {
                let date = record.date().to_string();
                self.index.insert(date.clone(), self.buckets.len());
                self.buckets.push((date, vec![record]));
            }
        }
    }
}

impl<R> Default for DateBucket<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FlatRecord> FromIterator<R> for DateBucket<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut bucket = DateBucket::new();
        for record in iter {
            bucket.push(record);
        }
        bucket
    }
}

/// Group `records` by exact date string
///
/// Duplicates are kept as separate entries.
pub fn bucketize<R, I>(records: I) -> DateBucket<R>
where
    R: FlatRecord,
    I: IntoIterator<Item = R>,
{
    records.into_iter().collect()
}
