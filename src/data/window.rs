//! Fixed-capacity, index-aligned rolling window of samples per column.

use std::collections::VecDeque;

use crate::data::record::Record;
use crate::error::{Result, ScopeError};

/// The most recent `capacity` samples of every column plus their shared indices.
///
/// All column buffers and the index buffer always have the same length,
/// `min(samples_seen, capacity)`. Only [`fold`](Self::fold) grows them.
#[derive(Debug, Clone)]
pub struct TelemetryWindow {
    capacity: usize,
    indices: VecDeque<u64>,
    columns: Vec<VecDeque<f64>>,
    samples_seen: u64,
}

/// Read-only view of one column, aligned with the shared index buffer.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub indices: &'a VecDeque<u64>,
    pub values: &'a VecDeque<f64>,
}

impl Snapshot<'_> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Index of the newest sample.
    pub fn latest_index(&self) -> Option<u64> {
        self.indices.back().copied()
    }

    /// `(index, value)` pairs, oldest first.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| [i as f64, v])
    }
}

impl TelemetryWindow {
    /// A window with `columns` value buffers holding at most `capacity` samples each.
    ///
    /// A capacity of 0 is treated as 1; [`ScopeConfig::validate`](crate::config::ScopeConfig::validate)
    /// rejects it earlier.
    pub fn new(columns: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            indices: VecDeque::with_capacity(capacity + 1),
            columns: (0..columns)
                .map(|_| VecDeque::with_capacity(capacity + 1))
                .collect(),
            samples_seen: 0,
        }
    }

    /// Append one record, tagging it with the current sample counter.
    pub fn fold(&mut self, record: &Record) -> Result<()> {
        if record.len() != self.columns.len() {
            return Err(ScopeError::RecordWidth {
                expected: self.columns.len(),
                found: record.len(),
            });
        }
        self.indices.push_back(self.samples_seen);
        for (buf, &v) in self.columns.iter_mut().zip(record.values.iter()) {
            buf.push_back(v);
        }
        if self.indices.len() > self.capacity {
            self.indices.pop_front();
            for buf in self.columns.iter_mut() {
                buf.pop_front();
            }
        }
        self.samples_seen += 1;
        Ok(())
    }

    /// Empty every buffer and restart the sample counter at zero.
    pub fn clear(&mut self) {
        self.indices.clear();
        for buf in self.columns.iter_mut() {
            buf.clear();
        }
        self.samples_seen = 0;
    }

    /// Clear and resize for a new schema width.
    pub fn reset(&mut self, columns: usize) {
        self.clear();
        let cap = self.capacity + 1;
        self.columns.resize_with(columns, || VecDeque::with_capacity(cap));
    }

    pub fn snapshot(&self, column: usize) -> Option<Snapshot<'_>> {
        self.columns.get(column).map(|values| Snapshot {
            indices: &self.indices,
            values,
        })
    }

    pub fn indices(&self) -> &VecDeque<u64> {
        &self.indices
    }

    pub fn column_values(&self, column: usize) -> Option<&VecDeque<f64>> {
        self.columns.get(column)
    }

    /// Records folded since the last clear or reset.
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Samples currently held (same for every column).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_assigns_consecutive_indices() {
        let mut w = TelemetryWindow::new(2, 4);
        w.fold(&Record::new(vec![1.0, 10.0])).unwrap();
        w.fold(&Record::new(vec![2.0, 20.0])).unwrap();
        assert_eq!(w.indices(), &VecDeque::from(vec![0, 1]));
        assert_eq!(w.column_values(1).unwrap(), &VecDeque::from(vec![10.0, 20.0]));
        assert_eq!(w.samples_seen(), 2);
    }

    #[test]
    fn wrong_width_leaves_window_untouched() {
        let mut w = TelemetryWindow::new(2, 4);
        let err = w.fold(&Record::new(vec![1.0])).unwrap_err();
        assert!(matches!(err, ScopeError::RecordWidth { expected: 2, found: 1 }));
        assert!(w.is_empty());
        assert_eq!(w.samples_seen(), 0);
    }

    #[test]
    fn eviction_keeps_latest_capacity() {
        let mut w = TelemetryWindow::new(1, 3);
        for i in 0..5 {
            w.fold(&Record::new(vec![i as f64 * 2.0])).unwrap();
        }
        let snap = w.snapshot(0).unwrap();
        assert_eq!(snap.indices, &VecDeque::from(vec![2, 3, 4]));
        assert_eq!(snap.values, &VecDeque::from(vec![4.0, 6.0, 8.0]));
        assert_eq!(snap.latest_index(), Some(4));
    }

    #[test]
    fn clear_and_reset() {
        let mut w = TelemetryWindow::new(1, 3);
        w.fold(&Record::new(vec![1.0])).unwrap();
        w.clear();
        assert_eq!(w.samples_seen(), 0);
        assert!(w.snapshot(0).unwrap().is_empty());

        w.reset(3);
        assert_eq!(w.column_count(), 3);
        w.fold(&Record::new(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(w.indices(), &VecDeque::from(vec![0]));
        assert!(w.snapshot(3).is_none());
    }
}
