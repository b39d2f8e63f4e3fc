//! Reconciliation reports.
//!
//! A `ReconcileReport` summarizes the mutations one snapshot caused in a
//! container: elements inserted, removed and updated in place.

/// The mutations applied by one reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Elements created for keys not seen before
    pub inserted: usize,
    /// Elements dropped because their key vanished
    pub removed: usize,
    /// Existing elements that had at least one field written
    pub updated: usize,
    /// Total field writes (including removals) across updated elements
    pub fields_written: usize,
    /// Whether the element sequence of a collection changed
    pub resequenced: bool,
}

impl ReconcileReport {
    /// Creates an empty report.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the snapshot changed nothing observable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && !self.resequenced
    }

    /// Returns the number of element-level changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inserted + self.removed + self.updated
    }

    /// Accumulates another report into this one.
    pub fn merge(&mut self, other: ReconcileReport) {
        self.inserted += other.inserted;
        self.removed += other.removed;
        self.updated += other.updated;
        self.fields_written += other.fields_written;
        self.resequenced |= other.resequenced;
    }
}
