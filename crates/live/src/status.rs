//! Load status of a live query.

use rill_core::Error;

/// Where a live query stands.
///
/// An empty container reads the same before and after the first snapshot;
/// the status tells the two apart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// Subscribed, no snapshot delivered yet.
    #[default]
    Pending,
    /// At least one snapshot has been applied.
    Ready,
    /// The last delivery was a read failure.
    Failed(Error),
}

impl QueryStatus {
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryStatus::Pending)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, QueryStatus::Ready)
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            QueryStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}
