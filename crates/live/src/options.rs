//! Reconciliation options.

use alloc::string::String;

/// Field used to match collection elements when no key is given explicitly.
pub const DEFAULT_KEY: &str = "id";

/// How a snapshot is merged into a container.
///
/// - `key`: field matching old and new collection elements by identity.
///   Elements without a usable key value are matched by position.
/// - `merge`: when matching by position, mutate the existing element in place
///   instead of replacing it whenever it differs.
///
/// `{ key: None, merge: true }` treats the whole value as one object and is
/// what single-object containers use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub key: Option<String>,
    pub merge: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::keyed(DEFAULT_KEY)
    }
}

impl ReconcileOptions {
    /// Matches elements by the given key field.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            merge: false,
        }
    }

    /// Single-object reconciliation: `{ key: None, merge: true }`.
    pub fn object() -> Self {
        Self {
            key: None,
            merge: true,
        }
    }

    /// Positional matching without in-place merging.
    pub fn unkeyed() -> Self {
        Self {
            key: None,
            merge: false,
        }
    }

    /// Sets the merge flag.
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Returns the key field, if any.
    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}
