//! Error types for Rill.

use crate::types::ValueKind;
use crate::value::Value;
use alloc::string::String;
use core::fmt;

/// Result type alias for Rill operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Rill operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Table already exists.
    TableExists {
        name: String,
    },
    /// Record not found.
    NotFound {
        table: String,
        key: Value,
    },
    /// A record with the same key already exists.
    DuplicateKey {
        table: String,
        key: Value,
    },
    /// A table has handed out every auto-assigned key.
    KeysExhausted {
        table: String,
    },
    /// A record is missing its key field.
    MissingKey {
        field: String,
    },
    /// A key field holds a value that cannot identify a record.
    InvalidKey {
        field: String,
        got: Option<ValueKind>,
    },
    /// A query read failed.
    QueryFailed {
        message: String,
    },
    /// The owning scope or subscription was already disposed.
    Disposed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::TableExists { name } => {
                write!(f, "Table already exists: {}", name)
            }
            Error::NotFound { table, key } => {
                write!(f, "Not found in table {}: {:?}", table, key)
            }
            Error::DuplicateKey { table, key } => {
                write!(f, "Duplicate key in table {}: {:?}", table, key)
            }
            Error::KeysExhausted { table } => {
                write!(f, "No auto-assigned keys left in table {}", table)
            }
            Error::MissingKey { field } => {
                write!(f, "Record is missing key field: {}", field)
            }
            Error::InvalidKey { field, got } => match got {
                Some(kind) => write!(f, "Invalid key field {}: got {}", field, kind.name()),
                None => write!(f, "Invalid key field {}: got null", field),
            },
            Error::QueryFailed { message } => {
                write!(f, "Query failed: {}", message)
            }
            Error::Disposed => {
                write!(f, "Subscription already disposed")
            }
        }
    }
}

impl Error {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a table exists error.
    pub fn table_exists(name: impl Into<String>) -> Self {
        Error::TableExists { name: name.into() }
    }

    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, key: Value) -> Self {
        Error::NotFound {
            table: table.into(),
            key,
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, key: Value) -> Self {
        Error::DuplicateKey {
            table: table.into(),
            key,
        }
    }

    /// Creates a keys exhausted error.
    pub fn keys_exhausted(table: impl Into<String>) -> Self {
        Error::KeysExhausted {
            table: table.into(),
        }
    }

    /// Creates a missing key error.
    pub fn missing_key(field: impl Into<String>) -> Self {
        Error::MissingKey {
            field: field.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(field: impl Into<String>, got: Option<ValueKind>) -> Self {
        Error::InvalidKey {
            field: field.into(),
            got,
        }
    }

    /// Creates a query failed error.
    pub fn query_failed(message: impl Into<String>) -> Self {
        Error::QueryFailed {
            message: message.into(),
        }
    }
}
