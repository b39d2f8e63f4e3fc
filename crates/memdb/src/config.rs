//! Database configuration.

use alloc::string::String;

/// Options a [`Database`](crate::Database) is opened with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Field holding each record's auto-assigned Int64 key.
    pub primary_key: String,
    /// Skip live-query emissions identical to the previous one.
    pub dedupe_results: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            primary_key: String::from("id"),
            dedupe_results: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn dedupe_results(mut self, value: bool) -> Self {
        self.dedupe_results = value;
        self
    }
}
