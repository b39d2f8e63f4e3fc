//! Value kind definitions for Rill.
//!
//! This module defines the kinds of values a record field can hold.

/// The kind of a non-null [`Value`](crate::Value).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean (true/false)
    Boolean,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Binary data
    Bytes,
    /// Ordered list of values
    Array,
    /// Nested record
    Object,
}

impl ValueKind {
    /// Returns the lowercase name of this kind, as used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Int64 => "int64",
            ValueKind::Float64 => "float64",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }

    /// Returns true if values of this kind can identify a record.
    #[inline]
    pub fn is_key_kind(&self) -> bool {
        matches!(self, ValueKind::Int64 | ValueKind::String | ValueKind::Bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ValueKind::Int64.name(), "int64");
        assert_eq!(ValueKind::Object.name(), "object");
    }

    #[test]
    fn test_key_kinds() {
        assert!(ValueKind::Int64.is_key_kind());
        assert!(ValueKind::String.is_key_kind());
        assert!(!ValueKind::Float64.is_key_kind());
        assert!(!ValueKind::Array.is_key_kind());
    }
}
