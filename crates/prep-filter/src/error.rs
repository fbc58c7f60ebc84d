//! Error types for filter conversion.

use thiserror::Error;

/// A specialized Result type for filter conversion operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while building filters or converting filter trees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The filter type name is not one of the supported kinds.
    #[error("invalid filter type: {type_name}")]
    InvalidFilterType {
        /// The unsupported type name.
        type_name: String,
    },

    /// The arguments do not match the shape expected by the filter type.
    #[error("invalid arguments for {filter_type} filter: {reason}")]
    InvalidArguments {
        /// The filter type the arguments were meant for.
        filter_type: String,
        /// What is wrong with the arguments.
        reason: String,
    },

    /// A tree node uses an operator key this adapter does not know.
    #[error("unrecognized filter operator: {key}")]
    UnrecognizedOperator {
        /// The unexpected operator key.
        key: String,
    },

    /// A tree node is not shaped like a leaf or a binary combinator.
    #[error("malformed filter node: {reason}")]
    MalformedNode {
        /// Why the node was rejected.
        reason: String,
    },

    /// A column-scoped filter has no column id.
    #[error("{filter_type} filter requires a column id")]
    MissingColumn {
        /// The filter type missing its column.
        filter_type: String,
    },

    /// A date bound cannot be represented as a calendar instant.
    #[error("timestamp out of range: {millis}")]
    TimestampOutOfRange {
        /// The offending epoch milliseconds.
        millis: i64,
    },

    /// A date range bound is not an integral number of milliseconds.
    #[error("invalid date range bound: {bound}")]
    InvalidRangeBound {
        /// The offending bound, as written.
        bound: String,
    },
}

impl FilterError {
    /// Creates an invalid filter type error.
    pub fn invalid_filter_type(type_name: impl Into<String>) -> Self {
        FilterError::InvalidFilterType {
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(filter_type: impl ToString, reason: impl Into<String>) -> Self {
        FilterError::InvalidArguments {
            filter_type: filter_type.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an unrecognized operator error.
    pub fn unrecognized_operator(key: impl Into<String>) -> Self {
        FilterError::UnrecognizedOperator { key: key.into() }
    }

    /// Creates a malformed node error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        FilterError::MalformedNode {
            reason: reason.into(),
        }
    }

    /// Creates a missing column error.
    pub fn missing_column(filter_type: impl ToString) -> Self {
        FilterError::MissingColumn {
            filter_type: filter_type.to_string(),
        }
    }
}
