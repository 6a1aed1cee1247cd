use thiserror::Error;

pub mod csv_loader;
pub mod diagnostics;
pub mod query_builder;
pub mod query_engine;
pub mod row;
pub mod schema;
pub mod value;

/// Fatal failure of a single load call. No table is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Missing header line")]
    MissingHeader,

    #[error("Delimiter must be a single ASCII character other than a line break, got {0:?}")]
    InvalidDelimiter(char),
}

/// Reason a caster rejected a raw field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    #[error("Int parse error: {0}")]
    Int(String),

    #[error("Float parse error: {0}")]
    Float(String),

    #[error("Bool parse error: {0}")]
    Bool(String),

    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Values for key '{key}' are not comparable: {left} vs {right}")]
    Incomparable {
        key: String,
        left: &'static str,
        right: &'static str,
    },
}

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl From<bool> for SortOrder {
    fn from(ascending: bool) -> Self {
        if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// What `order_by` does when two sort keys cannot be compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IncomparablePolicy {
    /// Treat the pair as equal and keep going (a diagnostic is emitted once)
    #[default]
    TreatAsEqual,
    /// Abort with [`QueryError::Incomparable`]
    Fail,
}
