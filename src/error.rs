//! Error types for Avant.

use thiserror::Error;

/// The main error type for Avant operations.
#[derive(Debug, Error)]
pub enum AvantError {
    /// A field line inside a `schema` block could not be parsed.
    #[error("Malformed field '{line}': {message}")]
    MalformedField { line: String, message: String },

    /// The schema text itself is not a sequence of `schema <Name> { ... }` blocks.
    #[error("Schema parse error at position {position}: {message}")]
    SchemaParse { position: usize, message: String },

    /// Two blocks declare the same model.
    #[error("Duplicate model: '{0}'")]
    DuplicateModel(String),

    /// A `$relation(...)` points at a model or field that does not exist.
    #[error("Dangling relation on {model}.{field}: {message}")]
    DanglingRelation {
        model: String,
        field: String,
        message: String,
    },

    /// `findUnique` was called without filtering on a unique column.
    #[error("{table}: findUnique requires at least one unique column in `where`")]
    NotUniqueFilter { table: String },

    /// An `include` key has no matching relation.
    #[error("{table}: no relation registered for include key '{key}'")]
    UnknownRelation { table: String, key: String },

    /// A filter operand has the wrong shape for its operator.
    #[error("Malformed filter on column '{column}': {message}")]
    MalformedFilter { column: String, message: String },

    /// A mutating operation was given an empty `where`.
    #[error("{table}: {operation} requires at least one column in `where`")]
    MissingFilter {
        table: String,
        operation: &'static str,
    },

    /// Nothing to write.
    #[error("{table}: {operation} has no data to write")]
    EmptyPayload {
        table: String,
        operation: &'static str,
    },

    /// No table compiled for this model name.
    #[error("Unknown model: '{0}'")]
    UnknownModel(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvantError {
    /// Create a schema parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::SchemaParse {
            position,
            message: message.into(),
        }
    }

    /// Create a malformed field error for the given line.
    pub fn field(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedField {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Create a malformed filter error for the given column.
    pub fn filter(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFilter {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for Avant operations.
pub type AvantResult<T> = Result<T, AvantError>;
