//! Error types for the collection cycle.

use thiserror::Error;

/// Collection result type.
pub type Result<T> = std::result::Result<T, CollectError>;

/// Coarse error classification, used by callers to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection could not be opened (driver, locator, network, auth).
    Connection,
    /// A query failed on the server side.
    Query,
    /// The server answered with an unexpected table, column or row layout.
    Schema,
    /// A cell could not be parsed into the expected type.
    Parse,
}

/// Errors that abort a collection cycle.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Driver name is not one we can open.
    #[error("Unsupported driver '{0}' (expected 'mysql')")]
    UnsupportedDriver(String),

    /// Data source locator could not be parsed.
    #[error("Invalid data source: {0}")]
    InvalidDataSource(String),

    /// Opening the connection failed.
    #[error("Connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// A query failed to execute or to decode.
    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Table status returned no row for the job table.
    #[error("Table '{0}' not found")]
    MissingTable(String),

    /// A required column is absent from a result set.
    #[error("Column '{column}' not found in {context}")]
    MissingColumn {
        column: String,
        context: &'static str,
    },

    /// Rows do not have the layout the query promises.
    #[error("Unexpected result shape: {0}")]
    UnexpectedShape(String),

    /// A cell is not a well-formed value.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CollectError {
    /// Create an unexpected shape error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::UnexpectedShape(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid data source error.
    pub fn invalid_data_source(msg: impl Into<String>) -> Self {
        Self::InvalidDataSource(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedDriver(_) | Self::InvalidDataSource(_) | Self::Connection(_) => {
                ErrorKind::Connection
            }
            Self::Query(_) => ErrorKind::Query,
            Self::MissingTable(_) | Self::MissingColumn { .. } | Self::UnexpectedShape(_) => {
                ErrorKind::Schema
            }
            Self::Parse(_) => ErrorKind::Parse,
        }
    }
}
