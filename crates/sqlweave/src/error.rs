//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type WeaveResult<T> = Result<T, WeaveError>;

/// Boxed driver error carried as the source of execution/connection failures.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum WeaveError {
    /// A filter type was used before being declared on the statement
    #[error("Unsupported filter type: {0}")]
    UnsupportedFilter(String),

    /// A custom fragment name was used before being declared on the statement
    #[error("Unsupported custom name: {0}")]
    UnsupportedCustom(String),

    /// Malformed builder input (bad pair, negative limit, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Table/field alias already taken
    #[error("Duplicate alias: {0}")]
    DuplicateAlias(String),

    /// A nested statement was added without an alias
    #[error("Missing alias: {0}")]
    MissingAlias(String),

    /// The driver rejected a statement
    #[error("Execution error on '{connection}': {source} (sql: {sql})")]
    Execution {
        connection: String,
        sql: String,
        #[source]
        source: DriverError,
    },

    /// A transaction primitive (begin/savepoint/commit/rollback) failed
    #[error("Transaction {action} failed on '{connection}': {source}")]
    Transaction {
        action: &'static str,
        connection: String,
        #[source]
        source: Box<WeaveError>,
    },

    /// Transaction used in the wrong state (e.g. commit while idle)
    #[error("Transaction state error: {0}")]
    TransactionState(String),

    /// Connecting or configuring the connection failed
    #[error("Connection error on '{connection}': {source}")]
    Connection {
        connection: String,
        #[source]
        source: DriverError,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Row or column not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl WeaveError {
    /// Wrap a driver failure with the failing statement and the connection id.
    pub fn execution(
        connection: impl Into<String>,
        sql: impl Into<String>,
        source: impl Into<DriverError>,
    ) -> Self {
        Self::Execution {
            connection: connection.into(),
            sql: sql.into(),
            source: source.into(),
        }
    }

    /// Wrap a failed transaction primitive with its action name.
    pub fn transaction(action: &'static str, connection: impl Into<String>, source: WeaveError) -> Self {
        Self::Transaction {
            action,
            connection: connection.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a connect/option failure with the connection id.
    pub fn connection(connection: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Connection {
            connection: connection.into(),
            source: source.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Programmer misuse of the builder API. Never worth retrying.
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFilter(_)
                | Self::UnsupportedCustom(_)
                | Self::InvalidArgument(_)
                | Self::DuplicateAlias(_)
                | Self::MissingAlias(_)
        )
    }

    /// Check if this is a driver execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is a wrapped transaction primitive failure
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction { .. } | Self::TransactionState(_))
    }

    /// The failing SQL text, when the error came from the driver.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } => Some(sql),
            Self::Transaction { source, .. } => source.sql(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WeaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
