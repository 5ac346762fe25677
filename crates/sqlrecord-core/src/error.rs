//! Error types for SQLRecord operations.

use std::fmt;

/// The primary error type for all SQLRecord operations.
#[derive(Debug)]
pub enum Error {
    /// Configuration errors (connection list, connection strings, model registry)
    Config(ConfigError),
    /// Connection-related errors (unknown dialect, failed handshake)
    Connection(ConnectionError),
    /// Query execution errors
    Query(QueryError),
    /// Transaction state errors
    Transaction(TransactionError),
    /// Association metadata errors
    Association(AssociationError),
    /// Attribute assignment errors
    Attribute(AttributeError),
    /// Type conversion errors
    Type(TypeError),
    /// Operation not supported by the current dialect
    Unsupported(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The connection list is not a name -> connection string mapping
    InvalidConnections,
    /// Malformed connection string
    InvalidUrl,
    /// No model class registered under the requested name
    UnknownModel,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// No connector registered for the connection string scheme
    UnsupportedDialect,
    /// Handshake failed (authentication, host resolution, missing database)
    ConnectionFailed,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, not null)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// Commit or rollback without an open transaction
    NoActiveTransaction,
    /// A transaction is already open on this handle
    AlreadyActive,
}

#[derive(Debug)]
pub struct AssociationError {
    pub kind: AssociationErrorKind,
    pub model: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationErrorKind {
    /// The `through` bridge is missing or has the wrong shape
    InvalidThrough,
    /// No association with the requested name on the model
    UnknownAssociation,
    /// The association shape does not support the requested operation
    Unsupported,
}

#[derive(Debug)]
pub struct AttributeError {
    pub kind: AttributeErrorKind,
    pub model: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeErrorKind {
    /// Attribute is not a column of the model's table
    Undefined,
    /// The record was loaded read-only
    ReadOnly,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Build a configuration error.
    pub fn config(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Build an `UnsupportedDialect` error for a connection string scheme.
    pub fn unsupported_dialect(scheme: &str) -> Self {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::UnsupportedDialect,
            message: format!("Database adapter not found for protocol '{scheme}'"),
            source: None,
        })
    }

    /// Build a `ConnectionFailed` error carrying the engine's message.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::ConnectionFailed,
            message: message.into(),
            source: None,
        })
    }

    /// Build a `QueryFailed` error carrying the engine's message.
    pub fn query_failed(kind: QueryErrorKind, sql: Option<&str>, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: sql.map(str::to_string),
            message: message.into(),
            source: None,
        })
    }

    pub fn no_active_transaction() -> Self {
        Error::Transaction(TransactionError {
            kind: TransactionErrorKind::NoActiveTransaction,
            message: "There is no active transaction".to_string(),
        })
    }

    /// Build an `InvalidThroughAssociation` error for `model`.
    pub fn invalid_through(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Association(AssociationError {
            kind: AssociationErrorKind::InvalidThrough,
            model: model.into(),
            message: message.into(),
        })
    }

    pub fn is_unsupported_dialect(&self) -> bool {
        matches!(self, Error::Connection(c) if c.kind == ConnectionErrorKind::UnsupportedDialect)
    }

    pub fn is_connection_failed(&self) -> bool {
        matches!(self, Error::Connection(c) if c.kind == ConnectionErrorKind::ConnectionFailed)
    }

    pub fn is_query_failed(&self) -> bool {
        matches!(self, Error::Query(_))
    }

    pub fn is_no_active_transaction(&self) -> bool {
        matches!(self, Error::Transaction(t) if t.kind == TransactionErrorKind::NoActiveTransaction)
    }

    pub fn is_invalid_through(&self) -> bool {
        matches!(self, Error::Association(a) if a.kind == AssociationErrorKind::InvalidThrough)
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Association(e) => write!(f, "Association error in {}: {}", e.model, e.message),
            Error::Attribute(e) => write!(f, "Attribute error: {e}"),
            Error::Type(e) => write!(f, "Type error: {e}"),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for AssociationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AttributeErrorKind::Undefined => write!(
                f,
                "Undefined property: {}->{}",
                self.model,
                self.attributes.join(", ")
            ),
            AttributeErrorKind::ReadOnly => {
                write!(f, "{} was loaded read-only and cannot be saved", self.model)
            }
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<AssociationError> for Error {
    fn from(err: AssociationError) -> Self {
        Error::Association(err)
    }
}

impl From<AttributeError> for Error {
    fn from(err: AttributeError) -> Self {
        Error::Attribute(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(ConfigError {
            kind: ConfigErrorKind::InvalidConnections,
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

/// Result type alias for SQLRecord operations.
pub type Result<T> = std::result::Result<T, Error>;
