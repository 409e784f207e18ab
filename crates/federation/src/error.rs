//! Error types for the federation core.
//!
//! Errors are grouped by who is at fault: routing and access-control errors are
//! caller errors and always propagate, backend errors describe a remote
//! metastore that failed, registration and configuration errors come from the
//! administrative surface.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all federation operations.
#[derive(Error, Debug)]
pub enum FederationError {
    /// Name resolution errors
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Access-control violations
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Remote metastore failures
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Register/update/unregister failures
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Configuration loading and validation errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while resolving a name to a mapping.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// No mapping owns the name and no primary metastore is configured.
    #[error("no metastore can serve database '{database}': no primary metastore is configured")]
    NoPrimary { database: String },

    /// The primary metastore was requested but none is registered.
    #[error("no primary metastore is configured")]
    PrimaryNotConfigured,
}

/// Errors raised when an operation is forbidden by a mapping's policy.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Writes are not permitted on the metastore at all.
    #[error("metastore '{metastore}' is read-only, writes to database '{database}' are not allowed")]
    ReadOnly { metastore: String, database: String },

    /// The database is not in the metastore's writable whitelist.
    #[error("database '{database}' is not in the writable whitelist of metastore '{metastore}'")]
    NotWhitelisted { metastore: String, database: String },

    /// The metastore does not allow database creation.
    #[error("metastore '{metastore}' does not allow creating databases")]
    CreateNotPermitted { metastore: String },

    /// The database is hidden by the metastore's mapped databases.
    #[error("database '{database}' is not mapped by metastore '{metastore}'")]
    DatabaseNotMapped { metastore: String, database: String },

    /// The table is hidden by the metastore's mapped tables.
    #[error("table '{database}.{table}' is not mapped by metastore '{metastore}'")]
    TableNotMapped {
        metastore: String,
        database: String,
        table: String,
    },
}

/// Errors originating from a remote metastore.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the metastore failed or was lost.
    #[error("metastore unavailable: {metastore}: {message}")]
    Unavailable { metastore: String, message: String },

    /// The call did not complete in time.
    #[error("call to metastore {metastore} timed out after {timeout_ms}ms")]
    Timeout { metastore: String, timeout_ms: u64 },

    /// The metastore answered with an error.
    #[error("metastore {metastore} failed: {message}")]
    Remote { metastore: String, message: String },

    /// A bulk status probe was interrupted before reporting.
    #[error("status probe interrupted: {message}")]
    ProbeInterrupted { message: String },
}

impl BackendError {
    /// Attaches the metastore name to an error reported by its client.
    pub fn from_client(metastore: &str, err: ClientError) -> Self {
        match err {
            ClientError::Connection { message } => BackendError::Unavailable {
                metastore: metastore.to_string(),
                message,
            },
            ClientError::Timeout { timeout_ms } => BackendError::Timeout {
                metastore: metastore.to_string(),
                timeout_ms,
            },
            ClientError::Remote { message } => BackendError::Remote {
                metastore: metastore.to_string(),
                message,
            },
        }
    }
}

/// Errors reported by a backend client before the metastore name is known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// The client gave up waiting.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The remote side raised an exception.
    #[error("remote error: {message}")]
    Remote { message: String },
}

impl ClientError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        ClientError::Connection {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    pub fn remote(message: impl Into<String>) -> Self {
        ClientError::Remote {
            message: message.into(),
        }
    }
}

/// Errors raised by register, update and unregister.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// A different definition is already registered under this name.
    #[error("metastore name '{name}' is already registered")]
    DuplicateName { name: String },

    /// Another metastore already routes this prefix.
    #[error("prefix '{prefix}' is already registered by metastore '{owner}'")]
    DuplicatePrefix { prefix: String, owner: String },

    /// Another metastore already maps this database (manual resolution).
    #[error("database '{database}' is already mapped by metastore '{owner}'")]
    DuplicateDatabase { database: String, owner: String },

    /// A primary metastore is already registered.
    #[error("primary metastore '{existing}' is already registered")]
    PrimaryAlreadyRegistered { existing: String },

    /// The primary metastore cannot be removed.
    #[error("primary metastore '{name}' cannot be unregistered")]
    PrimaryUnregister { name: String },

    /// The federation type of a metastore cannot change on update.
    #[error("metastore '{name}' cannot change its federation type")]
    FederationTypeChange { name: String },

    /// No metastore is registered under the name.
    #[error("metastore not registered: {name}")]
    NotRegistered { name: String },

    /// The definition itself is malformed.
    #[error("invalid definition for metastore '{name}': {message}")]
    InvalidDefinition { name: String, message: String },

    /// The backend client could not be created.
    #[error("cannot create client for metastore '{name}': {source}")]
    Client {
        name: String,
        #[source]
        source: ClientError,
    },
}

/// Errors related to configuration loading, validation and persistence.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the federation file failed.
    #[error("federation file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The federation file is not valid YAML for the expected shape.
    #[error("cannot parse federation file: {message}")]
    Parse { message: String },

    /// One or more validation problems.
    #[error("invalid configuration: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },

    /// A duration setting could not be parsed.
    #[error("invalid duration '{value}': {message}")]
    Duration { value: String, message: String },
}

/// Result type alias for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// Result type alias for backend client calls.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for FederationError {
    fn from(err: serde_yaml::Error) -> Self {
        FederationError::Config(err.into())
    }
}
