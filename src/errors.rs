//! Collector Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: setup (config, schema,
//! network), the tree library, the state cache, the Set pipeline and the
//! update ingestion loop.

use std::net::SocketAddr;
use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Schema descriptor failures (fatal at startup)
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Tree mutation, diff and validation failures
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Path text that could not be parsed
    #[error(transparent)]
    Path(#[from] PathError),

    /// State cache failures
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Set transaction failures
    #[error(transparent)]
    Set(#[from] SetError),

    /// Update ingestion failures
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Listener and transport failures
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path {path:?} contains an element with an empty name")]
    EmptyName { path: String },

    #[error("path {path:?} has an unterminated key selector")]
    UnterminatedKey { path: String },

    #[error("path {path:?} has a malformed key selector in element {element:?}")]
    MalformedKey { path: String, element: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema descriptor {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    /// The schema root must describe a container
    #[error("schema root is not a container")]
    RootNotContainer,

    #[error("list {path} declares no keys")]
    ListWithoutKeys { path: String },

    #[error("enumeration {path} declares no values")]
    EmptyEnumeration { path: String },

    #[error("leaf {path} has an empty range: min {min} > max {max}")]
    InvalidRange {
        path: String,
        min: String,
        max: String,
    },

    #[error("leaf {path} has an unusable default: {reason}")]
    InvalidDefault { path: String, reason: String },

    /// Root populated with defaults does not satisfy its own constraints
    #[error("default root of schema fails validation")]
    DefaultsInvalid(#[source] TreeError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("{path}: no schema element named {name:?}")]
    UnknownElement { path: String, name: String },

    #[error("{path}: list keys {got:?} do not match schema keys {expected:?}")]
    KeyMismatch {
        path: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("{path}: keys given for non-list element")]
    UnexpectedKeys { path: String },

    #[error("{path}: path continues below a leaf or an unkeyed list")]
    NotTraversable { path: String },

    /// Tree node kind disagrees with its schema node
    #[error("{path}: tree node does not match its schema kind")]
    KindMismatch { path: String },

    #[error("{path}: expected {expected} value, got {got}")]
    TypeMismatch {
        path: String,
        expected: String,
        got: String,
    },

    #[error("{path}: invalid JSON value: {reason}")]
    InvalidJson { path: String, reason: String },

    #[error("{path}: missing value")]
    MissingValue { path: String },

    #[error("{path}: double value {value} is not finite")]
    NonFinite { path: String, value: f64 },

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("unknown target {0:?}")]
    UnknownTarget(String),

    #[error("update without a path")]
    MissingPath,

    #[error("update for {path} carries no value")]
    MissingValue { path: String },

    /// An update older than the cached leaf was received
    #[error("update for {path} is stale: cached {cached}, received {received}")]
    Stale {
        path: String,
        cached: i64,
        received: i64,
    },
}

/// The config/state mirror convention was violated by a diff entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MirrorError {
    #[error("unexpected non-{sentinel} value for deletion at {path}")]
    NonStateDelete { path: String, sentinel: String },

    #[error("unexpected non-{sentinel} value for update at {path}")]
    NonStateUpdate { path: String, sentinel: String },

    #[error("path {path} is too short to carry a {sentinel} container")]
    TooShort { path: String, sentinel: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SetError {
    /// The collector was started without a schema
    #[error("collector is not configured for Set")]
    Unsupported,

    #[error("failed to resolve prefix {prefix}")]
    Prefix {
        prefix: String,
        #[source]
        source: TreeError,
    },

    #[error("prefix {prefix} does not address a container")]
    PrefixNotContainer { prefix: String },

    #[error("delete of {path} failed")]
    Delete {
        path: String,
        #[source]
        source: TreeError,
    },

    #[error("replace of {path} failed")]
    Replace {
        path: String,
        #[source]
        source: TreeError,
    },

    #[error("update of {path} failed")]
    Update {
        path: String,
        #[source]
        source: TreeError,
    },

    #[error("invalid SetRequest")]
    Validation(#[source] TreeError),

    #[error("failed to compute update notification")]
    Diff(#[source] TreeError),

    #[error(transparent)]
    Rewrite(#[from] MirrorError),

    #[error("failed to publish update notification")]
    Publish(#[source] CacheError),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The upstream source reported an error; ingestion stops for good
    #[error("error in response: {0}")]
    Source(String),

    #[error("response carries no payload")]
    EmptyResponse,

    #[error("failed to apply delta to cache")]
    Apply(#[source] CacheError),

    #[error("ingestion loop is no longer running")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// gRPC transport layer errors
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}
