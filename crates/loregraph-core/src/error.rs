//! Error types for Loregraph
//!
//! Every graph operation fails with a single error kind, [`GraphError`],
//! carrying a machine-readable [`ErrorCode`] and a details bag with the
//! offending identifiers and the underlying cause.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type alias using Loregraph's error
pub type Result<T> = std::result::Result<T, GraphError>;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lookup errors
    EntityNotFound,

    // Write errors
    AddEntityFailed,
    AddRelationshipFailed,
    RemoveEntityFailed,
    RemoveRelationshipFailed,
    ClearFailed,

    // Read errors
    GetEntityFailed,
    GetNeighborsFailed,
    FindPathFailed,
    FindPathsFailed,
    GetRelationshipsFailed,
    GetStatsFailed,
    GetEntitiesFailed,

    // Analytics errors
    FindCliquesFailed,
    CentralityFailed,
    ExportFailed,

    // Persistent engine only
    DriverNotAvailable,
    ConnectionFailed,
}

impl ErrorCode {
    /// Get the wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityNotFound => "ENTITY_NOT_FOUND",
            Self::AddEntityFailed => "ADD_ENTITY_FAILED",
            Self::AddRelationshipFailed => "ADD_RELATIONSHIP_FAILED",
            Self::RemoveEntityFailed => "REMOVE_ENTITY_FAILED",
            Self::RemoveRelationshipFailed => "REMOVE_RELATIONSHIP_FAILED",
            Self::ClearFailed => "CLEAR_FAILED",
            Self::GetEntityFailed => "GET_ENTITY_FAILED",
            Self::GetNeighborsFailed => "GET_NEIGHBORS_FAILED",
            Self::FindPathFailed => "FIND_PATH_FAILED",
            Self::FindPathsFailed => "FIND_PATHS_FAILED",
            Self::GetRelationshipsFailed => "GET_RELATIONSHIPS_FAILED",
            Self::GetStatsFailed => "GET_STATS_FAILED",
            Self::GetEntitiesFailed => "GET_ENTITIES_FAILED",
            Self::FindCliquesFailed => "FIND_CLIQUES_FAILED",
            Self::CentralityFailed => "CENTRALITY_FAILED",
            Self::ExportFailed => "EXPORT_FAILED",
            Self::DriverNotAvailable => "DRIVER_NOT_AVAILABLE",
            Self::ConnectionFailed => "CONNECTION_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error kind surfaced by graph operations
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct GraphError {
    code: ErrorCode,
    message: String,
    details: BTreeMap<String, String>,
}

impl GraphError {
    /// Create a new error with an empty details bag
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Shorthand for a missing entity
    pub fn entity_not_found(name: &str) -> Self {
        Self::new(ErrorCode::EntityNotFound, format!("Entity '{}' not found", name))
            .with_detail("entity", name)
    }

    /// Attach a detail to the error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Attach the underlying cause text
    pub fn with_cause(self, cause: impl fmt::Display) -> Self {
        self.with_detail("cause", cause)
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the details bag
    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    /// Get a single detail value
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    /// Whether the error is an entity lookup miss
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::EntityNotFound
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self.code {
            ErrorCode::DriverNotAvailable => Some(
                "Use a sqlite: connection URI or switch to the memory backend with `--backend memory`"
                    .to_string(),
            ),
            ErrorCode::ConnectionFailed => {
                Some("Check LOREGRAPH_GRAPH_URI and run `loregraph doctor`".to_string())
            }
            ErrorCode::EntityNotFound => {
                Some("Run `loregraph show <name>` to check the entity exists".to_string())
            }
            _ => None,
        }
    }

    /// Re-tag an error raised by a lower-level step with the operation code,
    /// preserving entity-not-found errors and connection-level failures.
    pub(crate) fn within(self, code: ErrorCode) -> Self {
        match self.code {
            ErrorCode::EntityNotFound
            | ErrorCode::DriverNotAvailable
            | ErrorCode::ConnectionFailed => self,
            _ if self.code == code => self,
            _ => {
                let previous = self.code;
                let mut error = self;
                error.code = code;
                error.with_detail("source_code", previous)
            }
        }
    }
}

/// Extension for mapping foreign errors into a coded [`GraphError`]
pub(crate) trait ResultExt<T> {
    fn or_code(self, code: ErrorCode, message: &str) -> Result<T>;
}

impl<T, E: fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn or_code(self, code: ErrorCode, message: &str) -> Result<T> {
        self.map_err(|e| GraphError::new(code, message).with_cause(e))
    }
}
