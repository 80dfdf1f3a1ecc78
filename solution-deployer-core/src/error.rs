//! Error types shared by the portal contract and the Solution pipelines.

use thiserror::Error;

/// Message the platform returns for ids that are gone or not visible to the caller.
pub const ITEM_NOT_FOUND_MESSAGE: &str = "Item does not exist or is inaccessible";

/// Result type alias for Solution operations.
pub type SolutionResult<T> = Result<T, SolutionError>;

/// Errors reported by a [`crate::contract::Portal`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortalError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Portal API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl PortalError {
    /// True when the target no longer exists (or cannot be seen), which callers
    /// treat as an already-satisfied deletion.
    pub fn is_not_found(&self) -> bool {
        match self {
            PortalError::NotFound(_) => true,
            PortalError::Api { code, message } => {
                *code == 404 || message.contains(ITEM_NOT_FOUND_MESSAGE)
            }
            _ => false,
        }
    }
}

/// Errors that can occur while templating, deploying or deleting Solutions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolutionError {
    #[error("Item {0} is not a Solution")]
    NotASolution(String),

    #[error("Item {0} is not a deployed Solution")]
    NotDeployed(String),

    #[error("Cyclic dependency among items: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("Item type is not supported: {0}")]
    UnsupportedItemType(String),

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("Item {item_id} could not be created: {message}")]
    CreateFailed { item_id: String, message: String },

    #[error("Portal error: {0}")]
    Portal(#[from] PortalError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SolutionError {
    fn from(e: serde_json::Error) -> Self {
        SolutionError::Serialization(e.to_string())
    }
}
