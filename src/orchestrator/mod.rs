//! Container lifecycle orchestration.
//!
//! This module provisions exercise containers on demand and tears them down,
//! either on explicit request or automatically once their lifetime elapses.
//!
//! ## Architecture
//!
//! The orchestrator is organized into several components:
//!
//! - [`naming`]: container name sanitization and lifetime validation
//! - [`ports`]: host-port allocation over a configured range, with an
//!   in-process reservation set
//! - [`engine`]: the container engine capability (pull/run/stop/rm/inspect/rmi)
//!   with a docker CLI implementation
//! - [`expiry`]: deferred, cancellable expiry tasks keyed by container name
//! - [`lifecycle`]: the lifecycle manager exposing Start, Shutdown and Delete
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rangekeeper::orchestrator::{ContainerLifecycleManager, StartRequest};
//! use rangekeeper::config::RangekeeperConfig;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ContainerLifecycleManager::new(RangekeeperConfig::default())?;
//!
//!     let response = manager
//!         .start(&StartRequest {
//!             competition_name: "cyber_challenge".into(),
//!             exercise_name: "web_pwn".into(),
//!             competition_uuid: Uuid::new_v4(),
//!             image_link: "inspersec/basic-ctf:latest".into(),
//!             port: 5000,
//!             time_alive: 1800,
//!         })
//!         .await?;
//!
//!     // Explicit teardown; the expiry timer would otherwise reap it.
//!     manager.delete(&response.container_id).await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod expiry;
pub mod lifecycle;
pub mod naming;
pub mod ports;

pub use engine::{ContainerEngine, DockerCli, EngineError, InspectField};
pub use expiry::ExpiryScheduler;
pub use lifecycle::{
    ContainerLifecycleManager, DeleteResponse, ShutdownResponse, StartRequest, StartResponse,
};
pub use naming::{MAX_TIME_ALIVE_SECS, sanitize_container_name, validate_time_alive};
pub use ports::{PortAllocator, PortLease};

/// Orchestration errors.
///
/// Engine-reported failures carry the engine's diagnostic text verbatim so
/// operators can see exactly what the runtime complained about.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Empty name input or a lifetime outside the permitted bound
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The host port range was exhausted with no free port found
    #[error("no free ports available in range {start}-{end}")]
    NoPortsAvailable {
        /// First port of the scanned range
        start: u16,
        /// One past the last port of the scanned range
        end: u16,
    },

    /// The engine failed to pull the requested image
    #[error("failed to pull image: {0}")]
    ImagePullFailed(String),

    /// The engine could not find the container to stop or remove
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The engine failed to start the container (includes host-port collisions
    /// lost to another process between allocation and run)
    #[error("failed to start container: {0}")]
    ContainerStartFailed(String),

    /// The engine failed to force-remove the container's image
    #[error("failed to remove image: {0}")]
    ImageRemoveFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for any other unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Transport-level classification of this error.
    ///
    /// The lifecycle manager is transport-agnostic; a fronting HTTP layer maps
    /// these to 400 / 404 / 500 respectively.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::BadRequest,
            Self::ImagePullFailed(_) | Self::ContainerNotFound(_) => ErrorKind::NotFound,
            Self::NoPortsAvailable { .. }
            | Self::ContainerStartFailed(_)
            | Self::ImageRemoveFailed(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Coarse error classification for the external transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input was rejected before any engine call
    BadRequest,
    /// The engine reported the target image or container as missing
    NotFound,
    /// Everything else
    Internal,
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            OrchestratorError::InvalidInput("x".into()).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            OrchestratorError::ImagePullFailed("no such image".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            OrchestratorError::ContainerNotFound("gone".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            OrchestratorError::ContainerStartFailed("port in use".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            OrchestratorError::NoPortsAvailable {
                start: 50000,
                end: 60000
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_engine_diagnostic_is_preserved_verbatim() {
        let err = OrchestratorError::ImagePullFailed(
            "Error response from daemon: pull access denied".into(),
        );
        assert!(
            err.to_string()
                .contains("Error response from daemon: pull access denied")
        );
    }
}
