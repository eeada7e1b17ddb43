//! Exercise container lifecycle management.
//!
//! The lifecycle manager is the entry point for the three orchestration
//! operations: start (pull, run, arm expiry), shutdown (stop, remove) and
//! delete (stop, remove, remove image). Each invocation runs independently;
//! there is no shared registry of running containers beyond the expiry timers,
//! and no rollback on partial failure — a pulled image stays pulled if the
//! subsequent run fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::config::RangekeeperConfig;

use super::engine::{ContainerEngine, DockerCli, InspectField};
use super::expiry::ExpiryScheduler;
use super::ports::PortAllocator;
use super::{OrchestratorError, Result, naming};

/// Restart policy applied to every exercise container, so containers survive
/// a host reboot until their expiry or an explicit teardown.
const RESTART_POLICY: &str = "unless-stopped";

/// A request to provision one exercise container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    /// Competition the exercise belongs to
    pub competition_name: String,
    /// Exercise within the competition
    pub exercise_name: String,
    /// Competition instance identifier
    pub competition_uuid: Uuid,
    /// Image reference to pull and run
    pub image_link: String,
    /// Port the exercise service listens on inside the container
    pub port: u16,
    /// Requested lifetime in seconds
    pub time_alive: i64,
}

/// Description of a freshly provisioned container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// Engine-assigned container identifier
    pub container_id: String,
    /// Validated lifetime in seconds
    pub time_alive: i64,
    /// Host port the exercise is reachable on
    pub host_port: u16,
    /// Externally reachable service URL
    pub service_url: String,
    /// Provisioning instant, for callers tracking uptime on their side
    pub started_at: DateTime<Utc>,
}

/// Result of an explicit shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResponse {
    /// Identifier of the removed container
    pub container_id: String,
}

/// Result of a full deletion (container and image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Identifier of the removed container
    pub container_id: String,
    /// Identifier of the force-removed image; may be empty if the engine
    /// could no longer resolve it from the removed container's metadata
    pub image_id: String,
}

/// Orchestrates the lifecycle of exercise containers.
pub struct ContainerLifecycleManager {
    engine: Arc<dyn ContainerEngine>,
    ports: PortAllocator,
    expiry: ExpiryScheduler,
    config: RangekeeperConfig,
}

impl ContainerLifecycleManager {
    /// Create a manager backed by the configured container engine CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine binary cannot be found.
    pub fn new(config: RangekeeperConfig) -> Result<Self> {
        let engine = DockerCli::new(&config.engine_binary)
            .map_err(|e| OrchestratorError::Internal(e.diagnostic))?;

        Ok(Self::with_engine(Arc::new(engine), config))
    }

    /// Create a manager over an explicit engine implementation.
    pub fn with_engine(engine: Arc<dyn ContainerEngine>, config: RangekeeperConfig) -> Self {
        let ports = PortAllocator::new(config.port_range_start, config.port_range_end);
        let expiry = ExpiryScheduler::new(Arc::clone(&engine));

        Self {
            engine,
            ports,
            expiry,
            config,
        }
    }

    /// Derive the container name for a request.
    ///
    /// Sanitization is applied to the concatenated whole in the fixed order
    /// competition name, exercise name, competition identifier — swapping
    /// field contents changes the resulting name. Identical identifying
    /// fields derive the same name; the engine arbitrates such collisions.
    pub fn container_name(request: &StartRequest) -> Result<String> {
        naming::sanitize_container_name(&format!(
            "{}{}{}",
            request.competition_name, request.exercise_name, request.competition_uuid
        ))
    }

    /// Pull the exercise image, run a container for it on a free host port and
    /// arm its expiry failsafe.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::InvalidInput`] before any engine call if the
    ///   derived name is empty or the lifetime is out of bounds
    /// - [`OrchestratorError::ImagePullFailed`] if the engine cannot pull
    /// - [`OrchestratorError::NoPortsAvailable`] if the port range is exhausted
    /// - [`OrchestratorError::ContainerStartFailed`] if the run fails, which
    ///   includes losing the allocated port to another process
    pub async fn start(&self, request: &StartRequest) -> Result<StartResponse> {
        let container_name = Self::container_name(request)?;
        let time_alive =
            naming::validate_time_alive(request.time_alive, self.config.max_time_alive_secs)?;

        info!(
            container = %container_name,
            image = %request.image_link,
            "provisioning exercise container"
        );

        self.engine
            .pull(&request.image_link)
            .await
            .map_err(|e| OrchestratorError::ImagePullFailed(e.diagnostic))?;

        let lease = self.ports.allocate().await?;
        let host_port = lease.port();

        let run_result = self
            .engine
            .run(
                &container_name,
                RESTART_POLICY,
                host_port,
                request.port,
                &request.image_link,
            )
            .await;

        // The reservation only needs to cover the window between the probe and
        // the engine binding the port; release it on success and failure alike.
        drop(lease);

        let container_id =
            run_result.map_err(|e| OrchestratorError::ContainerStartFailed(e.diagnostic))?;

        self.expiry
            .schedule(&container_name, Duration::from_secs(time_alive as u64));

        let service_url = self.service_url(host_port)?;

        info!(
            container = %container_name,
            id = %container_id,
            host_port,
            time_alive,
            "exercise container running"
        );

        Ok(StartResponse {
            container_id,
            time_alive,
            host_port,
            service_url,
            started_at: Utc::now(),
        })
    }

    /// Stop and remove a container. The image is left in place.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::ContainerNotFound`] if the stop fails, including
    ///   a repeated shutdown of an already-removed container
    /// - [`OrchestratorError::Internal`] if the remove fails after a
    ///   successful stop
    pub async fn shutdown(&self, container_id: &str) -> Result<ShutdownResponse> {
        info!(container = %container_id, "shutting down exercise container");

        self.cancel_expiry(container_id).await;

        self.engine
            .stop(container_id)
            .await
            .map_err(|e| OrchestratorError::ContainerNotFound(e.diagnostic))?;

        self.engine
            .rm(container_id)
            .await
            .map_err(|e| OrchestratorError::Internal(e.diagnostic))?;

        Ok(ShutdownResponse {
            container_id: container_id.to_string(),
        })
    }

    /// Stop and remove a container, then force-remove its image.
    ///
    /// The initial stop is deliberately unchecked — the container may
    /// legitimately already be stopped.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::ContainerNotFound`] if the remove fails
    /// - [`OrchestratorError::ImageRemoveFailed`] if the image removal fails,
    ///   including the case where the image id could no longer be resolved
    pub async fn delete(&self, container_id: &str) -> Result<DeleteResponse> {
        info!(container = %container_id, "deleting exercise container and image");

        self.cancel_expiry(container_id).await;

        if let Err(e) = self.engine.stop(container_id).await {
            debug!(container = %container_id, error = %e, "stop before delete failed, continuing");
        }

        self.engine
            .rm(container_id)
            .await
            .map_err(|e| OrchestratorError::ContainerNotFound(e.diagnostic))?;

        // Metadata for a just-removed container may or may not still resolve;
        // an unresolvable image id is passed through empty and surfaces as the
        // engine's own rmi diagnostic.
        let image_id = self
            .engine
            .inspect(container_id, InspectField::Image)
            .await
            .unwrap_or_else(|_| String::new());

        self.engine
            .rmi(&image_id, true)
            .await
            .map_err(|e| OrchestratorError::ImageRemoveFailed(e.diagnostic))?;

        Ok(DeleteResponse {
            container_id: container_id.to_string(),
            image_id,
        })
    }

    /// Resolve the container's name and cancel its pending expiry timer.
    ///
    /// Best-effort: if the name cannot be resolved the timer stays armed and
    /// will later fail silently against the already-removed container.
    async fn cancel_expiry(&self, container_id: &str) {
        match self
            .engine
            .inspect(container_id, InspectField::Name)
            .await
        {
            Ok(name) if !name.is_empty() => {
                self.expiry.cancel(&name);
            }
            Ok(_) => {}
            Err(e) => {
                debug!(
                    container = %container_id,
                    error = %e,
                    "could not resolve container name for expiry cancellation"
                );
            }
        }
    }

    fn service_url(&self, host_port: u16) -> Result<String> {
        let url = Url::parse(&format!(
            "http://{}:{}",
            self.config.public_address, host_port
        ))
        .map_err(|e| OrchestratorError::Internal(format!("invalid service URL: {e}")))?;

        Ok(url.to_string())
    }

    /// The expiry scheduler, exposed for observability.
    pub fn expiry(&self) -> &ExpiryScheduler {
        &self.expiry
    }

    /// The port allocator backing this manager.
    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &RangekeeperConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StartRequest {
        StartRequest {
            competition_name: "cyber_challenge".to_string(),
            exercise_name: "reverse_shell".to_string(),
            competition_uuid: Uuid::parse_str("123e4567-e89b-12d3-a456-426614174002").unwrap(),
            image_link: "inspersec/basic-ctf:latest".to_string(),
            port: 5000,
            time_alive: 50,
        }
    }

    #[test]
    fn test_container_name_concatenates_in_fixed_order() {
        let name = ContainerLifecycleManager::container_name(&request()).unwrap();
        assert_eq!(
            name,
            "cyber_challengereverse_shell123e4567-e89b-12d3-a456-426614174002"
        );
    }

    #[test]
    fn test_container_name_sanitizes_the_concatenated_whole() {
        let mut req = request();
        req.competition_name = "cyber challenge!".to_string();
        req.exercise_name = "web/pwn".to_string();

        let name = ContainerLifecycleManager::container_name(&req).unwrap();
        assert!(name.starts_with("cyber_challenge_web_pwn"));
        assert!(
            name.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }

    #[test]
    fn test_swapping_fields_changes_the_name() {
        let req = request();
        let mut swapped = request();
        std::mem::swap(&mut swapped.competition_name, &mut swapped.exercise_name);

        let a = ContainerLifecycleManager::container_name(&req).unwrap();
        let b = ContainerLifecycleManager::container_name(&swapped).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_identical_requests_collide_on_the_same_name() {
        let a = ContainerLifecycleManager::container_name(&request()).unwrap();
        let b = ContainerLifecycleManager::container_name(&request()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_start_request_round_trips_through_json() {
        let req = request();
        let json = serde_json::to_string(&req).unwrap();
        let back: StartRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.competition_uuid, req.competition_uuid);
        assert_eq!(back.time_alive, req.time_alive);
        assert_eq!(back.port, req.port);
    }
}
