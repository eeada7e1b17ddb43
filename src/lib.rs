//! # Rangekeeper
//!
//! On-demand provisioning of short-lived, network-exposed exercise containers
//! for cybersecurity training ranges. A caller asks for an exercise image with
//! a lifetime; rangekeeper pulls the image, starts a container bound to a free
//! host port, arms a failsafe expiry timer, and hands back a service URL.
//! Teardown happens either on explicit request (stop/remove, optionally with
//! image cleanup) or automatically when the lifetime elapses.
//!
//! ## Architecture Overview
//!
//! - **[`orchestrator`]**: the container lifecycle core — name derivation,
//!   lifetime validation, host-port allocation, the engine capability, the
//!   deferred expiry scheduler, and the lifecycle manager tying them together
//! - **[`config`]**: TOML configuration with a discovery hierarchy
//! - **[`cli`]**: operator command-line driver for the lifecycle operations
//!
//! The HTTP transport that typically fronts these operations is deliberately
//! not part of this crate; the lifecycle manager is transport-agnostic and the
//! calling application is expected to track container uptime itself — the
//! in-process expiry timer is a failsafe, not a scheduler.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rangekeeper::{ContainerLifecycleManager, RangekeeperConfig, StartRequest};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ContainerLifecycleManager::new(RangekeeperConfig::default())?;
//!
//!     let response = manager
//!         .start(&StartRequest {
//!             competition_name: "cyber_challenge".into(),
//!             exercise_name: "reverse_shell".into(),
//!             competition_uuid: Uuid::new_v4(),
//!             image_link: "inspersec/basic-ctf:latest".into(),
//!             port: 5000,
//!             time_alive: 3600,
//!         })
//!         .await?;
//!
//!     println!("exercise up at {}", response.service_url);
//!     manager.shutdown(&response.container_id).await?;
//!     Ok(())
//! }
//! ```

/// Container lifecycle orchestration core.
///
/// Naming, lifetime validation, port allocation, the container engine
/// capability, deferred expiry, and the lifecycle manager.
pub mod orchestrator;

/// Configuration loading and discovery.
pub mod config;

/// Command-line interface for driving the lifecycle manager.
pub mod cli;

// Re-export the main lifecycle types
pub use orchestrator::{
    ContainerEngine, ContainerLifecycleManager, DeleteResponse, DockerCli, ErrorKind,
    ExpiryScheduler, OrchestratorError, PortAllocator, ShutdownResponse, StartRequest,
    StartResponse,
};

// Re-export configuration types
pub use config::{ConfigDiscovery, RangekeeperConfig};
