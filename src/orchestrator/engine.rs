//! Container engine capability.
//!
//! The orchestrator drives the runtime through six operations: pull, run,
//! stop, rm, inspect and rmi. They are expressed as a trait so tests can
//! substitute a scripted engine; the production implementation shells out to
//! the docker CLI (or a compatible binary such as podman) and surfaces the
//! engine's stderr verbatim on failure. Engine calls carry no timeout: a hung
//! engine blocks the invoking request, which is accepted.

use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Failure reported by the container engine.
///
/// Carries the engine's diagnostic text verbatim for operator visibility.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{diagnostic}")]
pub struct EngineError {
    /// Raw diagnostic text, typically the engine's trimmed stderr
    pub diagnostic: String,
}

impl EngineError {
    /// Create an engine error from diagnostic text.
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Result of one engine invocation: trimmed stdout on success, the engine's
/// diagnostic text on failure.
pub type EngineResult = std::result::Result<String, EngineError>;

/// Container metadata field resolvable through [`ContainerEngine::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectField {
    /// The identifier of the image the container was created from
    Image,
    /// The container's name
    Name,
}

impl InspectField {
    fn format_arg(self) -> &'static str {
        match self {
            InspectField::Image => "--format={{.Image}}",
            InspectField::Name => "--format={{.Name}}",
        }
    }
}

/// The six engine operations the orchestrator depends on.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pull an image from its registry.
    async fn pull(&self, image: &str) -> EngineResult;

    /// Run a detached container. The success value is the engine-assigned
    /// container identifier.
    async fn run(
        &self,
        name: &str,
        restart_policy: &str,
        host_port: u16,
        container_port: u16,
        image: &str,
    ) -> EngineResult;

    /// Stop a container by identifier or name.
    async fn stop(&self, container: &str) -> EngineResult;

    /// Remove a container by identifier or name.
    async fn rm(&self, container: &str) -> EngineResult;

    /// Resolve one metadata field for a container.
    async fn inspect(&self, container: &str, field: InspectField) -> EngineResult;

    /// Remove an image, optionally forcing removal.
    async fn rmi(&self, image: &str, force: bool) -> EngineResult;
}

/// Container engine driven through the docker CLI.
///
/// Each operation is one external process invocation; a non-zero exit status
/// becomes an [`EngineError`] carrying the process's stderr.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    /// Create an engine over the given CLI binary ("docker", "podman", ...).
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be found on `PATH`.
    pub fn new(binary: impl Into<String>) -> Result<Self, EngineError> {
        let binary = binary.into();
        which::which(&binary).map_err(|e| {
            EngineError::new(format!("container engine binary '{binary}' not found: {e}"))
        })?;

        Ok(Self { binary })
    }

    /// The configured engine binary name.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn invoke(&self, args: &[&str]) -> EngineResult {
        debug!(engine = %self.binary, ?args, "invoking container engine");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| EngineError::new(format!("failed to invoke {}: {e}", self.binary)))?;

        Self::into_result(output)
    }

    fn into_result(output: Output) -> EngineResult {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(EngineError::new(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn pull(&self, image: &str) -> EngineResult {
        self.invoke(&["pull", image]).await
    }

    async fn run(
        &self,
        name: &str,
        restart_policy: &str,
        host_port: u16,
        container_port: u16,
        image: &str,
    ) -> EngineResult {
        let mapping = format!("{host_port}:{container_port}");
        self.invoke(&[
            "run",
            "-d",
            "--name",
            name,
            "--restart",
            restart_policy,
            "-p",
            mapping.as_str(),
            image,
        ])
        .await
    }

    async fn stop(&self, container: &str) -> EngineResult {
        self.invoke(&["stop", container]).await
    }

    async fn rm(&self, container: &str) -> EngineResult {
        self.invoke(&["rm", container]).await
    }

    async fn inspect(&self, container: &str, field: InspectField) -> EngineResult {
        let raw = self.invoke(&["inspect", field.format_arg(), container]).await?;

        // The engine reports names with a leading slash.
        Ok(match field {
            InspectField::Name => raw.trim_start_matches('/').to_string(),
            InspectField::Image => raw,
        })
    }

    async fn rmi(&self, image: &str, force: bool) -> EngineResult {
        if force {
            self.invoke(&["rmi", "-f", image]).await
        } else {
            self.invoke(&["rmi", image]).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(code: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_success_yields_trimmed_stdout() {
        let result = DockerCli::into_result(output(0, "abc123def456\n", ""));
        assert_eq!(result.unwrap(), "abc123def456");
    }

    #[test]
    fn test_failure_yields_trimmed_stderr() {
        let result = DockerCli::into_result(output(
            1,
            "",
            "Error: No such container: deadbeef\n",
        ));
        assert_eq!(
            result.unwrap_err().diagnostic,
            "Error: No such container: deadbeef"
        );
    }

    #[test]
    fn test_inspect_format_args() {
        assert_eq!(InspectField::Image.format_arg(), "--format={{.Image}}");
        assert_eq!(InspectField::Name.format_arg(), "--format={{.Name}}");
    }

    #[test]
    fn test_missing_binary_is_rejected() {
        let err = DockerCli::new("definitely-not-a-container-engine-9000").unwrap_err();
        assert!(err.diagnostic.contains("not found"));
    }

    #[tokio::test]
    #[ignore] // Requires a docker-compatible engine on PATH
    async fn test_real_engine_inspect_missing_container() {
        let engine = DockerCli::new("docker").unwrap();
        let err = engine
            .inspect("rangekeeper-does-not-exist", InspectField::Image)
            .await
            .unwrap_err();
        assert!(!err.diagnostic.is_empty());
    }
}
