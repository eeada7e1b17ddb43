//! Host-port allocation over a configured range.
//!
//! Ports are scanned in ascending order and probed with a loopback TCP
//! connect: a successful connect means something is already listening, a
//! refused connect means the port is free. The probe is a liveness check, not
//! a reservation against other processes — an in-process reservation set
//! closes the window between allocation and the engine binding the port for
//! requests handled by this process, while a collision with another process
//! still surfaces later as a failed container start.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{OrchestratorError, Result};

/// Allocates host ports from `[start, end)`, smallest free port first.
pub struct PortAllocator {
    start: u16,
    end: u16,
    reserved: Arc<DashSet<u16>>,
}

impl PortAllocator {
    /// Create an allocator over the half-open range `[start, end)`.
    pub fn new(start: u16, end: u16) -> Self {
        Self {
            start,
            end,
            reserved: Arc::new(DashSet::new()),
        }
    }

    /// Lease the smallest port in the range that is neither reserved by a
    /// concurrent allocation nor bound by a live listener.
    ///
    /// The returned lease keeps the port out of subsequent scans until it is
    /// dropped; callers hold it across the container run step and drop it once
    /// the engine has either bound the port or failed.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NoPortsAvailable`] if the range is
    /// exhausted.
    pub async fn allocate(&self) -> Result<PortLease> {
        for port in self.start..self.end {
            if self.reserved.contains(&port) {
                continue;
            }

            if Self::has_listener(port).await {
                trace!(port, "port has a live listener, skipping");
                continue;
            }

            // insert returns false if another task reserved it since the probe
            if self.reserved.insert(port) {
                debug!(port, "allocated host port");
                return Ok(PortLease {
                    port,
                    reserved: Arc::clone(&self.reserved),
                });
            }
        }

        Err(OrchestratorError::NoPortsAvailable {
            start: self.start,
            end: self.end,
        })
    }

    /// The configured range as `(start, end)`.
    pub fn range(&self) -> (u16, u16) {
        (self.start, self.end)
    }

    /// Number of ports currently leased.
    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    /// A connect that succeeds means a listener is bound; a refused or timed
    /// out connect means the port is free.
    async fn has_listener(port: u16) -> bool {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        TcpStream::connect(addr).await.is_ok()
    }
}

/// RAII reservation for one allocated host port.
///
/// Dropping the lease releases the port back to the allocator, whether the
/// container run that consumed it succeeded or failed.
pub struct PortLease {
    port: u16,
    reserved: Arc<DashSet<u16>>,
}

impl PortLease {
    /// The leased host port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.reserved.remove(&self.port);
    }
}

impl std::fmt::Debug for PortLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortLease").field("port", &self.port).finish()
    }
}
