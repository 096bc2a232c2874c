//! Mirrors the resolved graph into the backend.

use super::Backend;
use crate::error::TopologyError;
use log::{debug, info};

/// Registers nodes and links with a backend during resolution
pub struct BackendBinder<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    links_bound: usize,
}

impl<'a, B: Backend + ?Sized> BackendBinder<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            links_bound: 0,
        }
    }

    /// Register all routers, then all switches, in the given order
    pub fn register_nodes(&mut self, routers: &[String], switches: &[String]) -> Result<(), TopologyError> {
        for router in routers {
            info!("Topo: Add router {}", router);
            self.backend
                .add_router(router)
                .map_err(|source| TopologyError::BackendBinding {
                    what: format!("router {}", router),
                    source,
                })?;
        }

        for switch in switches {
            info!("Topo: Add switch {}", switch);
            self.backend
                .add_switch(switch)
                .map_err(|source| TopologyError::BackendBinding {
                    what: format!("switch {}", switch),
                    source,
                })?;
        }

        Ok(())
    }

    /// Connect two nodes through their interfaces
    pub fn add_link(
        &mut self,
        local: &str,
        remote: &str,
        local_if: &str,
        remote_if: &str,
    ) -> Result<(), TopologyError> {
        debug!("Topo: Link {} ({}) <-> {} ({})", local, local_if, remote, remote_if);
        self.backend
            .add_link(local, remote, local_if, remote_if)
            .map_err(|source| TopologyError::BackendBinding {
                what: format!("link {}:{} - {}:{}", local, local_if, remote, remote_if),
                source,
            })?;
        self.links_bound += 1;
        Ok(())
    }

    /// Number of links bound through this binder
    pub fn links_bound(&self) -> usize {
        self.links_bound
    }
}
