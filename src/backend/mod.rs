//! # Emulation backend interface
//!
//! The engine never creates routers, namespaces or virtual links itself. It
//! talks to an emulation/daemon-control layer through the [`Backend`] trait:
//!
//! - `add_router` / `add_switch` register nodes,
//! - `add_link` connects two nodes through named interfaces,
//! - `load_config` pushes a rendered configuration into a router,
//! - `run_command` runs a shell command inside a router.
//!
//! All calls are blocking. Timeouts and retries are the backend's business.
//!
//! [`BackendBinder`] wraps a backend for the resolution pass, and
//! [`RecordingBackend`] is an in-memory backend that records every call; the
//! command line tool uses it to write out a plan of the emulated network.

pub mod binder;
pub mod recording;

pub use binder::BackendBinder;
pub use recording::{BackendOp, NodeKind, RecordingBackend};

/// Errors reported by a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown node '{0}'")]
    UnknownNode(String),
    #[error("node '{0}' already exists")]
    DuplicateNode(String),
    #[error("interface '{interface}' already exists on {node}")]
    DuplicateInterface { node: String, interface: String },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capabilities the engine needs from the emulated environment
pub trait Backend {
    /// Register a router
    fn add_router(&mut self, name: &str) -> Result<(), BackendError>;

    /// Register a switch
    fn add_switch(&mut self, name: &str) -> Result<(), BackendError>;

    /// Connect `local` and `remote` through `local_if` and `remote_if`
    fn add_link(
        &mut self,
        local: &str,
        remote: &str,
        local_if: &str,
        remote_if: &str,
    ) -> Result<(), BackendError>;

    /// Load a rendered configuration into a router
    fn load_config(&mut self, router: &str, config: &str) -> Result<(), BackendError>;

    /// Run a command inside a router and return its output
    fn run_command(&mut self, router: &str, command: &str) -> Result<String, BackendError>;
}
