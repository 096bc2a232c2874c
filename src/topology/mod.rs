//! Topology resolution.
//!
//! This module turns a declared topology document into a resolved one:
//! link keys and node ordering, interface naming and the resolution pass
//! itself.

pub mod namer;
pub mod resolver;
pub mod types;

// Re-export key types and functions for easier access
pub use namer::InterfaceNamer;
pub use resolver::{resolve_topology, ResolvedTopology, TopologyResolver};
pub use types::{ordered_names, LinkKey};
