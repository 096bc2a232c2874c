//! IP address allocation module.
//!
//! Link pools hand out point-to-point pairs and switch addresses from a
//! per-family cursor; loopback addresses are formatted from the document's
//! loopback prefix.

pub mod allocator;

// Re-export commonly used types
pub use allocator::{AddressFamily, AddressPoolAllocator, AllocError, LinkPool};
