//! Errors raised while materializing a topology.
//!
//! Every error is fatal for the build it occurs in: the engine reports the
//! first one and stops. A document that failed resolution is partially
//! mutated and has to be reloaded from its source.

use crate::backend::BackendError;
use crate::config::ValidationError;
use crate::ip::{AddressFamily, AllocError};
use crate::pipeline::{StageError, StageKind};

/// Errors of the resolution pass, the backend binding and the config build
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("{owner}: link '{link}' references undeclared endpoint '{endpoint}'")]
    UndeclaredEndpoint {
        owner: String,
        link: String,
        endpoint: String,
    },

    #[error("{router}: link '{link}' requests an automatic {family} address but no {family} pool is configured")]
    MissingAddressPool {
        router: String,
        link: String,
        family: AddressFamily,
    },

    #[error("{router}: {family} link pool exhausted while addressing link '{link}'")]
    AddressPoolExhausted {
        router: String,
        link: String,
        family: AddressFamily,
    },

    #[error("{router}: generated loopback address '{address}' is not valid")]
    InvalidLoopbackAddress { router: String, address: String },

    #[error("Invalid address pool: {0}")]
    AddressPool(#[from] AllocError),

    #[error("{node}: interface name '{interface}' was issued twice")]
    DuplicateInterface { node: String, interface: String },

    #[error("{owner}: malformed link key '{link}'")]
    MalformedLinkKey { owner: String, link: String },

    #[error("{router}: link '{link}' to {peer} has no matching '{mirror}' link on {peer}")]
    MissingMirrorLink {
        router: String,
        link: String,
        peer: String,
        mirror: String,
    },

    #[error("Name '{0}' has no numeric part to order by")]
    UnorderableName(String),

    #[error("Router {router} is attached to switch {switch} more than once")]
    DuplicateSwitchAttachment { router: String, switch: String },

    #[error("Backend rejected {what}")]
    BackendBinding {
        what: String,
        #[source]
        source: BackendError,
    },

    #[error("Loading configuration into {router} failed")]
    ConfigLoad {
        router: String,
        #[source]
        source: BackendError,
    },

    #[error("The {stage} configuration stage failed")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TopologyError {
    /// Attach the router and link an allocation was made for
    pub(crate) fn from_alloc(err: AllocError, router: &str, link: &str) -> Self {
        match err {
            AllocError::NotInitialized(family) | AllocError::NoLoopbackPrefix(family) => {
                TopologyError::MissingAddressPool {
                    router: router.to_string(),
                    link: link.to_string(),
                    family,
                }
            }
            AllocError::Exhausted(family) => TopologyError::AddressPoolExhausted {
                router: router.to_string(),
                link: link.to_string(),
                family,
            },
            AllocError::InvalidLoopback(address) => TopologyError::InvalidLoopbackAddress {
                router: router.to_string(),
                address,
            },
            other => TopologyError::AddressPool(other),
        }
    }
}
