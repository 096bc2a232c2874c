//! Topology document model.
//!
//! This is the declarative input of the engine: routers, switches and the
//! links between them, plus the address pool settings. The same structures
//! carry the resolved output, so a document can be loaded, resolved in place
//! and written back out.

use crate::ip::AddressFamily;
use ipnet::IpNet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Literal used in documents to request an automatically allocated address
pub const AUTO: &str = "auto";

/// Link type marking a loopback interface
pub const LOOPBACK_TYPE: &str = "loopback";

/// Address field of a link endpoint.
///
/// In documents this is either a CIDR string, the literal `"auto"`, or the
/// field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddressSpec {
    /// No address on this endpoint
    #[default]
    Unset,
    /// Allocate an address from the matching pool
    Auto,
    /// Concrete address, never modified by the resolver
    Literal(IpNet),
}

impl AddressSpec {
    pub fn is_unset(&self) -> bool {
        matches!(self, AddressSpec::Unset)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, AddressSpec::Auto)
    }

    /// The concrete address, if one is set
    pub fn literal(&self) -> Option<&IpNet> {
        match self {
            AddressSpec::Literal(net) => Some(net),
            _ => None,
        }
    }
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSpec::Unset => write!(f, "-"),
            AddressSpec::Auto => write!(f, "{}", AUTO),
            AddressSpec::Literal(net) => write!(f, "{}", net),
        }
    }
}

impl Serialize for AddressSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AddressSpec::Unset => serializer.serialize_none(),
            AddressSpec::Auto => serializer.serialize_str(AUTO),
            AddressSpec::Literal(net) => serializer.collect_str(net),
        }
    }
}

impl<'de> Deserialize<'de> for AddressSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None => Ok(AddressSpec::Unset),
            Some(AUTO) => Ok(AddressSpec::Auto),
            Some(cidr) => cidr
                .parse::<IpNet>()
                .map(AddressSpec::Literal)
                .map_err(|e| D::Error::custom(format!("invalid address '{}': {}", cidr, e))),
        }
    }
}

/// One endpoint of a link, declared under a router or a switch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "AddressSpec::is_unset")]
    pub ipv4: AddressSpec,
    #[serde(default, skip_serializing_if = "AddressSpec::is_unset")]
    pub ipv6: AddressSpec,
    /// Interface name of this endpoint (filled in by resolution)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Interface name of the other endpoint (filled in by resolution)
    #[serde(rename = "peer-interface", default, skip_serializing_if = "Option::is_none")]
    pub peer_interface: Option<String>,
    /// Explicit attached router, only meaningful on switch links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_node: Option<String>,
    /// Everything else (protocol settings, descriptions, ...) is kept as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LinkSpec {
    /// Whether this is a loopback interface rather than a link
    pub fn is_loopback(&self) -> bool {
        self.link_type.as_deref() == Some(LOOPBACK_TYPE)
    }

    pub fn address(&self, family: AddressFamily) -> &AddressSpec {
        match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        }
    }

    pub fn address_mut(&mut self, family: AddressFamily) -> &mut AddressSpec {
        match family {
            AddressFamily::V4 => &mut self.ipv4,
            AddressFamily::V6 => &mut self.ipv6,
        }
    }
}

/// A router and its declared links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterSpec {
    #[serde(default)]
    pub links: BTreeMap<String, LinkSpec>,
    /// Per-router configuration sections consumed by the configuration stages
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A switch and the routers attached to it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchSpec {
    #[serde(default)]
    pub links: BTreeMap<String, LinkSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Base addresses and masks of the link pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkIpStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4mask: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v6mask: Option<u8>,
}

/// Loopback prefix strings and masks.
///
/// The prefixes are textual: `"1.0."` and `"2001:db8:f::"` become
/// `1.0.<ordinal>.<column>/32` and `2001:db8:f::<ordinal>:<column>/128`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopbackPrefix {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v4mask: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v6mask: Option<u8>,
}

/// Root of a topology document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyDocument {
    pub routers: BTreeMap<String, RouterSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub switches: BTreeMap<String, SwitchSpec>,
    /// Presence enables automatic IPv4 link addressing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4base: Option<String>,
    /// Presence enables automatic IPv6 link addressing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_ip_start: Option<LinkIpStart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lo_prefix: Option<LoopbackPrefix>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TopologyDocument {
    /// Validate the document before resolution
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.routers.is_empty() {
            return Err(ValidationError::NoRouters);
        }

        if let Some(name) = self.switches.keys().find(|s| self.routers.contains_key(*s)) {
            return Err(ValidationError::NameClash(name.clone()));
        }

        if let Some(start) = &self.link_ip_start {
            Self::validate_mask("link_ip_start.v4mask", start.v4mask, 32)?;
            Self::validate_mask("link_ip_start.v6mask", start.v6mask, 128)?;
        }
        if let Some(lo) = &self.lo_prefix {
            Self::validate_mask("lo_prefix.v4mask", lo.v4mask, 32)?;
            Self::validate_mask("lo_prefix.v6mask", lo.v6mask, 128)?;
        }

        Ok(())
    }

    fn validate_mask(field: &'static str, mask: Option<u8>, max: u8) -> Result<(), ValidationError> {
        match mask {
            Some(value) if value > max => Err(ValidationError::InvalidMask { field, value, max }),
            _ => Ok(()),
        }
    }

    /// Whether automatic link addressing is enabled for `family`
    pub fn family_enabled(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::V4 => self.ipv4base.is_some(),
            AddressFamily::V6 => self.ipv6base.is_some(),
        }
    }

    /// Address families in use by this document
    pub fn address_types(&self) -> Vec<AddressFamily> {
        AddressFamily::ALL
            .into_iter()
            .filter(|family| self.family_enabled(*family))
            .collect()
    }

    pub fn is_switch(&self, name: &str) -> bool {
        self.switches.contains_key(name)
    }
}

/// Topology document validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Topology must declare at least one router")]
    NoRouters,
    #[error("Name '{0}' is used by both a router and a switch")]
    NameClash(String),
    #[error("Invalid {field}: {value} (maximum is {max})")]
    InvalidMask { field: &'static str, value: u8, max: u8 },
}
