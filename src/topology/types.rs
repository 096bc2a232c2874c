//! Link identity and node ordering.

use crate::error::TopologyError;
use crate::utils::ip_utils::numeric_key;
use std::fmt;

/// Parsed key of a link under a router or switch.
///
/// A key is either the other endpoint's name (`r2`) or the name followed by
/// a discriminator for parallel links (`r2-link1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub peer: String,
    pub discriminator: Option<String>,
}

impl LinkKey {
    /// Parse a link key, splitting at the first `-`.
    ///
    /// Returns `None` for an empty peer or an empty discriminator.
    pub fn parse(key: &str) -> Option<Self> {
        match key.split_once('-') {
            None if key.is_empty() => None,
            None => Some(Self {
                peer: key.to_string(),
                discriminator: None,
            }),
            Some((peer, discriminator)) if peer.is_empty() || discriminator.is_empty() => None,
            Some((peer, discriminator)) => Some(Self {
                peer: peer.to_string(),
                discriminator: Some(discriminator.to_string()),
            }),
        }
    }

    /// Key of the same link as declared on the peer, seen from `local`.
    ///
    /// `r3-link1` declared under `r2` mirrors to `r2-link1` under `r3`.
    pub fn mirrored_for(&self, local: &str) -> LinkKey {
        LinkKey {
            peer: local.to_string(),
            discriminator: self.discriminator.clone(),
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(discriminator) => write!(f, "{}-{}", self.peer, discriminator),
            None => write!(f, "{}", self.peer),
        }
    }
}

/// Order node names by their embedded number (`r2` before `r10`), then by
/// name.
pub fn ordered_names<'a, I>(names: I) -> Result<Vec<String>, TopologyError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keyed = names
        .into_iter()
        .map(|name| {
            numeric_key(name)
                .map(|key| (key, name.clone()))
                .ok_or_else(|| TopologyError::UnorderableName(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort();
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}
