//! Consistency checks for resolved topologies.
//!
//! Resolution fills in names and addresses; these checks verify the result
//! before configuration is built from it.

use crate::config::{AddressSpec, TopologyDocument};
use crate::ip::AddressFamily;
use crate::topology::LinkKey;
use std::collections::BTreeMap;

/// Sequence number of an interface name, e.g. `r1-r2-eth3` -> 3
fn interface_seq(interface: &str) -> Option<usize> {
    interface
        .rsplit_once("-eth")
        .and_then(|(_, seq)| seq.parse().ok())
}

/// Validate a resolved topology document
///
/// Checks for:
/// - Router-to-router links whose two records do not mirror each other
/// - Gaps in a router's interface sequence numbers
/// - `auto` addresses left on router links
///
/// Addresses may repeat: `/32` and `/128` pools hand out overlapping pairs,
/// and literal addresses are taken as given.
///
/// # Arguments
/// * `doc` - The resolved topology document
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(String)` with an error message if validation fails
///
/// # Examples
/// ```
/// use topojson::config::TopologyDocument;
/// use topojson::utils::validation::validate_resolved_topology;
///
/// let doc: TopologyDocument = serde_json::from_str(r#"{
///     "routers": {
///         "r1": {"links": {"r2": {"interface": "r1-r2-eth0", "peer-interface": "r2-r1-eth0"}}},
///         "r2": {"links": {"r1": {"interface": "r2-r1-eth0", "peer-interface": "r1-r2-eth0"}}}
///     }
/// }"#).unwrap();
/// assert!(validate_resolved_topology(&doc).is_ok());
/// ```
pub fn validate_resolved_topology(doc: &TopologyDocument) -> Result<(), String> {
    let mut interface_count = 0;
    let mut address_count = 0;

    for (name, router) in &doc.routers {
        let mut seqs: Vec<usize> = Vec::new();

        for (key, link) in &router.links {
            for family in AddressFamily::ALL {
                match link.address(family) {
                    AddressSpec::Auto => {
                        return Err(format!(
                            "Router {} link '{}' still requests an automatic {} address",
                            name, key, family
                        ));
                    }
                    AddressSpec::Literal(_) => address_count += 1,
                    AddressSpec::Unset => {}
                }
            }

            if link.is_loopback() {
                continue;
            }

            let Some(interface) = link.interface.as_deref() else {
                return Err(format!("Router {} link '{}' has no interface name", name, key));
            };
            let seq = interface_seq(interface)
                .ok_or_else(|| format!("Router {} interface '{}' has no sequence number", name, interface))?;
            seqs.push(seq);

            // the peer's record must mirror this one
            let Some(link_key) = LinkKey::parse(key) else {
                continue;
            };
            let Some(peer) = doc.routers.get(&link_key.peer) else {
                continue;
            };
            let mirror_key = link_key.mirrored_for(name).to_string();
            let mirror = peer.links.get(&mirror_key).ok_or_else(|| {
                format!(
                    "Router {} link '{}' has no mirrored '{}' link on {}",
                    name, key, mirror_key, link_key.peer
                )
            })?;
            if mirror.interface.as_deref() != link.peer_interface.as_deref()
                || mirror.peer_interface.as_deref() != link.interface.as_deref()
            {
                return Err(format!(
                    "Router {} link '{}' and {} link '{}' do not mirror each other",
                    name, key, link_key.peer, mirror_key
                ));
            }
        }

        seqs.sort_unstable();
        if seqs.iter().enumerate().any(|(i, seq)| i != *seq) {
            return Err(format!(
                "Router {} interface sequence numbers are not contiguous: {:?}",
                name, seqs
            ));
        }
        interface_count += seqs.len();
    }

    log::info!(
        "Validated resolved topology: {} routers, {} interfaces, {} addresses",
        doc.routers.len(),
        interface_count,
        address_count
    );

    Ok(())
}

/// Interfaces of every router, sorted by sequence number
pub fn interfaces_by_router(doc: &TopologyDocument) -> BTreeMap<String, Vec<String>> {
    doc.routers
        .iter()
        .map(|(name, router)| {
            let mut interfaces: Vec<(usize, String)> = router
                .links
                .values()
                .filter_map(|link| link.interface.clone())
                .map(|interface| (interface_seq(&interface).unwrap_or(usize::MAX), interface))
                .collect();
            interfaces.sort();
            (name.clone(), interfaces.into_iter().map(|(_, interface)| interface).collect())
        })
        .collect()
}
