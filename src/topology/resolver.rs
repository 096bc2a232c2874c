//! Topology resolution.
//!
//! Resolution walks the declared document once and fills in every link's
//! `interface`, `peer-interface`, `ipv4` and `ipv6` fields, registering
//! nodes and links with the backend as it goes.
//!
//! Routers are processed in numeric order. A router-to-router link is handled
//! when its first endpoint is processed: both ends are named and addressed in
//! one step, and the peer's mirrored record is updated at the same time.
//! Switch attachments are handled afterwards, switch by switch.

use crate::backend::{Backend, BackendBinder};
use crate::config::{AddressSpec, LinkSpec, TopologyDocument};
use crate::error::TopologyError;
use crate::ip::{AddressFamily, AddressPoolAllocator};
use crate::topology::namer::InterfaceNamer;
use crate::topology::types::{ordered_names, LinkKey};
use crate::utils::ip_utils::number_to_column;
use log::{debug, info, log_enabled, warn, Level};
use std::collections::HashSet;
use std::ops::Deref;

/// A document that went through resolution.
///
/// Read-only view handed to the configuration pipeline and the artifact
/// writers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTopology(TopologyDocument);

impl ResolvedTopology {
    pub fn document(&self) -> &TopologyDocument {
        &self.0
    }

    pub fn into_document(self) -> TopologyDocument {
        self.0
    }
}

impl Deref for ResolvedTopology {
    type Target = TopologyDocument;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Owns the allocation and naming state of one resolution pass
#[derive(Debug)]
pub struct TopologyResolver {
    allocator: AddressPoolAllocator,
    namer: InterfaceNamer,
    loopback_count: usize,
}

impl TopologyResolver {
    /// Validate `doc` and set up the address pools it requests
    pub fn new(doc: &TopologyDocument) -> Result<Self, TopologyError> {
        doc.validate()?;
        Ok(Self {
            allocator: AddressPoolAllocator::from_document(doc)?,
            namer: InterfaceNamer::new(),
            loopback_count: 0,
        })
    }

    pub fn allocator(&self) -> &AddressPoolAllocator {
        &self.allocator
    }

    pub fn namer(&self) -> &InterfaceNamer {
        &self.namer
    }

    /// Number of routers that received a loopback ordinal
    pub fn loopback_count(&self) -> usize {
        self.loopback_count
    }

    /// Resolve `doc` in place. `doc` is the document the resolver was
    /// created from.
    ///
    /// On error the document is left partially resolved and should be
    /// discarded.
    pub fn resolve<B: Backend + ?Sized>(
        &mut self,
        doc: &mut TopologyDocument,
        binder: &mut BackendBinder<'_, B>,
    ) -> Result<(), TopologyError> {
        let routers = ordered_names(doc.routers.keys())?;
        let switches = ordered_names(doc.switches.keys())?;
        binder.register_nodes(&routers, &switches)?;

        let mut processed: HashSet<String> = HashSet::new();
        for router in &routers {
            self.resolve_router(doc, router, &processed, binder)?;
            processed.insert(router.clone());

            if log_enabled!(Level::Debug) {
                if let Some(spec) = doc.routers.get(router) {
                    if let Ok(json) = serde_json::to_string_pretty(&spec.links) {
                        debug!("Generated link data for router {}:\n{}", router, json);
                    }
                }
            }
        }

        let mut attached: HashSet<(String, String)> = HashSet::new();
        for switch in &switches {
            self.resolve_switch(doc, switch, &mut attached, binder)?;
        }

        Ok(())
    }

    fn resolve_router<B: Backend + ?Sized>(
        &mut self,
        doc: &mut TopologyDocument,
        router: &str,
        processed: &HashSet<String>,
        binder: &mut BackendBinder<'_, B>,
    ) -> Result<(), TopologyError> {
        let keys: Vec<String> = match doc.routers.get(router) {
            Some(spec) => spec.links.keys().cloned().collect(),
            None => return Ok(()),
        };
        let mut loopback_ordinal: Option<usize> = None;

        for link in keys {
            let is_loopback = router_link(doc, router, &link)?.is_loopback();
            if is_loopback {
                let ordinal = *loopback_ordinal.get_or_insert_with(|| {
                    self.loopback_count += 1;
                    self.loopback_count
                });
                self.address_loopback(doc, router, &link, ordinal)?;
                continue;
            }

            let key = LinkKey::parse(&link).ok_or_else(|| TopologyError::MalformedLinkKey {
                owner: router.to_string(),
                link: link.clone(),
            })?;
            if key.peer == router {
                return Err(TopologyError::MalformedLinkKey {
                    owner: router.to_string(),
                    link,
                });
            }

            let peer_is_router = doc.routers.contains_key(&key.peer);
            if peer_is_router && !processed.contains(&key.peer) {
                self.resolve_router_link(doc, router, &link, &key, binder)?;
            } else if peer_is_router {
                // handled from the peer's side already
                if router_link(doc, router, &link)?.interface.is_none() {
                    return Err(TopologyError::MissingMirrorLink {
                        router: router.to_string(),
                        mirror: key.mirrored_for(router).to_string(),
                        peer: key.peer,
                        link,
                    });
                }
            } else if doc.is_switch(&key.peer) {
                debug!("{}: link '{}' is attached to switch {}", router, link, key.peer);
            } else {
                return Err(TopologyError::UndeclaredEndpoint {
                    owner: router.to_string(),
                    link,
                    endpoint: key.peer,
                });
            }
        }

        Ok(())
    }

    fn address_loopback(
        &mut self,
        doc: &mut TopologyDocument,
        router: &str,
        link: &str,
        ordinal: usize,
    ) -> Result<(), TopologyError> {
        let column = number_to_column(router).unwrap_or_default();
        let spec = router_link_mut(doc, router, link)?;

        for family in AddressFamily::ALL {
            if spec.address(family).is_auto() {
                let addr = self
                    .allocator
                    .allocate_loopback(family, ordinal, column)
                    .map_err(|e| TopologyError::from_alloc(e, router, link))?;
                debug!("{}: loopback {} address {}", router, family, addr);
                *spec.address_mut(family) = AddressSpec::Literal(addr);
            }
        }

        Ok(())
    }

    fn resolve_router_link<B: Backend + ?Sized>(
        &mut self,
        doc: &mut TopologyDocument,
        router: &str,
        link: &str,
        key: &LinkKey,
        binder: &mut BackendBinder<'_, B>,
    ) -> Result<(), TopologyError> {
        let peer = key.peer.as_str();
        let mirror = key.mirrored_for(router).to_string();
        let mut remote = doc
            .routers
            .get(peer)
            .and_then(|spec| spec.links.get(&mirror))
            .cloned()
            .ok_or_else(|| TopologyError::MissingMirrorLink {
                router: router.to_string(),
                link: link.to_string(),
                peer: peer.to_string(),
                mirror: mirror.clone(),
            })?;
        let mut local = router_link(doc, router, link)?.clone();

        let local_if = self.namer.next_interface_name(router, peer)?;
        let remote_if = self.namer.next_interface_name(peer, router)?;
        local.interface = Some(local_if.clone());
        local.peer_interface = Some(remote_if.clone());
        remote.interface = Some(remote_if.clone());
        remote.peer_interface = Some(local_if.clone());

        binder.add_link(router, peer, &local_if, &remote_if)?;

        for family in AddressFamily::ALL {
            if !local.address(family).is_auto() && !remote.address(family).is_auto() {
                continue;
            }
            let (low, high) = self
                .allocator
                .allocate_link_pair(family)
                .map_err(|e| TopologyError::from_alloc(e, router, link))?;
            if local.address(family).is_auto() {
                *local.address_mut(family) = AddressSpec::Literal(low);
            }
            if remote.address(family).is_auto() {
                *remote.address_mut(family) = AddressSpec::Literal(high);
            }
        }

        *router_link_mut(doc, router, link)? = local;
        *router_link_mut(doc, peer, &mirror)? = remote;
        Ok(())
    }

    fn resolve_switch<B: Backend + ?Sized>(
        &mut self,
        doc: &mut TopologyDocument,
        switch: &str,
        attached: &mut HashSet<(String, String)>,
        binder: &mut BackendBinder<'_, B>,
    ) -> Result<(), TopologyError> {
        let links: Vec<(String, LinkSpec)> = match doc.switches.get(switch) {
            Some(spec) => spec.links.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => return Ok(()),
        };

        for (link, record) in links {
            let target = match &record.dst_node {
                Some(node) => node.clone(),
                None => {
                    LinkKey::parse(&link)
                        .ok_or_else(|| TopologyError::MalformedLinkKey {
                            owner: switch.to_string(),
                            link: link.clone(),
                        })?
                        .peer
                }
            };

            if doc.is_switch(&target) {
                warn!("Switch {}: link '{}' connects to switch {}, skipping", switch, link, target);
                continue;
            }
            if !doc.routers.contains_key(&target) {
                return Err(TopologyError::UndeclaredEndpoint {
                    owner: switch.to_string(),
                    link,
                    endpoint: target,
                });
            }
            if !attached.insert((target.clone(), switch.to_string())) {
                return Err(TopologyError::DuplicateSwitchAttachment {
                    router: target,
                    switch: switch.to_string(),
                });
            }

            let (router_if, switch_if) = self.namer.switch_interface_names(&target, switch)?;

            let mut clone = record;
            clone.dst_node = None;
            clone.interface = Some(router_if.clone());
            clone.peer_interface = Some(switch_if.clone());
            if let Ok(existing) = router_link(doc, &target, switch) {
                for family in AddressFamily::ALL {
                    if existing.address(family).literal().is_some() {
                        *clone.address_mut(family) = existing.address(family).clone();
                    }
                }
                for (k, v) in &existing.extra {
                    clone.extra.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }

            if let Some(switch_link) = doc
                .switches
                .get_mut(switch)
                .and_then(|spec| spec.links.get_mut(&link))
            {
                switch_link.interface = Some(switch_if.clone());
                switch_link.peer_interface = Some(router_if.clone());
            }

            binder.add_link(switch, &target, &switch_if, &router_if)?;

            for family in AddressFamily::ALL {
                if clone.address(family).is_auto() {
                    let addr = self
                        .allocator
                        .allocate_switch_address(family)
                        .map_err(|e| TopologyError::from_alloc(e, &target, switch))?;
                    *clone.address_mut(family) = AddressSpec::Literal(addr);
                }
            }

            debug!("{}: attached to switch {} as {}", target, switch, router_if);
            if let Some(spec) = doc.routers.get_mut(&target) {
                spec.links.insert(switch.to_string(), clone);
            }
        }

        Ok(())
    }
}

fn router_link<'d>(doc: &'d TopologyDocument, router: &str, link: &str) -> Result<&'d LinkSpec, TopologyError> {
    doc.routers
        .get(router)
        .and_then(|spec| spec.links.get(link))
        .ok_or_else(|| TopologyError::UndeclaredEndpoint {
            owner: router.to_string(),
            link: link.to_string(),
            endpoint: router.to_string(),
        })
}

fn router_link_mut<'d>(
    doc: &'d mut TopologyDocument,
    router: &str,
    link: &str,
) -> Result<&'d mut LinkSpec, TopologyError> {
    doc.routers
        .get_mut(router)
        .and_then(|spec| spec.links.get_mut(link))
        .ok_or_else(|| TopologyError::UndeclaredEndpoint {
            owner: router.to_string(),
            link: link.to_string(),
            endpoint: router.to_string(),
        })
}

/// Resolve `doc` against `backend` with a fresh resolver
pub fn resolve_topology<B: Backend + ?Sized>(
    mut doc: TopologyDocument,
    backend: &mut B,
) -> Result<ResolvedTopology, TopologyError> {
    let mut resolver = TopologyResolver::new(&doc)?;
    let mut binder = BackendBinder::new(backend);
    resolver.resolve(&mut doc, &mut binder)?;

    info!(
        "Resolved topology: {} routers, {} switches, {} links",
        doc.routers.len(),
        doc.switches.len(),
        binder.links_bound()
    );
    Ok(ResolvedTopology(doc))
}
