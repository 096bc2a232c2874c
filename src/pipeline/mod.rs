//! # Configuration pipeline
//!
//! Router configuration is built by a fixed sequence of stages over the
//! resolved topology. Each stage appends lines to a shared per-router
//! accumulator ([`RouterConfigs`]); once all stages ran, every router's
//! rendered configuration is loaded through the backend.
//!
//! Stage order is fixed by [`StageKind::ORDER`]:
//!
//! | Stage | Built in |
//! |-------|----------|
//! | `vrfs` | yes |
//! | `links` | yes |
//! | `static_routes` | yes |
//! | `prefix_lists`, `bgp_community_list`, `route_maps` | no |
//! | `pim`, `igmp`, `bgp`, `ospf`, `ospf6` | no |
//!
//! Stages without a registered builder are skipped. Protocol builders are
//! plugged in with [`ConfigPipeline::register`], either as closures or as
//! [`ConfigBuilder`] implementations.

pub mod builders;
pub mod linux;

use crate::backend::Backend;
use crate::error::TopologyError;
use crate::topology::ResolvedTopology;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;

pub use linux::{apply_linux_interfaces, linux_interface_commands};

/// Configuration stages, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vrfs,
    Links,
    StaticRoutes,
    PrefixLists,
    BgpCommunityList,
    RouteMaps,
    Pim,
    Igmp,
    Bgp,
    Ospf,
    Ospf6,
}

impl StageKind {
    pub const ORDER: [StageKind; 11] = [
        StageKind::Vrfs,
        StageKind::Links,
        StageKind::StaticRoutes,
        StageKind::PrefixLists,
        StageKind::BgpCommunityList,
        StageKind::RouteMaps,
        StageKind::Pim,
        StageKind::Igmp,
        StageKind::Bgp,
        StageKind::Ospf,
        StageKind::Ospf6,
    ];

    /// Key of the router section this stage reads
    pub fn key(self) -> &'static str {
        match self {
            StageKind::Vrfs => "vrfs",
            StageKind::Links => "links",
            StageKind::StaticRoutes => "static_routes",
            StageKind::PrefixLists => "prefix_lists",
            StageKind::BgpCommunityList => "bgp_community_list",
            StageKind::RouteMaps => "route_maps",
            StageKind::Pim => "pim",
            StageKind::Igmp => "igmp",
            StageKind::Bgp => "bgp",
            StageKind::Ospf => "ospf",
            StageKind::Ospf6 => "ospf6",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|stage| stage.key() == key)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Errors raised by configuration builders
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("{router}: invalid '{section}' section: {reason}")]
    InvalidSection {
        router: String,
        section: String,
        reason: String,
    },
    #[error("{router}: link '{link}' has no interface name")]
    UnresolvedLink { router: String, link: String },
    #[error("{0}")]
    Builder(String),
}

/// A configuration stage
pub trait ConfigBuilder {
    fn build(&self, topo: &ResolvedTopology, configs: &mut RouterConfigs) -> Result<(), StageError>;
}

impl<F> ConfigBuilder for F
where
    F: Fn(&ResolvedTopology, &mut RouterConfigs) -> Result<(), StageError>,
{
    fn build(&self, topo: &ResolvedTopology, configs: &mut RouterConfigs) -> Result<(), StageError> {
        self(topo, configs)
    }
}

/// Configuration lines of one router, grouped by stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterConfig {
    sections: BTreeMap<StageKind, Vec<String>>,
}

impl RouterConfig {
    pub fn push(&mut self, stage: StageKind, line: impl Into<String>) {
        self.sections.entry(stage).or_default().push(line.into());
    }

    /// Lines added by `stage`
    pub fn lines(&self, stage: StageKind) -> &[String] {
        self.sections.get(&stage).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    /// Render the full configuration in stage order
    pub fn render(&self, hostname: &str) -> String {
        let mut text = format!("hostname {}\n!\n", hostname);
        for lines in self.sections.values() {
            for line in lines {
                text.push_str(line);
                text.push('\n');
            }
        }
        text
    }
}

/// Per-router configuration accumulator shared by all stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterConfigs {
    routers: BTreeMap<String, RouterConfig>,
}

impl RouterConfigs {
    /// One empty configuration per router of `topo`
    pub fn for_topology(topo: &ResolvedTopology) -> Self {
        Self {
            routers: topo
                .routers
                .keys()
                .map(|name| (name.clone(), RouterConfig::default()))
                .collect(),
        }
    }

    pub fn router_mut(&mut self, router: &str) -> &mut RouterConfig {
        self.routers.entry(router.to_string()).or_default()
    }

    pub fn get(&self, router: &str) -> Option<&RouterConfig> {
        self.routers.get(router)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RouterConfig)> {
        self.routers.iter()
    }

    pub fn len(&self) -> usize {
        self.routers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    /// Rendered configuration of `router`
    pub fn render(&self, router: &str) -> Option<String> {
        self.get(router).map(|config| config.render(router))
    }
}

/// Ordered set of configuration stages
pub struct ConfigPipeline {
    stages: BTreeMap<StageKind, Box<dyn ConfigBuilder>>,
}

impl ConfigPipeline {
    /// A pipeline without any builder
    pub fn empty() -> Self {
        Self {
            stages: BTreeMap::new(),
        }
    }

    /// Set the builder of `stage`, replacing any previous one
    pub fn register<C>(&mut self, stage: StageKind, builder: C)
    where
        C: ConfigBuilder + 'static,
    {
        self.stages.insert(stage, Box::new(builder));
    }

    pub fn with_stage<C>(mut self, stage: StageKind, builder: C) -> Self
    where
        C: ConfigBuilder + 'static,
    {
        self.register(stage, builder);
        self
    }

    pub fn has_stage(&self, stage: StageKind) -> bool {
        self.stages.contains_key(&stage)
    }

    /// Run every registered stage in order
    pub fn build(&self, topo: &ResolvedTopology) -> Result<RouterConfigs, TopologyError> {
        let mut configs = RouterConfigs::for_topology(topo);

        for stage in StageKind::ORDER {
            info!("Checking for {} configuration in input data", stage);
            match self.stages.get(&stage) {
                Some(builder) => builder
                    .build(topo, &mut configs)
                    .map_err(|source| TopologyError::Stage { stage, source })?,
                None => debug!("No builder registered for the {} stage", stage),
            }
        }

        Ok(configs)
    }

    /// Load every router's configuration through the backend
    pub fn load_configs<B: Backend + ?Sized>(
        configs: &RouterConfigs,
        backend: &mut B,
    ) -> Result<usize, TopologyError> {
        let mut loaded = 0;
        for (router, config) in configs.iter() {
            backend
                .load_config(router, &config.render(router))
                .map_err(|source| TopologyError::ConfigLoad {
                    router: router.clone(),
                    source,
                })?;
            loaded += 1;
        }

        info!("Loaded configuration into {} routers", loaded);
        Ok(loaded)
    }

    /// Build all configurations and load them
    pub fn run<B: Backend + ?Sized>(
        &self,
        topo: &ResolvedTopology,
        backend: &mut B,
    ) -> Result<RouterConfigs, TopologyError> {
        let configs = self.build(topo)?;
        Self::load_configs(&configs, backend)?;
        Ok(configs)
    }
}

impl Default for ConfigPipeline {
    /// Pipeline with the built-in `vrfs`, `links` and `static_routes` stages
    fn default() -> Self {
        Self::empty()
            .with_stage(StageKind::Vrfs, builders::build_vrfs)
            .with_stage(StageKind::Links, builders::build_interfaces)
            .with_stage(StageKind::StaticRoutes, builders::build_static_routes)
    }
}

impl fmt::Debug for ConfigPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPipeline")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RecordingBackend};
    use crate::topology::resolve_topology;
    use std::cell::RefCell;
    use std::rc::Rc;

    const TOPO: &str = r#"{
        "ipv4base": "10.0.0.0",
        "link_ip_start": {"ipv4": "10.0.0.0", "v4mask": 24},
        "routers": {
            "r1": {"links": {"r2": {"ipv4": "auto"}}, "bgp": {"local_as": 100}},
            "r2": {"links": {"r1": {"ipv4": "auto"}}}
        }
    }"#;

    fn resolved() -> (ResolvedTopology, RecordingBackend) {
        let mut backend = RecordingBackend::new();
        let topo = resolve_topology(serde_json::from_str(TOPO).unwrap(), &mut backend).unwrap();
        (topo, backend)
    }

    #[test]
    fn test_stage_order_and_keys() {
        assert_eq!(StageKind::ORDER[0], StageKind::Vrfs);
        assert_eq!(StageKind::ORDER[10], StageKind::Ospf6);
        assert_eq!(StageKind::from_key("bgp_community_list"), Some(StageKind::BgpCommunityList));
        assert_eq!(StageKind::StaticRoutes.to_string(), "static_routes");
        assert_eq!(StageKind::from_key("isis"), None);
    }

    #[test]
    fn test_stages_run_in_order() {
        let (topo, _) = resolved();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut pipeline = ConfigPipeline::empty();
        for stage in [StageKind::Ospf, StageKind::Bgp, StageKind::Vrfs] {
            let seen = Rc::clone(&seen);
            pipeline.register(stage, move |_: &ResolvedTopology, _: &mut RouterConfigs| -> Result<(), StageError> {
                seen.borrow_mut().push(stage);
                Ok(())
            });
        }

        pipeline.build(&topo).unwrap();
        assert_eq!(*seen.borrow(), vec![StageKind::Vrfs, StageKind::Bgp, StageKind::Ospf]);
    }

    #[test]
    fn test_custom_bgp_stage() {
        let (topo, mut backend) = resolved();
        let pipeline = ConfigPipeline::default().with_stage(
            StageKind::Bgp,
            |topo: &ResolvedTopology, configs: &mut RouterConfigs| -> Result<(), StageError> {
                for (name, router) in &topo.routers {
                    if let Some(asn) = router.extra.get("bgp").and_then(|bgp| bgp.get("local_as")) {
                        configs.router_mut(name).push(StageKind::Bgp, format!("router bgp {}", asn));
                    }
                }
                Ok(())
            },
        );

        let configs = pipeline.run(&topo, &mut backend).unwrap();
        assert_eq!(configs.len(), 2);

        let r1 = &backend.configs()["r1"];
        assert!(r1.starts_with("hostname r1\n"));
        // interfaces come before bgp
        let interface = r1.find("interface r1-r2-eth0").unwrap();
        let bgp = r1.find("router bgp 100").unwrap();
        assert!(interface < bgp);
        assert!(!backend.configs()["r2"].contains("router bgp"));
    }

    #[test]
    fn test_stage_error_names_the_stage() {
        let (topo, _) = resolved();
        let pipeline = ConfigPipeline::empty().with_stage(
            StageKind::RouteMaps,
            |_: &ResolvedTopology, _: &mut RouterConfigs| -> Result<(), StageError> {
                Err(StageError::Builder("broken".to_string()))
            },
        );

        let err = pipeline.build(&topo).unwrap_err();
        assert!(matches!(err, TopologyError::Stage { stage: StageKind::RouteMaps, .. }));
        assert_eq!(err.to_string(), "The route_maps configuration stage failed");
    }

    #[test]
    fn test_load_failure() {
        let (topo, _) = resolved();
        let mut backend = RecordingBackend::new().with_failing_load("r2");
        for name in ["r1", "r2"] {
            backend.add_router(name).unwrap();
        }

        let err = ConfigPipeline::default().run(&topo, &mut backend).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::ConfigLoad { router, source: BackendError::Rejected(_) } if router == "r2"
        ));
    }

    #[test]
    fn test_render_groups_by_stage() {
        let mut config = RouterConfig::default();
        config.push(StageKind::StaticRoutes, "ip route 0.0.0.0/0 10.0.0.2");
        config.push(StageKind::Vrfs, "vrf RED");
        config.push(StageKind::Vrfs, " exit-vrf");

        assert_eq!(
            config.render("r1"),
            "hostname r1\n!\nvrf RED\n exit-vrf\nip route 0.0.0.0/0 10.0.0.2\n"
        );
        assert_eq!(config.lines(StageKind::Vrfs).len(), 2);
        assert!(config.lines(StageKind::Bgp).is_empty());
    }
}
