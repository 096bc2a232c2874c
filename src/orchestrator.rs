//! Build orchestrator.
//!
//! This module coordinates a full build: resolution of the document against
//! a backend, validation of the result, the configuration pipeline, kernel
//! interface addressing, and the artifacts written to the output directory.

use crate::backend::{Backend, RecordingBackend};
use crate::config::TopologyDocument;
use crate::config_loader::write_topology;
use crate::pipeline::{apply_linux_interfaces, linux_interface_commands, ConfigPipeline, RouterConfigs};
use crate::topology::{resolve_topology, ResolvedTopology};
use crate::utils::validation::{interfaces_by_router, validate_resolved_topology};
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// What a build does after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Stop after resolution and backend binding
    pub topology_only: bool,
    /// Configure link addresses on the Linux interfaces
    pub linux_config: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            topology_only: false,
            linux_config: true,
        }
    }
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub topology: ResolvedTopology,
    /// `None` in topology-only mode
    pub configs: Option<RouterConfigs>,
    /// Interface commands per router (empty when disabled)
    pub linux_commands: BTreeMap<String, Vec<String>>,
}

/// Summary written next to the build artifacts
#[derive(Debug, Clone, Serialize)]
pub struct BuildManifest {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub routers: usize,
    pub switches: usize,
    pub links: usize,
    pub interfaces: usize,
    pub configured_routers: usize,
    pub topology_only: bool,
}

/// Resolve `doc` against `backend` and configure the result
pub fn build_topology<B: Backend + ?Sized>(
    doc: TopologyDocument,
    backend: &mut B,
    pipeline: &ConfigPipeline,
    options: &BuildOptions,
) -> Result<BuildOutcome> {
    // Resolve names and addresses, binding nodes and links
    let topology = resolve_topology(doc, backend).wrap_err("Failed to resolve topology")?;

    // Check the resolved document before building anything from it
    validate_resolved_topology(&topology).map_err(|e| eyre!("Resolved topology is inconsistent: {}", e))?;

    if options.topology_only {
        info!("Topology-only mode: skipping router configuration");
        return Ok(BuildOutcome {
            topology,
            configs: None,
            linux_commands: BTreeMap::new(),
        });
    }

    // Build and load router configuration
    let configs = pipeline
        .run(&topology, backend)
        .wrap_err("Failed to configure topology")?;

    // Configure interface addresses in the kernel
    let linux_commands = if options.linux_config {
        apply_linux_interfaces(&topology, backend).wrap_err("Failed to configure Linux interfaces")?;
        linux_interface_commands(&topology)
    } else {
        BTreeMap::new()
    };

    Ok(BuildOutcome {
        topology,
        configs: Some(configs),
        linux_commands,
    })
}

/// Write the build artifacts into `output_dir`.
///
/// - `topology.json`: the resolved document
/// - `<router>/frr.conf`: rendered router configuration
/// - `<router>/interfaces.sh`: interface address commands
/// - `backend_plan.json`: the recorded backend calls
/// - `build_manifest.json`: summary of the build
pub fn write_artifacts(
    output_dir: &Path,
    outcome: &BuildOutcome,
    backend: &RecordingBackend,
    source: Option<&Path>,
) -> Result<BuildManifest> {
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", output_dir.display()))?;

    write_topology(&output_dir.join("topology.json"), outcome.topology.document())?;

    let mut configured_routers = 0;
    if let Some(configs) = &outcome.configs {
        for (router, config) in configs.iter() {
            let router_dir = output_dir.join(router);
            std::fs::create_dir_all(&router_dir)?;
            std::fs::write(router_dir.join("frr.conf"), config.render(router))
                .wrap_err_with(|| format!("Failed to write configuration of {}", router))?;
            configured_routers += 1;
        }
    }

    for (router, commands) in &outcome.linux_commands {
        if commands.is_empty() {
            continue;
        }
        let router_dir = output_dir.join(router);
        std::fs::create_dir_all(&router_dir)?;

        let mut script = String::from("#!/bin/sh\nset -e\n");
        for command in commands {
            script.push_str(command);
            script.push('\n');
        }
        std::fs::write(router_dir.join("interfaces.sh"), script)
            .wrap_err_with(|| format!("Failed to write interface script of {}", router))?;
    }

    let plan_json = serde_json::to_string_pretty(backend.ops())?;
    std::fs::write(output_dir.join("backend_plan.json"), plan_json)?;

    let topology = outcome.topology.document();
    let manifest = BuildManifest {
        generated_at: Utc::now(),
        source: source.map(|path| path.display().to_string()),
        routers: topology.routers.len(),
        switches: topology.switches.len(),
        links: backend.link_count(),
        interfaces: interfaces_by_router(topology).values().map(Vec::len).sum(),
        configured_routers,
        topology_only: outcome.configs.is_none(),
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(output_dir.join("build_manifest.json"), manifest_json)?;

    info!("Wrote build artifacts to {:?}", output_dir);
    Ok(manifest)
}
