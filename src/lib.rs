//! # topojson - Topology materialization for emulated router networks
//!
//! This library turns a declarative description of a router network into a
//! running emulated one: it names every interface, allocates link and
//! loopback addresses, registers nodes and links with an emulation backend,
//! and builds and loads each router's configuration.
//!
//! ## Overview
//!
//! A topology document lists routers, optional switches, and the links
//! between them. Addresses may be given literally or as `"auto"`, in which
//! case they are drawn from the document's address pools. Resolution fills in
//! the missing names and addresses in place; the resolved document is then
//! fed to an ordered configuration pipeline.
//!
//! ## Key Features
//!
//! - **Deterministic addressing**: IPv4 and IPv6 link pools walked in router
//!   order, loopbacks derived from a prefix, an ordinal and the router name
//! - **Interface naming**: `<local>-<remote>-eth<seq>` with per-router
//!   sequence numbers
//! - **Parallel links**: `r2-link1` / `r2-link2` style keys
//! - **Switches**: shared segments with one address per attached router
//! - **Pluggable configuration stages**: VRFs, interfaces and static routes
//!   built in, protocol stages registered by the caller
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Topology document model and validation
//! - `config_loader`: Loading and writing JSON / YAML documents
//! - `ip`: Link and loopback address allocation
//! - `topology`: Link keys, interface naming and the resolution pass
//! - `backend`: Emulation backend interface and an in-memory recorder
//! - `pipeline`: Ordered configuration stages and kernel addressing
//! - `utils`: IP helpers and resolved topology validation
//! - `orchestrator`: High-level build and artifact output
//! - `error`: Error types of the engine
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use topojson::backend::RecordingBackend;
//! use topojson::orchestrator::{build_topology, write_artifacts, BuildOptions};
//! use topojson::pipeline::ConfigPipeline;
//! use topojson::config_loader;
//!
//! // Load the topology document
//! let doc = config_loader::load_topology(Path::new("topology.json"))?;
//!
//! // Resolve, configure and record every backend call
//! let mut backend = RecordingBackend::new();
//! let outcome = build_topology(doc, &mut backend, &ConfigPipeline::default(), &BuildOptions::default())?;
//!
//! // The output directory now contains:
//! // - topology.json: the resolved document
//! // - <router>/frr.conf: router configuration
//! // - backend_plan.json: the recorded backend calls
//! write_artifacts(Path::new("topology_output"), &outcome, &backend, None)?;
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Topology Format
//!
//! ```json
//! {
//!   "ipv4base": "10.0.0.0",
//!   "link_ip_start": {"ipv4": "10.0.0.0", "v4mask": 24},
//!   "lo_prefix": {"ipv4": "1.0.", "v4mask": 32},
//!   "routers": {
//!     "r1": {"links": {"lo": {"ipv4": "auto", "type": "loopback"},
//!                      "r2": {"ipv4": "auto"}}},
//!     "r2": {"links": {"r1": {"ipv4": "auto"}}}
//!   }
//! }
//! ```
//!
//! ## Error Handling
//!
//! The engine reports failures through `thiserror` enums
//! ([`error::TopologyError`] and the errors it wraps). The loader, the
//! orchestrator and the binary use `color_eyre` for error reporting with
//! context.

pub mod backend;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod ip;
pub mod orchestrator;
pub mod pipeline;
pub mod topology;
pub mod utils;

pub use error::TopologyError;
