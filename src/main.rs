use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use topojson::backend::RecordingBackend;
use topojson::config_loader;
use topojson::orchestrator::{build_topology, write_artifacts, BuildOptions};
use topojson::pipeline::ConfigPipeline;

/// Materialize a router network from a JSON or YAML topology
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the topology document (JSON, or YAML by extension)
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the resolved topology and router configuration
    #[arg(short, long, default_value = "topology_output")]
    output: PathBuf,

    /// Resolve and bind the topology only, skip router configuration
    #[arg(long)]
    topology_only: bool,

    /// Do not configure link addresses on the Linux interfaces
    #[arg(long)]
    no_linux_config: bool,
}

impl Args {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            topology_only: self.topology_only,
            linux_config: !self.no_linux_config,
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting topojson");
    info!("Topology file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    // Load the topology document
    let doc = config_loader::load_topology(&args.config)?;

    // Clean up previous output
    if args.output.exists() && args.output != Path::new(".") {
        info!("Removing previous output in {:?}", args.output);
        fs::remove_dir_all(&args.output)
            .wrap_err_with(|| format!("Failed to remove output directory '{}'", args.output.display()))?;
    }

    // Resolve and configure against the recording backend
    let mut backend = RecordingBackend::new();
    let pipeline = ConfigPipeline::default();
    let outcome = build_topology(doc, &mut backend, &pipeline, &args.build_options())?;

    let manifest = write_artifacts(&args.output, &outcome, &backend, Some(args.config.as_path()))?;

    info!(
        "Materialized {} routers, {} switches and {} links",
        manifest.routers, manifest.switches, manifest.links
    );
    info!("Build completed successfully");
    Ok(())
}
