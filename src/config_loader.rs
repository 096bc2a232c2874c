use crate::config::TopologyDocument;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Whether `path` names a YAML file
fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Load and parse a topology document.
///
/// `.yaml` / `.yml` files are read as YAML, everything else as JSON.
pub fn load_topology(path: &Path) -> Result<TopologyDocument> {
    info!("Loading topology from: {:?}", path);

    // Open the topology file
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open topology file '{}'", path.display()))?;

    // Parse the document
    let doc: TopologyDocument = if is_yaml(path) {
        serde_yaml::from_reader(file)
            .wrap_err_with(|| format!("Failed to parse YAML topology '{}'", path.display()))?
    } else {
        serde_json::from_reader(file)
            .wrap_err_with(|| format!("Failed to parse JSON topology '{}'", path.display()))?
    };

    // Validate the document
    doc.validate()
        .wrap_err_with(|| format!("Invalid topology '{}'", path.display()))?;

    info!(
        "Loaded topology with {} routers and {} switches",
        doc.routers.len(),
        doc.switches.len()
    );
    Ok(doc)
}

/// Write a topology document as pretty-printed JSON
pub fn write_topology(path: &Path, doc: &TopologyDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).wrap_err("Failed to serialize topology")?;
    std::fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write topology to '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_load_json_topology() {
        let json = r#"{
            "ipv4base": "10.0.0.0",
            "link_ip_start": {"ipv4": "10.0.0.0", "v4mask": 24},
            "routers": {
                "r1": {"links": {"r2": {"ipv4": "auto"}}},
                "r2": {"links": {"r1": {"ipv4": "auto"}}}
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", json).unwrap();

        let doc = load_topology(temp_file.path()).unwrap();
        assert_eq!(doc.routers.len(), 2);
        assert!(doc.routers["r1"].links["r2"].ipv4.is_auto());
    }

    #[test]
    fn test_load_yaml_topology() {
        let yaml = r#"
routers:
  r1:
    links:
      r2: {ipv4: 192.168.0.1/30}
  r2:
    links:
      r1: {ipv4: 192.168.0.2/30}
"#;

        let mut temp_file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let doc = load_topology(temp_file.path()).unwrap();
        assert_eq!(
            doc.routers["r2"].links["r1"].ipv4.literal().unwrap().to_string(),
            "192.168.0.2/30"
        );
    }

    #[test]
    fn test_load_invalid_topology() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, r#"{{"routers": {{}}}}"#).unwrap();

        let err = load_topology(temp_file.path()).unwrap_err();
        assert!(format!("{:?}", err).contains("at least one router"));

        assert!(load_topology(Path::new("/nonexistent/topology.json")).is_err());
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");

        let doc: TopologyDocument =
            serde_json::from_str(r#"{"routers": {"r1": {"bgp": {"local_as": 100}}}}"#).unwrap();
        write_topology(&path, &doc).unwrap();

        let reloaded = load_topology(&path).unwrap();
        assert_eq!(reloaded, doc);
    }
}
