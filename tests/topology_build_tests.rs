#[cfg(test)]
mod topology_build_tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::Builder;

    use topojson::backend::{BackendOp, RecordingBackend};
    use topojson::config::{AddressSpec, TopologyDocument};
    use topojson::config_loader::load_topology;
    use topojson::orchestrator::{build_topology, write_artifacts, BuildOptions};
    use topojson::pipeline::{ConfigPipeline, RouterConfigs, StageError, StageKind};
    use topojson::topology::{resolve_topology, ResolvedTopology};
    use topojson::utils::validation::validate_resolved_topology;
    use topojson::TopologyError;

    fn sample_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("topologies/ibgp_ecmp_topo.json")
    }

    fn sample() -> TopologyDocument {
        load_topology(&sample_path()).unwrap()
    }

    fn resolve(doc: TopologyDocument) -> (ResolvedTopology, RecordingBackend) {
        let mut backend = RecordingBackend::new();
        let topo = resolve_topology(doc, &mut backend).unwrap();
        (topo, backend)
    }

    fn field<'a>(topo: &'a ResolvedTopology, router: &str, link: &str) -> (&'a str, String, String) {
        let spec = &topo.routers[router].links[link];
        (
            spec.interface.as_deref().unwrap_or("-"),
            spec.ipv4.to_string(),
            spec.ipv6.to_string(),
        )
    }

    /// Point-to-point, parallel and switch links of the sample topology
    #[test]
    fn test_sample_topology_resolution() {
        let (topo, backend) = resolve(sample());

        assert_eq!(
            field(&topo, "r1", "r2"),
            ("r1-r2-eth0", "10.0.0.1/30".to_string(), "fd00::1/64".to_string())
        );
        assert_eq!(
            field(&topo, "r2", "r1"),
            ("r2-r1-eth0", "10.0.0.2/30".to_string(), "fd00::2/64".to_string())
        );

        // parallel links get separate subnets
        assert_eq!(
            field(&topo, "r2", "r3-link1"),
            ("r2-r3-eth1", "10.0.0.5/30".to_string(), "fd00:0:0:1::1/64".to_string())
        );
        assert_eq!(
            field(&topo, "r3", "r2-link1"),
            ("r3-r2-eth0", "10.0.0.6/30".to_string(), "fd00:0:0:1::2/64".to_string())
        );
        assert_eq!(
            field(&topo, "r2", "r3-link2"),
            ("r2-r3-eth2", "10.0.0.9/30".to_string(), "fd00:0:0:2::1/64".to_string())
        );
        assert_eq!(
            field(&topo, "r3", "r2-link2"),
            ("r3-r2-eth1", "10.0.0.10/30".to_string(), "fd00:0:0:2::2/64".to_string())
        );

        // switch attachments: IPv4 moves by one address, IPv6 by a whole subnet
        assert_eq!(
            field(&topo, "r1", "s1"),
            ("r1-s1-eth1", "10.0.0.13/30".to_string(), "fd00:0:0:3::1/64".to_string())
        );
        assert_eq!(
            field(&topo, "r2", "s1"),
            ("r2-s1-eth3", "10.0.0.14/30".to_string(), "fd00:0:0:4::1/64".to_string())
        );
        assert_eq!(
            field(&topo, "r3", "s1"),
            ("r3-s1-eth2", "10.0.0.15/30".to_string(), "fd00:0:0:5::1/64".to_string())
        );
        assert_eq!(
            topo.switches["s1"].links["r2"].peer_interface.as_deref(),
            Some("r2-s1-eth3")
        );

        // loopback ordinals follow the processing order
        assert_eq!(topo.routers["r1"].links["lo"].ipv4.to_string(), "1.0.1.17/32");
        assert_eq!(topo.routers["r2"].links["lo"].ipv4.to_string(), "1.0.2.17/32");
        assert_eq!(topo.routers["r3"].links["lo"].ipv6.to_string(), "2001:db8:f::3:17/128");

        assert_eq!(backend.link_count(), 6);
        assert!(validate_resolved_topology(&topo).is_ok());
    }

    /// Mirrored records carry swapped interface names
    #[test]
    fn test_mirrored_records() {
        let (topo, _) = resolve(sample());

        for (name, router) in &topo.routers {
            for (key, link) in &router.links {
                let (peer, discriminator) = key.split_once('-').unwrap_or((key.as_str(), ""));
                let Some(peer_router) = topo.routers.get(peer) else {
                    continue;
                };
                let mirror_key = if discriminator.is_empty() {
                    name.clone()
                } else {
                    format!("{}-{}", name, discriminator)
                };
                let mirror = &peer_router.links[&mirror_key];
                assert_eq!(link.interface, mirror.peer_interface, "{} {}", name, key);
                assert_eq!(link.peer_interface, mirror.interface, "{} {}", name, key);
            }
        }
    }

    /// Resolving a resolved document changes nothing
    #[test]
    fn test_re_resolution_is_stable() {
        let (first, _) = resolve(sample());
        let (second, _) = resolve(first.clone().into_document());
        assert_eq!(first, second);
    }

    /// Literal addresses are never rewritten
    #[test]
    fn test_literal_addresses_untouched() {
        let mut doc = sample();
        doc.routers.get_mut("r3").unwrap().links.get_mut("r2-link1").unwrap().ipv4 =
            AddressSpec::Literal("172.16.0.2/30".parse().unwrap());

        let (topo, _) = resolve(doc);
        assert_eq!(topo.routers["r3"].links["r2-link1"].ipv4.to_string(), "172.16.0.2/30");
        // the other side still gets the lower address of the pair
        assert_eq!(topo.routers["r2"].links["r3-link1"].ipv4.to_string(), "10.0.0.5/30");
    }

    /// Routers are ordered numerically, not lexically
    #[test]
    fn test_numeric_router_order() {
        let doc: TopologyDocument = serde_json::from_str(
            r#"{
            "ipv4base": "10.0.0.0",
            "link_ip_start": {"ipv4": "10.0.0.0", "v4mask": 24},
            "routers": {
                "r10": {"links": {"r2": {"ipv4": "auto"}}},
                "r2": {"links": {"r10": {"ipv4": "auto"}}}
            }
        }"#,
        )
        .unwrap();
        let (topo, backend) = resolve(doc);

        assert_eq!(topo.routers["r2"].links["r10"].ipv4.to_string(), "10.0.0.1/24");
        assert_eq!(topo.routers["r10"].links["r2"].interface.as_deref(), Some("r10-r2-eth0"));
        assert_eq!(backend.ops()[0], BackendOp::AddRouter { name: "r2".to_string() });
    }

    /// A link declared by a router processed later, with no counterpart
    #[test]
    fn test_missing_counterpart_on_processed_router() {
        let doc: TopologyDocument = serde_json::from_str(
            r#"{"routers": {"r1": {"links": {"r2": {}}}, "r2": {"links": {"r1": {}, "r1-b": {}}}}}"#,
        )
        .unwrap();
        let err = resolve_topology(doc, &mut RecordingBackend::new()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::MissingMirrorLink { router, link, .. } if router == "r2" && link == "r1-b"
        ));
    }

    /// Full build with a protocol stage plugged in
    #[test]
    fn test_full_build_with_bgp_stage() {
        let pipeline = ConfigPipeline::default().with_stage(
            StageKind::Bgp,
            |topo: &ResolvedTopology, configs: &mut RouterConfigs| -> Result<(), StageError> {
                for (name, router) in &topo.routers {
                    let Some(asn) = router.extra.get("bgp").and_then(|bgp| bgp["local_as"].as_str()) else {
                        continue;
                    };
                    let config = configs.router_mut(name);
                    config.push(StageKind::Bgp, format!("router bgp {}", asn));
                    config.push(StageKind::Bgp, "!");
                }
                Ok(())
            },
        );

        let mut backend = RecordingBackend::new();
        let outcome = build_topology(sample(), &mut backend, &pipeline, &BuildOptions::default()).unwrap();
        assert_eq!(outcome.configs.as_ref().unwrap().len(), 3);

        let r3 = &backend.configs()["r3"];
        let vrf = r3.find("vrf RED").unwrap();
        let interface = r3.find("interface r3-r2-eth0").unwrap();
        let bgp = r3.find("router bgp 200").unwrap();
        assert!(vrf < interface && interface < bgp);

        let r2 = &backend.configs()["r2"];
        assert!(r2.contains("ip route 192.0.2.0/24 blackhole"));
        assert!(r2.contains("ipv6 route 2001:db8:100::/48 blackhole 200"));
        assert!(r2.contains("interface lo\n ip address 1.0.2.17/32\n ipv6 address 2001:db8:f::2:17/128\n!"));

        assert!(backend.commands()["r1"].contains(&"ip -6 addr add fd00:0:0:3::1/64 dev r1-s1-eth1".to_string()));
    }

    /// YAML input through the loader, artifacts through the orchestrator
    #[test]
    fn test_yaml_topology_to_artifacts() {
        let yaml = r#"
ipv4base: 10.0.0.0
link_ip_start: {ipv4: 10.0.0.0, v4mask: 24}
routers:
  r1:
    links:
      r2: {ipv4: auto}
  r2:
    links:
      r1: {ipv4: auto}
"#;
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "{}", yaml).unwrap();

        let doc = load_topology(file.path()).unwrap();
        let mut backend = RecordingBackend::new();
        let outcome = build_topology(doc, &mut backend, &ConfigPipeline::default(), &BuildOptions::default()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let manifest = write_artifacts(out.path(), &outcome, &backend, Some(file.path())).unwrap();
        assert_eq!(manifest.links, 1);
        assert!(!manifest.topology_only);

        let resolved = load_topology(&out.path().join("topology.json")).unwrap();
        assert_eq!(resolved.routers["r1"].links["r2"].ipv4.to_string(), "10.0.0.1/24");
        assert!(out.path().join("r2").join("frr.conf").exists());
        assert!(out.path().join("r2").join("interfaces.sh").exists());
    }
}
