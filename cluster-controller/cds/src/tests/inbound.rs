use super::*;
use crate::inbound::build_inbound_clusters;
use mesh_cluster_controller_core::{
    cluster::{Address, DiscoveryType, LbPolicy},
    MeshConfig,
};

#[test]
fn loopback_clusters_for_instances_and_management_ports() {
    let svc = mk_service(
        "reviews.default.svc",
        Resolution::ClientSideLb,
        vec![
            port("http", 80, Protocol::Http),
            port("grpc", 90, Protocol::Grpc),
        ],
    );
    let instances = vec![
        mk_instance(&svc, "http", "10.1.1.1", 8080),
        mk_instance(&svc, "grpc", "10.1.1.1", 9090),
    ];
    let management_ports = vec![port("health", 15020, Protocol::Http)];

    let clusters = build_inbound_clusters(&MeshConfig::default(), &instances, &management_ports);
    assert_eq!(clusters.len(), 3);

    for (name, port, http2) in [
        ("inbound|80||reviews.default.svc", 8080, false),
        ("inbound|90||reviews.default.svc", 9090, true),
        ("inbound|15020||mgmtCluster", 15020, false),
    ] {
        let cluster = find(&clusters, name);
        assert_eq!(cluster.discovery_type(), DiscoveryType::Static, "{name}");
        assert_eq!(
            cluster.hosts,
            vec![Address::new("127.0.0.1", NonZeroU16::new(port).unwrap())],
            "{name}"
        );
        assert_eq!(cluster.lb_policy, LbPolicy::RoundRobin, "{name}");
        assert_eq!(cluster.eds_cluster_config(), None, "{name}");
        assert_eq!(cluster.http2_protocol_options.is_some(), http2, "{name}");
    }
}

#[test]
fn no_instances_no_clusters() {
    let clusters = build_inbound_clusters(&MeshConfig::default(), &[], &[]);
    assert!(clusters.is_empty());
}
