use crate::cluster::{build_default_cluster, set_upstream_protocol};
use mesh_cluster_controller_core::{
    cluster::{Address, Cluster, DiscoveryType},
    service::{Port, ServiceInstance},
    MeshConfig, SubsetKey, TrafficDirection, MANAGEMENT_CLUSTER_HOSTNAME,
};
use std::net::Ipv4Addr;

/// Builds a static cluster for each of the proxy's local service instances and
/// for each of its management ports. Each cluster targets the workload over the
/// loopback interface.
pub(crate) fn build_inbound_clusters(
    mesh: &MeshConfig,
    instances: &[ServiceInstance],
    management_ports: &[Port],
) -> Vec<Cluster> {
    let localhost = Ipv4Addr::LOCALHOST.to_string();
    let mut clusters = Vec::with_capacity(instances.len() + management_ports.len());

    for instance in instances {
        let service_port = &instance.endpoint.service_port;
        // Mostly used for stats.
        let key = SubsetKey::new(
            TrafficDirection::Inbound,
            "",
            &instance.service.hostname,
            service_port,
        );
        let address = Address::new(localhost.as_str(), instance.endpoint.port);
        let mut cluster =
            build_default_cluster(mesh, key.to_string(), DiscoveryType::Static, vec![address]);
        set_upstream_protocol(&mut cluster, service_port);
        clusters.push(cluster);
    }

    for port in management_ports {
        let key = SubsetKey::new(
            TrafficDirection::Inbound,
            "",
            MANAGEMENT_CLUSTER_HOSTNAME,
            port,
        );
        let address = Address::new(localhost.as_str(), port.port);
        let mut cluster =
            build_default_cluster(mesh, key.to_string(), DiscoveryType::Static, vec![address]);
        set_upstream_protocol(&mut cluster, port);
        clusters.push(cluster);
    }

    clusters
}
