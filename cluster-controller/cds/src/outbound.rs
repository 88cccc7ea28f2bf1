use crate::{
    cluster::{build_default_cluster, set_upstream_protocol, update_eds},
    hosts::cluster_hosts,
    policy::apply_traffic_policy,
    resolution::discovery_type,
};
use mesh_cluster_controller_core::{
    cluster::{Address, Cluster, DiscoveryType},
    service::{Port, Service},
    DestinationRules, MeshConfig, ServiceRegistry, SubsetKey, TrafficDirection,
};
use std::sync::Arc;

/// Builds a default cluster for each port of each service and, for services
/// with a destination rule, a cluster for each of the rule's subsets.
///
/// A subset's cluster applies the rule's top-level policy and then the
/// subset's own policy, so the subset wins in every category it configures.
pub(crate) fn build_outbound_clusters<R, C>(
    mesh: &MeshConfig,
    registry: &R,
    rules: &C,
    services: &[Arc<Service>],
) -> Vec<Cluster>
where
    R: ServiceRegistry + ?Sized,
    C: DestinationRules + ?Sized,
{
    let mut clusters = Vec::new();
    for service in services {
        let rule = rules.destination_rule(&service.hostname, None);
        let discovery_type = discovery_type(service.resolution);

        for port in &service.ports {
            let hosts = cluster_hosts(registry, service, port);

            let key = SubsetKey::new(TrafficDirection::Outbound, "", &service.hostname, port);
            let mut default_cluster =
                build_outbound_cluster(mesh, key, discovery_type, hosts.clone(), port);

            let Some(rule) = rule.as_deref() else {
                clusters.push(default_cluster);
                continue;
            };

            apply_traffic_policy(&mut default_cluster, rule.traffic_policy.as_ref());
            clusters.push(default_cluster);

            for subset in &rule.subsets {
                tracing::trace!(
                    hostname = %service.hostname,
                    subset = %subset.name,
                    port = %port.port,
                    "Building subset cluster"
                );
                let key = SubsetKey::new(
                    TrafficDirection::Outbound,
                    subset.name.as_str(),
                    &service.hostname,
                    port,
                );
                let mut subset_cluster =
                    build_outbound_cluster(mesh, key, discovery_type, hosts.clone(), port);
                apply_traffic_policy(&mut subset_cluster, rule.traffic_policy.as_ref());
                apply_traffic_policy(&mut subset_cluster, subset.traffic_policy.as_ref());
                clusters.push(subset_cluster);
            }
        }
    }

    clusters
}

fn build_outbound_cluster(
    mesh: &MeshConfig,
    key: SubsetKey,
    discovery_type: DiscoveryType,
    hosts: Vec<Address>,
    port: &Port,
) -> Cluster {
    let mut cluster = build_default_cluster(mesh, key.to_string(), discovery_type, hosts);
    update_eds(mesh, &mut cluster);
    set_upstream_protocol(&mut cluster, port);
    cluster
}
