use mesh_cluster_controller_core::{
    cluster::DiscoveryType,
    policy::{ConnectionPoolSettings, SimpleLb, TcpSettings, TrafficPolicy},
};
use std::time::Duration;

/// The load balancer used by clusters that no policy configures.
pub const DEFAULT_LB: SimpleLb = SimpleLb::RoundRobin;

/// Builds the mesh-wide baseline policy applied to every cluster before any
/// user-authored policy.
///
/// Clusters that forward to the original destination must also balance that
/// way, so they default to the passthrough load balancer.
pub fn default_traffic_policy(
    discovery_type: DiscoveryType,
    connect_timeout: Duration,
) -> TrafficPolicy {
    let lb = match discovery_type {
        DiscoveryType::OriginalDst => SimpleLb::Passthrough,
        _ => DEFAULT_LB,
    };

    TrafficPolicy {
        load_balancer: Some(lb.into()),
        connection_pool: Some(ConnectionPoolSettings {
            tcp: Some(TcpSettings {
                connect_timeout: Some(connect_timeout),
                max_connections: None,
            }),
            http: None,
        }),
        outlier_detection: None,
        tls: None,
    }
}
