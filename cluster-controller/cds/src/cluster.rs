use crate::{defaults::default_traffic_policy, policy::apply_traffic_policy};
use mesh_cluster_controller_core::{
    cluster::{Address, ApiType, Cluster, ConfigSource, DiscoveryType, EdsClusterConfig},
    service::Port,
    MeshConfig, XDS_CLUSTER_NAME,
};

/// Builds a cluster with the mesh-wide baseline policy applied.
///
/// Every cluster, inbound or outbound, is created here.
pub fn build_default_cluster(
    mesh: &MeshConfig,
    name: impl Into<String>,
    discovery_type: DiscoveryType,
    hosts: Vec<Address>,
) -> Cluster {
    let mut cluster = Cluster::new(name, discovery_type, hosts);
    let policy = default_traffic_policy(discovery_type, mesh.connect_timeout);
    apply_traffic_policy(&mut cluster, Some(&policy));
    cluster
}

/// Points an EDS cluster at the discovery service. Other clusters are left
/// unchanged.
pub(crate) fn update_eds(mesh: &MeshConfig, cluster: &mut Cluster) {
    if cluster.discovery_type() != DiscoveryType::Eds {
        return;
    }

    let config = EdsClusterConfig {
        service_name: cluster.name.clone(),
        eds_config: ConfigSource {
            api_type: ApiType::Grpc,
            cluster_names: vec![XDS_CLUSTER_NAME.to_string()],
            refresh_delay: mesh.eds_refresh_delay(),
        },
    };
    cluster.set_eds_cluster_config(config);
}

pub(crate) fn set_upstream_protocol(cluster: &mut Cluster, port: &Port) {
    if port.protocol.is_http2() {
        cluster.http2_protocol_options = Some(Default::default());
    }
}
