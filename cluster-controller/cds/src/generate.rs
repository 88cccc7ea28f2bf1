use crate::{
    inbound::build_inbound_clusters, metrics::GeneratorMetrics, order::ClusterOrder,
    outbound::build_outbound_clusters,
};
use mesh_cluster_controller_core::{
    cluster::Cluster,
    service::{NodeType, Proxy},
    AuxiliaryClusters, DestinationRules, MeshConfig, NoAuxiliaryClusters, ServiceRegistry,
};

/// The collaborators a generation pass reads from.
#[derive(Clone, Debug)]
pub struct Environment<R, C, A = NoAuxiliaryClusters> {
    pub mesh: MeshConfig,
    pub registry: R,
    pub rules: C,
    pub auxiliary: A,
}

/// Runs generation passes, ordering their output and recording metrics.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    order: ClusterOrder,
    metrics: GeneratorMetrics,
}

/// The clusters built by one pass, with the number built for each direction.
/// Auxiliary clusters follow the outbound and inbound clusters.
struct Pass {
    clusters: Vec<Cluster>,
    outbound: usize,
    inbound: usize,
}

/// Builds every cluster `proxy` needs.
///
/// Outbound clusters are built for every service in the registry. Sidecars
/// additionally get inbound clusters for their local instances and management
/// ports, followed by the auxiliary clusters for those instances.
///
/// Returns `None` if the registry cannot list services or the proxy's
/// instances; the pass should be retried rather than serving partial output.
/// Every returned cluster has a connect timeout. The clusters are neither
/// deduplicated nor ordered; see [`ClusterOrder`].
pub fn build_clusters<R, C, A>(env: &Environment<R, C, A>, proxy: &Proxy) -> Option<Vec<Cluster>>
where
    R: ServiceRegistry,
    C: DestinationRules,
    A: AuxiliaryClusters,
{
    build_pass(env, proxy).map(|pass| pass.clusters)
}

fn build_pass<R, C, A>(env: &Environment<R, C, A>, proxy: &Proxy) -> Option<Pass>
where
    R: ServiceRegistry,
    C: DestinationRules,
    A: AuxiliaryClusters,
{
    let services = match env.registry.services() {
        Ok(services) => services,
        Err(error) => {
            tracing::error!(%error, "Failed to retrieve services");
            return None;
        }
    };

    let mut clusters = build_outbound_clusters(&env.mesh, &env.registry, &env.rules, &services);
    let outbound = clusters.len();

    let mut inbound = 0;
    if proxy.node_type == NodeType::Sidecar {
        let instances = match env.registry.proxy_instances(proxy) {
            Ok(instances) => instances,
            Err(error) => {
                tracing::error!(
                    %error,
                    proxy = %proxy.id,
                    "Failed to retrieve proxy service instances"
                );
                return None;
            }
        };
        let management_ports = env.registry.management_ports(proxy.ip_address);

        clusters.extend(build_inbound_clusters(&env.mesh, &instances, &management_ports));
        inbound = clusters.len() - outbound;
        clusters.extend(env.auxiliary.clusters_for_instances(&env.mesh, &instances));
    }

    ensure_connect_timeout(&mut clusters);
    Some(Pass {
        clusters,
        outbound,
        inbound,
    })
}

/// Proxies reject clusters without a connect timeout.
fn ensure_connect_timeout(clusters: &mut [Cluster]) {
    for cluster in clusters {
        if cluster.connect_timeout.is_zero() {
            cluster.connect_timeout = MeshConfig::DEFAULT_CONNECT_TIMEOUT;
        }
    }
}

// === impl Generator ===

impl Generator {
    pub fn new(order: ClusterOrder, metrics: GeneratorMetrics) -> Self {
        Self { order, metrics }
    }

    pub fn metrics(&self) -> &GeneratorMetrics {
        &self.metrics
    }

    pub fn generate<R, C, A>(
        &self,
        env: &Environment<R, C, A>,
        proxy: &Proxy,
    ) -> Option<Vec<Cluster>>
    where
        R: ServiceRegistry,
        C: DestinationRules,
        A: AuxiliaryClusters,
    {
        let Some(pass) = build_pass(env, proxy) else {
            self.metrics.aborted();
            return None;
        };

        let auxiliary = pass.clusters.len() - pass.outbound - pass.inbound;
        self.metrics.generated(pass.outbound, pass.inbound, auxiliary);

        let mut clusters = pass.clusters;
        self.order.apply(&mut clusters);
        tracing::debug!(proxy = %proxy.id, clusters = clusters.len(), "Generated clusters");
        Some(clusters)
    }
}
