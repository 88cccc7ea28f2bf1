use mesh_cluster_controller_core::TrafficDirection;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct GeneratorMetrics {
    passes: Counter,
    aborted: Counter,
    clusters: Family<ClusterLabels, Counter>,
}

const AUXILIARY: &str = "auxiliary";

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct ClusterLabels {
    direction: &'static str,
}

// === impl GeneratorMetrics ===

impl GeneratorMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let metrics = Self::default();
        reg.register(
            "passes",
            "Total number of cluster generation passes",
            metrics.passes.clone(),
        );
        reg.register(
            "aborted",
            "Total number of generation passes aborted because the registry failed",
            metrics.aborted.clone(),
        );
        reg.register(
            "clusters",
            "Total number of clusters generated",
            metrics.clusters.clone(),
        );
        metrics
    }

    pub(crate) fn aborted(&self) {
        self.passes.inc();
        self.aborted.inc();
    }

    pub(crate) fn generated(&self, outbound: usize, inbound: usize, auxiliary: usize) {
        self.passes.inc();
        for (direction, count) in [
            (TrafficDirection::Outbound.as_str(), outbound),
            (TrafficDirection::Inbound.as_str(), inbound),
            (AUXILIARY, auxiliary),
        ] {
            self.clusters
                .get_or_create(&ClusterLabels { direction })
                .inc_by(count as u64);
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    pub fn aborted_passes(&self) -> u64 {
        self.aborted.get()
    }

    pub fn clusters(&self, direction: TrafficDirection) -> u64 {
        self.clusters_labeled(direction.as_str())
    }

    /// Counts clusters supplied by other subsystems.
    pub fn auxiliary_clusters(&self) -> u64 {
        self.clusters_labeled(AUXILIARY)
    }

    fn clusters_labeled(&self, direction: &'static str) -> u64 {
        self.clusters
            .get_or_create(&ClusterLabels { direction })
            .get()
    }
}
