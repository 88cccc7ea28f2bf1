use mesh_cluster_controller_core::cluster::Cluster;

/// Orders a generation pass's clusters before they are handed to delivery.
///
/// Passes neither deduplicate nor sort their output, so two passes over the
/// same state may list clusters differently when the registry reorders its
/// services. Delivery layers that diff successive passes should sort by name.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ClusterOrder {
    /// Clusters are left in the order they were built.
    #[default]
    Generated,

    /// Clusters are stably sorted by name.
    ByName,
}

impl ClusterOrder {
    pub fn apply(&self, clusters: &mut [Cluster]) {
        match self {
            Self::Generated => {}
            Self::ByName => clusters.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_cluster_controller_core::cluster::DiscoveryType;

    fn names(clusters: &[Cluster]) -> Vec<&str> {
        clusters.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn orders_clusters() {
        let mut clusters = ["outbound|90||b", "inbound|80||a", "outbound|80||b"]
            .into_iter()
            .map(|name| Cluster::new(name, DiscoveryType::Eds, vec![]))
            .collect::<Vec<_>>();

        ClusterOrder::Generated.apply(&mut clusters);
        assert_eq!(
            names(&clusters),
            ["outbound|90||b", "inbound|80||a", "outbound|80||b"]
        );

        ClusterOrder::ByName.apply(&mut clusters);
        assert_eq!(
            names(&clusters),
            ["inbound|80||a", "outbound|80||b", "outbound|90||b"]
        );
    }
}
