use mesh_cluster_controller_core::{cluster::DiscoveryType, service::Resolution};

/// Chooses how a proxy discovers the endpoints of a service.
pub fn discovery_type(resolution: Resolution) -> DiscoveryType {
    match resolution {
        Resolution::ClientSideLb => DiscoveryType::Eds,
        Resolution::DnsLb => DiscoveryType::StrictDns,
        Resolution::Passthrough => DiscoveryType::OriginalDst,
        Resolution::Unknown => DiscoveryType::Eds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolutions() {
        assert_eq!(discovery_type(Resolution::ClientSideLb), DiscoveryType::Eds);
        assert_eq!(discovery_type(Resolution::DnsLb), DiscoveryType::StrictDns);
        assert_eq!(
            discovery_type(Resolution::Passthrough),
            DiscoveryType::OriginalDst
        );
        assert_eq!(discovery_type(Resolution::Unknown), DiscoveryType::Eds);
        assert_eq!(discovery_type(Resolution::default()), DiscoveryType::Eds);
    }
}
