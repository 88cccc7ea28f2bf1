use mesh_cluster_controller_core::{
    cluster::Address,
    service::{Port, Resolution, Service},
    ServiceRegistry,
};

/// Lists the static hosts of a service's cluster on `port`.
///
/// Only DNS-resolved services have static hosts. If the registry cannot list
/// the service's instances, the cluster is still built, without hosts.
pub(crate) fn cluster_hosts<R>(registry: &R, service: &Service, port: &Port) -> Vec<Address>
where
    R: ServiceRegistry + ?Sized,
{
    if service.resolution != Resolution::DnsLb {
        return Vec::new();
    }

    match registry.instances(&service.hostname, &[port.name.as_str()], &[]) {
        Ok(instances) => instances
            .into_iter()
            .map(|instance| Address::new(instance.endpoint.address, instance.endpoint.port))
            .collect(),
        Err(error) => {
            tracing::warn!(
                %error,
                hostname = %service.hostname,
                port = %port.name,
                "Failed to retrieve service instances"
            );
            Vec::new()
        }
    }
}
