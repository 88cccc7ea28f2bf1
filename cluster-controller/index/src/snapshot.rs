use mesh_cluster_controller_core::{
    cluster::Cluster,
    policy::DestinationRule,
    service::{Labels, Port, Service},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, net::IpAddr, num::NonZeroU16};

/// A point-in-time export of the service registry and the destination rule
/// store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub services: Vec<Service>,

    #[serde(default)]
    pub instances: Vec<InstanceSpec>,

    #[serde(default)]
    pub destination_rules: Vec<DestinationRule>,

    /// Management ports exposed by each workload address.
    #[serde(default)]
    pub management_ports: BTreeMap<IpAddr, Vec<Port>>,

    /// Clusters supplied by other subsystems for the instances of a service,
    /// keyed by the service's hostname.
    #[serde(default)]
    pub auxiliary_clusters: BTreeMap<String, Vec<Cluster>>,
}

/// An endpoint of a service, as it appears in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    pub hostname: String,
    pub address: String,
    pub port: NonZeroU16,

    /// The name of the service port this endpoint serves.
    pub service_port: String,

    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("service {0} is defined more than once")]
    DuplicateService(String),

    #[error("instance {address} references unknown service {hostname}")]
    UnknownService { hostname: String, address: String },

    #[error("instance {address} references unknown port {port} of service {hostname}")]
    UnknownPort {
        hostname: String,
        address: String,
        port: String,
    },
}

impl Snapshot {
    pub fn from_json(bytes: &[u8]) -> Result<Self, SnapshotError> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }
}
