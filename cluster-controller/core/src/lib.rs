#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cluster;
mod discover;
pub mod duration;
mod mesh;
pub mod policy;
pub mod service;
mod subset_key;

pub use self::{
    discover::{AuxiliaryClusters, DestinationRules, NoAuxiliaryClusters, ServiceRegistry},
    mesh::MeshConfig,
    subset_key::{ParseSubsetKeyError, SubsetKey, TrafficDirection},
};

/// The name of the cluster through which proxies reach the discovery service.
pub const XDS_CLUSTER_NAME: &str = "xds-grpc";

/// The hostname used for inbound clusters that serve management (health-check) ports.
pub const MANAGEMENT_CLUSTER_HOSTNAME: &str = "mgmtCluster";
