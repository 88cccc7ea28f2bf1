use crate::duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mesh-wide settings shared by every generation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    /// The connect timeout applied to every cluster that no policy overrides.
    #[serde(with = "duration::string")]
    pub connect_timeout: Duration,

    /// How often proxies poll the discovery service for EDS updates.
    #[serde(with = "duration::string")]
    pub rds_refresh_delay: Duration,
}

impl MeshConfig {
    /// Proxies reject clusters without a connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Proxies reject a zero EDS refresh delay.
    pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5);

    /// The refresh delay to configure on EDS clusters, never zero.
    pub fn eds_refresh_delay(&self) -> Duration {
        if self.rds_refresh_delay.is_zero() {
            return Self::DEFAULT_REFRESH_DELAY;
        }
        self.rds_refresh_delay
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            rds_refresh_delay: Self::DEFAULT_REFRESH_DELAY,
        }
    }
}
