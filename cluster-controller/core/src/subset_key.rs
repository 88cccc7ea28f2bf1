use crate::service::Port;
use std::{fmt, num::NonZeroU16, str::FromStr};

/// Whether a cluster serves traffic leaving or entering the proxy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrafficDirection {
    Inbound,
    Outbound,
}

/// Uniquely names a cluster within a generation pass, as
/// `<direction>|<port>|<subset>|<hostname>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubsetKey {
    pub direction: TrafficDirection,
    pub port: NonZeroU16,

    /// Empty for a service's default cluster.
    pub subset: String,
    pub hostname: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseSubsetKeyError {
    #[error("subset key must have four '|'-separated parts")]
    Parts,

    #[error("invalid traffic direction: {0:?}")]
    Direction(String),

    #[error("invalid port: {0:?}")]
    Port(String),
}

// === impl TrafficDirection ===

impl TrafficDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl SubsetKey ===

impl SubsetKey {
    pub fn new(
        direction: TrafficDirection,
        subset: impl Into<String>,
        hostname: impl Into<String>,
        port: &Port,
    ) -> Self {
        Self {
            direction,
            port: port.port,
            subset: subset.into(),
            hostname: hostname.into(),
        }
    }
}

impl fmt::Display for SubsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.direction, self.port, self.subset, self.hostname
        )
    }
}

impl FromStr for SubsetKey {
    type Err = ParseSubsetKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '|');
        let (Some(direction), Some(port), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseSubsetKeyError::Parts);
        };
        // Hostnames never contain '|', but subset names may.
        let Some((subset, hostname)) = rest.rsplit_once('|') else {
            return Err(ParseSubsetKeyError::Parts);
        };

        let direction = match direction {
            "inbound" => TrafficDirection::Inbound,
            "outbound" => TrafficDirection::Outbound,
            d => return Err(ParseSubsetKeyError::Direction(d.to_string())),
        };
        let port = port
            .parse::<NonZeroU16>()
            .map_err(|_| ParseSubsetKeyError::Port(port.to_string()))?;

        Ok(Self {
            direction,
            port,
            subset: subset.to_string(),
            hostname: hostname.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Protocol;

    #[test]
    fn formats_cluster_names() {
        let port = Port::new("http", NonZeroU16::new(80).unwrap(), Protocol::Http);
        let key = SubsetKey::new(
            TrafficDirection::Outbound,
            "",
            "reviews.default.svc",
            &port,
        );
        assert_eq!(key.to_string(), "outbound|80||reviews.default.svc");

        let key = SubsetKey::new(
            TrafficDirection::Inbound,
            "v2",
            "reviews.default.svc",
            &port,
        );
        assert_eq!(key.to_string(), "inbound|80|v2|reviews.default.svc");
    }

    #[test]
    fn subset_names_may_contain_separators() {
        let port = Port::new("http", NonZeroU16::new(80).unwrap(), Protocol::Http);
        let key = SubsetKey::new(
            TrafficDirection::Outbound,
            "canary|eu",
            "reviews.default.svc",
            &port,
        );

        let parsed = key.to_string().parse::<SubsetKey>().unwrap();
        assert_eq!(parsed.subset, "canary|eu");
        assert_eq!(parsed.hostname, "reviews.default.svc");
        assert_eq!(parsed, key);
    }

    #[test]
    fn parses_cluster_names() {
        let key = "outbound|9080|v1|ratings.default.svc"
            .parse::<SubsetKey>()
            .unwrap();
        assert_eq!(key.direction, TrafficDirection::Outbound);
        assert_eq!(key.port.get(), 9080);
        assert_eq!(key.subset, "v1");
        assert_eq!(key.hostname, "ratings.default.svc");

        assert_eq!(
            "outbound|80|".parse::<SubsetKey>(),
            Err(ParseSubsetKeyError::Parts)
        );
        assert_eq!(
            "sideways|80||a".parse::<SubsetKey>(),
            Err(ParseSubsetKeyError::Direction("sideways".to_string()))
        );
        assert_eq!(
            "inbound|0||a".parse::<SubsetKey>(),
            Err(ParseSubsetKeyError::Port("0".to_string()))
        );
    }
}
