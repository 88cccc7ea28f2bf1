use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, net::IpAddr, num::NonZeroU16, str::FromStr, sync::Arc};

/// Key/value labels attached to a service instance.
pub type Labels = BTreeMap<String, String>;

/// A logical service in the registry, identified by its hostname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub hostname: String,

    /// Ports in the order they were declared.
    #[serde(default)]
    pub ports: Vec<Port>,

    #[serde(default)]
    pub resolution: Resolution,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub port: NonZeroU16,
    #[serde(default)]
    pub protocol: Protocol,
}

/// Describes how the proxy resolves the endpoints of a service.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Endpoints are streamed to the proxy, which balances across them.
    #[default]
    #[serde(rename = "ClientSideLB")]
    ClientSideLb,

    /// The proxy resolves the service's instances through DNS.
    #[serde(rename = "DNSLB")]
    DnsLb,

    /// Connections are forwarded to their original destination.
    Passthrough,

    #[serde(other)]
    Unknown,
}

/// The application protocol spoken on a port.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Grpc,
    Http,
    Http2,
    Https,
    #[default]
    Tcp,
    Udp,
    Mongo,
    Redis,
    Unsupported(String),
}

/// A concrete endpoint of a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInstance {
    pub endpoint: NetworkEndpoint,
    pub service: Arc<Service>,
    pub labels: Labels,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkEndpoint {
    /// An IP address or a DNS name.
    pub address: String,
    pub port: NonZeroU16,

    /// The service port this endpoint serves.
    pub service_port: Port,
}

/// The proxy for which clusters are being generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ip_address: IpAddr,
    pub id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Sidecar,
    Ingress,
    Router,
}

// === impl Port ===

impl Port {
    pub fn new(name: impl Into<String>, port: NonZeroU16, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            port,
            protocol,
        }
    }
}

// === impl Service ===

impl Service {
    pub fn port_by_name(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_by_number(&self, port: NonZeroU16) -> Option<&Port> {
        self.ports.iter().find(|p| p.port == port)
    }
}

// === impl Protocol ===

impl Protocol {
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http | Self::Http2 | Self::Grpc)
    }

    /// Indicates whether connections on this port must use HTTP/2.
    pub fn is_http2(&self) -> bool {
        matches!(self, Self::Http2 | Self::Grpc)
    }
}

impl FromStr for Protocol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let proto = match s.to_ascii_lowercase().as_str() {
            "grpc" => Self::Grpc,
            "http" => Self::Http,
            "http2" => Self::Http2,
            "https" => Self::Https,
            "tcp" => Self::Tcp,
            "udp" => Self::Udp,
            "mongo" => Self::Mongo,
            "redis" => Self::Redis,
            _ => Self::Unsupported(s.to_string()),
        };
        Ok(proto)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grpc => "GRPC".fmt(f),
            Self::Http => "HTTP".fmt(f),
            Self::Http2 => "HTTP2".fmt(f),
            Self::Https => "HTTPS".fmt(f),
            Self::Tcp => "TCP".fmt(f),
            Self::Udp => "UDP".fmt(f),
            Self::Mongo => "Mongo".fmt(f),
            Self::Redis => "Redis".fmt(f),
            Self::Unsupported(s) => s.fmt(f),
        }
    }
}

impl From<String> for Protocol {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(proto) => proto,
            Err(never) => match never {},
        }
    }
}

impl From<Protocol> for String {
    fn from(proto: Protocol) -> Self {
        proto.to_string()
    }
}

// === impl Labels ===

/// Indicates whether every key/value in `selector` is present in `labels`.
pub fn labels_match(selector: &Labels, labels: &Labels) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocols_parse_case_insensitively() {
        assert_eq!("grpc".parse(), Ok(Protocol::Grpc));
        assert_eq!("HTTP2".parse(), Ok(Protocol::Http2));
        assert_eq!("Mongo".parse(), Ok(Protocol::Mongo));
        assert_eq!(
            "thrift".parse(),
            Ok(Protocol::Unsupported("thrift".to_string()))
        );
    }

    #[test]
    fn http2_protocols() {
        assert!(Protocol::Grpc.is_http2());
        assert!(Protocol::Http2.is_http2());
        assert!(!Protocol::Http.is_http2());
        assert!(Protocol::Http.is_http());
        assert!(!Protocol::Tcp.is_http());
    }

    #[test]
    fn deserializes_services() {
        let svc: Service = serde_json::from_str(
            r#"{
                "hostname": "reviews.default.svc",
                "ports": [{"name": "http", "port": 80, "protocol": "HTTP"}],
                "resolution": "DNSLB"
            }"#,
        )
        .unwrap();
        assert_eq!(svc.resolution, Resolution::DnsLb);
        assert_eq!(svc.ports[0].protocol, Protocol::Http);

        let svc: Service =
            serde_json::from_str(r#"{"hostname": "a", "resolution": "Mystery"}"#).unwrap();
        assert_eq!(svc.resolution, Resolution::Unknown);
    }

    #[test]
    fn selectors_match_label_subsets() {
        let labels = maplit::btreemap! {
            "app".to_string() => "reviews".to_string(),
            "version".to_string() => "v2".to_string(),
        };
        assert!(labels_match(&Labels::new(), &labels));
        assert!(labels_match(
            &maplit::btreemap! { "version".to_string() => "v2".to_string() },
            &labels
        ));
        assert!(!labels_match(
            &maplit::btreemap! { "version".to_string() => "v1".to_string() },
            &labels
        ));
    }
}
