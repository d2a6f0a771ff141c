//! Endpoint configuration loading from TOML
//!
//! Typed view of the addresses the host wires into the endpoints. Every
//! section is optional; the host constructs only the endpoints its
//! deployment needs.
//!
//! ```toml
//! [command_server]
//! bind = "0.0.0.0:9100"
//! dst_id = 1
//!
//! [plc_server]
//! bind = "0.0.0.0:9200"
//!
//! [peer]
//! remote = "192.168.10.40:9100"
//! local_ip = "192.168.10.2"
//!
//! [udp]
//! bind = "0.0.0.0:9300"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddrV4;
use std::path::Path;

/// Command-protocol server section
#[derive(Debug, Clone, Deserialize)]
pub struct CommandServerConfig {
    /// Bind address, `"ip:port"`
    pub bind: String,

    /// This endpoint's subsystem id on the command wire
    pub dst_id: i32,

    /// Stop after the first accepted frame (diagnostics)
    #[serde(default)]
    pub run_once: bool,

    /// Listen backlog
    #[serde(default = "default_max_pending")]
    pub max_pending: i32,
}

fn default_max_pending() -> i32 {
    1
}

/// PLC fan-out server section
#[derive(Debug, Clone, Deserialize)]
pub struct PlcServerConfig {
    /// Bind address, `"ip:port"`
    pub bind: String,
}

/// Outbound peer connection section
#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    /// Remote address, `"ip:port"`
    pub remote: String,

    /// Local interface to bind before connecting (port is OS-chosen)
    #[serde(default)]
    pub local_ip: Option<String>,
}

/// UDP endpoint section
#[derive(Debug, Clone, Deserialize)]
pub struct UdpConfig {
    /// Receive bind address, `"ip:port"`
    pub bind: String,
}

/// Root network configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NetConfig {
    #[serde(default)]
    pub command_server: Option<CommandServerConfig>,

    #[serde(default)]
    pub plc_server: Option<PlcServerConfig>,

    #[serde(default)]
    pub peer: Option<PeerConfig>,

    #[serde(default)]
    pub udp: Option<UdpConfig>,
}

impl NetConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: NetConfig = basic_toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(cs) = &self.command_server {
            check_addr("command_server.bind", &cs.bind)?;
            if cs.max_pending < 1 {
                return Err(Error::Config(
                    "command_server.max_pending must be at least 1".to_string(),
                ));
            }
        }
        if let Some(plc) = &self.plc_server {
            check_addr("plc_server.bind", &plc.bind)?;
        }
        if let Some(peer) = &self.peer {
            check_addr("peer.remote", &peer.remote)?;
            if let Some(ip) = &peer.local_ip {
                ip.parse::<std::net::Ipv4Addr>().map_err(|_| {
                    Error::Config(format!("peer.local_ip is not an IPv4 address: {}", ip))
                })?;
            }
        }
        if let Some(udp) = &self.udp {
            check_addr("udp.bind", &udp.bind)?;
        }
        Ok(())
    }
}

fn check_addr(field: &str, value: &str) -> Result<()> {
    value
        .parse::<SocketAddrV4>()
        .map(|_| ())
        .map_err(|_| Error::Config(format!("{} is not an IPv4 socket address: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let config = NetConfig::from_toml(
            r#"
            [command_server]
            bind = "0.0.0.0:9100"
            dst_id = 1

            [plc_server]
            bind = "0.0.0.0:9200"

            [peer]
            remote = "192.168.10.40:9100"
            local_ip = "192.168.10.2"

            [udp]
            bind = "0.0.0.0:9300"
            "#,
        )
        .unwrap();

        let cs = config.command_server.unwrap();
        assert_eq!(cs.bind, "0.0.0.0:9100");
        assert_eq!(cs.dst_id, 1);
        assert!(!cs.run_once);
        assert_eq!(cs.max_pending, 1);
        assert_eq!(config.peer.unwrap().local_ip.as_deref(), Some("192.168.10.2"));
    }

    #[test]
    fn test_sections_are_optional() {
        let config = NetConfig::from_toml("").unwrap();
        assert!(config.command_server.is_none());
        assert!(config.plc_server.is_none());
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let err = NetConfig::from_toml(
            r#"
            [plc_server]
            bind = "not-an-address"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_backlog_is_rejected() {
        let err = NetConfig::from_toml(
            r#"
            [command_server]
            bind = "0.0.0.0:9100"
            dst_id = 1
            max_pending = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
