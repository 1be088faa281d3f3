use std::time::Duration;

use crate::messaging::udp_messaging::AddressFamily;

/// The server's well-known UDP port
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug)]
pub struct ServerConfig {
    pub address_family: AddressFamily,
    pub port: u16,

    /// interval for logging a summary of busy teams and active missions; `None` turns the
    ///  summary off
    pub status_log_interval: Option<Duration>,
}

impl ServerConfig {
    pub fn new(address_family: AddressFamily) -> ServerConfig {
        ServerConfig {
            address_family,
            port: DEFAULT_PORT,
            status_log_interval: Some(Duration::from_secs(60)),
        }
    }
}
