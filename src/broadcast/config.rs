use std::net::{Ipv4Addr, SocketAddrV4};

use serde::{Deserialize, Serialize};

pub const STATUS_PORT: u16 = 8888;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub enabled: bool,
    pub bind: SocketAddrV4,
    pub target: SocketAddrV4,
    pub tick_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, STATUS_PORT),
            target: SocketAddrV4::new(Ipv4Addr::BROADCAST, STATUS_PORT),
            tick_interval_ms: 50,
            queue_capacity: 16,
        }
    }
}
