pub mod config;

use std::{
    net::{SocketAddr, SocketAddrV4},
    os::fd::AsRawFd,
    time::Duration,
};

use anyhow::{Context, Result};
use nix::sys::socket::{
    bind, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
};
use tokio::{
    net::UdpSocket,
    sync::mpsc::error::TryRecvError,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::queue::BroadcastReceiver;
use config::BroadcastConfig;

/// Sends at most one queued status payload per tick as a UDP datagram.
/// Nothing here ever waits on the network: a failed send is logged and the
/// payload is gone.
pub struct UdpBroadcaster {
    socket: UdpSocket,
    target: SocketAddrV4,
    tick: Duration,
    payloads: BroadcastReceiver,
}

impl UdpBroadcaster {
    pub fn bind(config: &BroadcastConfig, payloads: BroadcastReceiver) -> Result<Self> {
        let socket = open_socket(config.bind)
            .with_context(|| format!("Failed to bind UDP status socket on {}", config.bind))?;
        info!(
            "UDP status broadcast from {} to {}",
            socket.local_addr()?,
            config.target
        );
        Ok(Self {
            socket,
            target: config.target,
            tick: Duration::from_millis(config.tick_interval_ms.max(1)),
            payloads,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.payloads.try_recv() {
                Ok(payload) => self.send(&payload).await,
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }
        }
        info!("Status queue closed, UDP broadcaster stopping");
    }

    async fn send(&self, payload: &str) {
        match self.socket.send_to(payload.as_bytes(), self.target).await {
            Ok(sent) => debug!("Broadcast {} bytes to {}", sent, self.target),
            Err(e) => warn!("UDP status broadcast to {} failed: {}", self.target, e),
        }
    }
}

fn open_socket(addr: SocketAddrV4) -> Result<UdpSocket> {
    let fd = socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    setsockopt(&fd, sockopt::ReuseAddr, &true)?;
    setsockopt(&fd, sockopt::Broadcast, &true)?;
    bind(fd.as_raw_fd(), &SockaddrIn::from(addr))?;

    let socket = std::net::UdpSocket::from(fd);
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket)?)
}
