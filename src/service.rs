use std::net::SocketAddr;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    broadcast::UdpBroadcaster,
    config::Config,
    dispatcher::CommandDispatcher,
    queue::{broadcast_queue, command_queue, response_queue, CommandSender},
    registry::AxisRegistry,
    socket_server::{connections::ConnectionTable, transmitter::Transmitter, SocketServer},
};

pub struct StageService {
    server: SocketServer,
    commands: CommandSender,
    dispatcher: JoinHandle<AxisRegistry>,
    transmitter: JoinHandle<()>,
    broadcaster: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    status_addr: Option<SocketAddr>,
}

impl StageService {
    pub async fn start(config: Config, registry: AxisRegistry) -> Result<Self> {
        let (commands_tx, commands_rx) = command_queue();
        let (responses_tx, responses_rx) = response_queue();
        let connections = ConnectionTable::new();

        let mut dispatcher =
            CommandDispatcher::new(registry, config.dispatcher.clone(), responses_tx.clone());
        let mut broadcaster = None;
        let mut status_addr = None;
        if config.broadcast.enabled {
            let (status_tx, status_rx) = broadcast_queue(config.broadcast.queue_capacity);
            let udp = UdpBroadcaster::bind(&config.broadcast, status_rx)?;
            status_addr = Some(udp.local_addr()?);
            broadcaster = Some(udp.spawn());
            dispatcher = dispatcher.with_broadcast(status_tx);
        }

        let mut server = SocketServer::new(
            config.server.clone(),
            commands_tx.clone(),
            responses_tx,
            connections.clone(),
        );
        let local_addr = server.start().await?;

        let dispatcher = dispatcher.spawn(commands_rx);
        let transmitter = Transmitter::new(connections, responses_rx).spawn();
        info!("Stage service ready on {}", local_addr);

        Ok(Self {
            server,
            commands: commands_tx,
            dispatcher,
            transmitter,
            broadcaster,
            local_addr,
            status_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn status_addr(&self) -> Option<SocketAddr> {
        self.status_addr
    }

    /// Stops accepting clients, lets the dispatcher finish what is already
    /// queued, then closes every device.
    pub async fn shutdown(self) -> Result<()> {
        self.server.shutdown().await;
        drop(self.server);
        drop(self.commands);

        let registry = self.dispatcher.await?;
        registry.close_all().await;
        info!("All axes closed");

        if let Err(e) = self.transmitter.await {
            warn!("Transmitter ended abnormally: {}", e);
        }
        if let Some(broadcaster) = self.broadcaster {
            if let Err(e) = broadcaster.await {
                warn!("UDP broadcaster ended abnormally: {}", e);
            }
        }
        info!("Stage service stopped");
        Ok(())
    }
}
