pub mod config;
pub mod connections;
pub mod transmitter;

use std::net::SocketAddr;

use anyhow::Result;
use futures::StreamExt;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::{
    protocol::{codec::CommandCodec, is_quit, CLOSING_NOTICE},
    queue::{CommandSender, ConnectionId, QueuedCommand, Response, ResponseSender},
};
use config::{EmptyLinePolicy, SocketServerConfig};
use connections::ConnectionTable;

pub struct SocketServer {
    config: SocketServerConfig,
    commands: CommandSender,
    responses: ResponseSender,
    connections: ConnectionTable,
    shutdown_tx: Option<broadcast::Sender<()>>,
    local_addr: Option<SocketAddr>,
}

#[derive(Clone)]
struct ClientContext {
    commands: CommandSender,
    responses: ResponseSender,
    connections: ConnectionTable,
    max_line_length: usize,
    empty_line: EmptyLinePolicy,
}

impl SocketServer {
    pub fn new(
        config: SocketServerConfig,
        commands: CommandSender,
        responses: ResponseSender,
        connections: ConnectionTable,
    ) -> Self {
        Self {
            config,
            commands,
            responses,
            connections,
            shutdown_tx: None,
            local_addr: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub async fn start(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);
        info!("Socket server listening on: {}", local_addr);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let context = ClientContext {
            commands: self.commands.clone(),
            responses: self.responses.clone(),
            connections: self.connections.clone(),
            max_line_length: self.config.max_line_length,
            empty_line: self.config.empty_line,
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, peer)) => {
                                let context = context.clone();
                                let mut shutdown_rx = shutdown_rx.resubscribe();
                                tokio::spawn(async move {
                                    Self::handle_client(stream, peer, context, &mut shutdown_rx).await;
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Socket server shutting down");
                        break;
                    }
                }
            }
        });

        Ok(local_addr)
    }

    pub async fn shutdown(&self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }
        self.connections.close_all().await;
        info!("Socket server shutdown complete");
    }

    async fn handle_client(
        stream: TcpStream,
        peer: SocketAddr,
        context: ClientContext,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) {
        let id = ConnectionId::new();
        let (read_half, write_half) = stream.into_split();
        context
            .connections
            .register(id, write_half, context.max_line_length)
            .await;
        let mut lines = FramedRead::new(read_half, CommandCodec::new(context.max_line_length));
        info!("Client {} connected as {}", peer, id);

        loop {
            tokio::select! {
                line_result = lines.next() => {
                    match line_result {
                        Some(Ok(line)) => {
                            debug!("Received from {}: {:?}", id, line);
                            if is_quit(&line) || (line.trim().is_empty() && context.empty_line == EmptyLinePolicy::Disconnect) {
                                // the transmitter closes the connection after the notice
                                if context.responses.send(Response::closing(id, CLOSING_NOTICE)).is_err() {
                                    context.connections.close(id).await;
                                }
                                info!("Client {} ({}) quit", peer, id);
                                return;
                            }
                            if line.trim().is_empty() && context.empty_line == EmptyLinePolicy::Ignore {
                                continue;
                            }
                            if context.commands.send(QueuedCommand { connection: id, line }).is_err() {
                                warn!("Command queue closed, dropping client {}", id);
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!("Error reading from client {} ({}): {}", peer, id, e);
                            break;
                        }
                        None => {
                            debug!("Client {} reached end of stream", id);
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Shutdown signal received, closing client {}", id);
                    break;
                }
            }
        }

        context.connections.remove(id).await;
        info!("Client {} ({}) disconnected", peer, id);
    }
}
