use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connections::ConnectionTable;
use crate::queue::{Response, ResponseReceiver};

pub struct Transmitter {
    connections: ConnectionTable,
    responses: ResponseReceiver,
}

impl Transmitter {
    pub fn new(connections: ConnectionTable, responses: ResponseReceiver) -> Self {
        Self {
            connections,
            responses,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        while let Some(response) = self.responses.recv().await {
            self.transmit(response).await;
        }
        info!("Response queue closed, transmitter stopping");
    }

    async fn transmit(&self, response: Response) {
        let Response {
            connection,
            text,
            close,
        } = response;

        if self.connections.send(connection, text).await {
            debug!("Response queued for {}", connection);
        } else {
            warn!("Connection {} is gone, response dropped", connection);
        }

        if close {
            self.connections.close(connection).await;
            debug!("Connection {} closed after final response", connection);
        }
    }
}
