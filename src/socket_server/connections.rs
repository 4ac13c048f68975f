use std::{collections::HashMap, sync::Arc};

use futures::SinkExt;
use tokio::{
    net::tcp::OwnedWriteHalf,
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::codec::FramedWrite;
use tracing::debug;

use crate::{protocol::codec::CommandCodec, queue::ConnectionId};

type Outbox = mpsc::UnboundedSender<String>;

/// Outbound queues of the open connections, keyed by connection id. Each
/// connection has its own writer task, so a peer that stops reading only
/// backs up its own queue. The lock is never held across socket I/O.
#[derive(Clone, Default)]
pub struct ConnectionTable {
    outboxes: Arc<Mutex<HashMap<ConnectionId, Outbox>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the writer task for `write_half` and makes the connection
    /// reachable. The task ends, shutting the write half down, once the
    /// entry is removed and its queue has been written out.
    pub async fn register(
        &self,
        id: ConnectionId,
        write_half: OwnedWriteHalf,
        max_line_length: usize,
    ) -> JoinHandle<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = FramedWrite::new(write_half, CommandCodec::new(max_line_length));
        let handle = tokio::spawn(write_loop(id, writer, rx));
        self.outboxes.lock().await.insert(id, tx);
        handle
    }

    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.outboxes.lock().await.remove(&id).is_some()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.outboxes.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.outboxes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn send(&self, id: ConnectionId, text: String) -> bool {
        let mut outboxes = self.outboxes.lock().await;
        let Some(outbox) = outboxes.get(&id) else {
            return false;
        };
        if outbox.send(text).is_err() {
            outboxes.remove(&id);
            return false;
        }
        true
    }

    pub async fn close(&self, id: ConnectionId) {
        self.remove(id).await;
    }

    pub async fn close_all(&self) {
        self.outboxes.lock().await.clear();
    }
}

async fn write_loop(
    id: ConnectionId,
    mut writer: FramedWrite<OwnedWriteHalf, CommandCodec>,
    mut outbox: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = outbox.recv().await {
        if let Err(e) = writer.send(text).await {
            debug!("Writing to {} failed, dropping its queue: {}", id, e);
            return;
        }
    }
    if let Err(e) = writer.close().await {
        debug!("Closing connection {} failed: {}", id, e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_stalled_peer_does_not_block_others() {
        let table = ConnectionTable::new();

        let (_stalled_client, stalled_server) = connected_pair().await;
        let (_stalled_read, stalled_write) = stalled_server.into_split();
        let stalled = ConnectionId::new();
        table.register(stalled, stalled_write, 1 << 20).await;

        let (client, server) = connected_pair().await;
        let (_read, write) = server.into_split();
        let live = ConnectionId::new();
        table.register(live, write, 1 << 20).await;

        // far more than the socket buffers hold; nobody reads it
        let chunk = "x".repeat(64 * 1024);
        for _ in 0..512 {
            assert!(table.send(stalled, chunk.clone()).await);
        }

        assert!(table.send(live, "OK,IDLE".to_string()).await);
        let mut lines = BufReader::new(client).lines();
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.as_deref(), Some("OK,IDLE"));

        let other = ConnectionId::new();
        let (_c, s) = connected_pair().await;
        tokio::time::timeout(
            Duration::from_secs(1),
            table.register(other, s.into_split().1, 1024),
        )
        .await
        .unwrap();
        assert_eq!(table.len().await, 3);
    }

    #[tokio::test]
    async fn test_close_flushes_queued_text_first() {
        let table = ConnectionTable::new();
        let (client, server) = connected_pair().await;
        let (_read, write) = server.into_split();
        let id = ConnectionId::new();
        let writer = table.register(id, write, 1024).await;

        assert!(table.send(id, "OK".to_string()).await);
        assert!(table.send(id, "closing connection...".to_string()).await);
        table.close(id).await;
        assert!(!table.send(id, "late".to_string()).await);
        writer.await.unwrap();

        let mut lines = BufReader::new(client).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("OK"));
        assert_eq!(
            lines.next_line().await.unwrap().as_deref(),
            Some("closing connection...")
        );
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
