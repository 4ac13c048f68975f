use std::fmt;

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    pub connection: ConnectionId,
    pub line: String,
}

/// Outbound text for one connection. `close` shuts the connection down once
/// the text has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub connection: ConnectionId,
    pub text: String,
    pub close: bool,
}

impl Response {
    pub fn new(connection: ConnectionId, text: impl Into<String>) -> Self {
        Self {
            connection,
            text: text.into(),
            close: false,
        }
    }

    pub fn closing(connection: ConnectionId, text: impl Into<String>) -> Self {
        Self {
            close: true,
            ..Self::new(connection, text)
        }
    }
}

pub type CommandSender = mpsc::UnboundedSender<QueuedCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<QueuedCommand>;
pub type ResponseSender = mpsc::UnboundedSender<Response>;
pub type ResponseReceiver = mpsc::UnboundedReceiver<Response>;
pub type BroadcastSender = mpsc::Sender<String>;
pub type BroadcastReceiver = mpsc::Receiver<String>;

pub fn command_queue() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

pub fn response_queue() -> (ResponseSender, ResponseReceiver) {
    mpsc::unbounded_channel()
}

pub fn broadcast_queue(capacity: usize) -> (BroadcastSender, BroadcastReceiver) {
    mpsc::channel(capacity.max(1))
}
