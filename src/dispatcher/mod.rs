pub mod config;

use chrono::{SecondsFormat, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    axis::{error::AxisError, Axis},
    protocol::{
        client_command::Command, error::ParseError, parse_command, server_response::Reply,
        DONE_MARKER,
    },
    queue::{BroadcastSender, CommandReceiver, ConnectionId, QueuedCommand, Response, ResponseSender},
    registry::AxisRegistry,
};
use config::{DispatcherConfig, ReplyMode};

/// The single consumer of the command queue. Commands from every connection
/// run one at a time in arrival order, and this is the only place axis state
/// is touched.
pub struct CommandDispatcher {
    registry: AxisRegistry,
    config: DispatcherConfig,
    responses: ResponseSender,
    broadcast: Option<BroadcastSender>,
}

impl CommandDispatcher {
    pub fn new(registry: AxisRegistry, config: DispatcherConfig, responses: ResponseSender) -> Self {
        Self {
            registry,
            config,
            responses,
            broadcast: None,
        }
    }

    pub fn with_broadcast(mut self, broadcast: BroadcastSender) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    pub fn spawn(self, commands: CommandReceiver) -> JoinHandle<AxisRegistry> {
        tokio::spawn(self.run(commands))
    }

    pub async fn run(self, mut commands: CommandReceiver) -> AxisRegistry {
        info!(
            "Command dispatcher serving axes {:?} ({:?} replies)",
            self.registry.slots(),
            self.config.reply_mode
        );
        while let Some(queued) = commands.recv().await {
            self.dispatch(queued).await;
        }
        info!("Command queue closed, dispatcher stopping");
        self.registry
    }

    async fn dispatch(&self, queued: QueuedCommand) {
        let QueuedCommand { connection, line } = queued;
        debug!("Dispatching {:?} from {}", line.trim(), connection);

        let (reply, command) = self.execute_line(&line).await;
        let mut text = reply.render();
        debug!("Reply to {}: {:?}", connection, text);

        match self.config.reply_mode {
            ReplyMode::Immediate => self.respond(connection, text),
            ReplyMode::WaitForIdle => match command.filter(|c| c.verb().starts_motion()) {
                Some(command) => {
                    self.respond(connection, text);
                    let tail = match self.wait_for_idle(&command.slots()).await {
                        Ok(()) => DONE_MARKER.to_string(),
                        Err(e) => {
                            warn!("Waiting for {:?} to finish failed: {}", command.verb(), e);
                            format!("BAD,{}\n{}", e, DONE_MARKER)
                        }
                    };
                    self.respond(connection, tail);
                }
                None => {
                    text.push('\n');
                    text.push_str(DONE_MARKER);
                    self.respond(connection, text);
                }
            },
        }

        if self.config.broadcast_status {
            self.publish_status().await;
        }
    }

    pub async fn execute_line(&self, line: &str) -> (Reply, Option<Command>) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected {:?}: {}", line.trim(), e);
                return (Reply::command_failure(e), None);
            }
        };

        if let Some(slot) = command.slots().into_iter().find(|s| !self.registry.contains(*s)) {
            let err = ParseError::UnknownAxis(slot);
            warn!("Rejected {:?}: {}", line.trim(), err);
            return (Reply::command_failure(err), Some(command));
        }

        let reply = self.execute(&command).await;
        (reply, Some(command))
    }

    pub async fn execute(&self, command: &Command) -> Reply {
        match command {
            Command::Status { axes } => self.handle_status(axes).await,
            Command::State { axes } => self.handle_state(axes).await,
            Command::Stop { axes } => self.handle_stop(axes).await,
            Command::Home { axes } => self.handle_home(axes).await,
            Command::Zero { axes } => {
                let mut reply = Reply::ok();
                for axis in self.select(axes) {
                    let result = axis.set_zero().await;
                    Self::record(&mut reply, axis, "zero", result);
                }
                reply
            }
            Command::Goto { targets } => {
                let mut reply = Reply::ok();
                for (axis, target) in self.select_targets(targets) {
                    let result = axis.goto_real(target).await;
                    Self::record(&mut reply, axis, "goto", result);
                }
                reply
            }
            Command::Offset { targets } => {
                let mut reply = Reply::ok();
                for (axis, delta) in self.select_targets(targets) {
                    let result = axis.offset_real(delta).await;
                    Self::record(&mut reply, axis, "offset", result);
                }
                reply
            }
            Command::Speed { targets } => {
                let mut reply = Reply::ok();
                for (axis, speed) in self.select_targets(targets) {
                    let result = axis.set_speed_real(speed).await;
                    Self::record(&mut reply, axis, "speed", result);
                }
                reply
            }
            Command::Quit => Reply::ok(),
        }
    }

    async fn handle_status(&self, axes: &[char]) -> Reply {
        let mut reply = Reply::ok();
        for axis in self.select(axes) {
            match axis.status().await {
                Ok(status) => reply.push_detail(axis.slot(), status.describe(axis.units())),
                Err(e) => {
                    warn!("Status query for axis {} failed: {}", axis.slot(), e);
                    reply.push_failure(axis.slot(), e);
                }
            }
        }
        reply
    }

    async fn handle_state(&self, axes: &[char]) -> Reply {
        let mut busy = false;
        for axis in self.select(axes) {
            match axis.move_status().await {
                Ok(state) => busy |= !state.is_idle(),
                Err(e) => {
                    warn!("State query for axis {} failed: {}", axis.slot(), e);
                    return Reply::bad(format!("{}: {}", axis.slot(), e));
                }
            }
        }
        Reply::ok_with(if busy { "BUSY" } else { "IDLE" })
    }

    async fn handle_stop(&self, axes: &[char]) -> Reply {
        let mut reply = Reply::ok();
        for axis in self.select(axes) {
            let result = axis.stop().await;
            Self::record(&mut reply, axis, "stop", result);
        }
        // a failed stop is logged and listed, never a failed command
        reply.force_ok()
    }

    async fn handle_home(&self, axes: &[char]) -> Reply {
        let wait = self.config.wait_policy();
        let mut reply = Reply::ok();
        for axis in self.select(axes) {
            info!("Homing axis {} ({})", axis.slot(), axis.name());
            let result = axis.home(&wait).await;
            Self::record(&mut reply, axis, "home", result);
        }
        reply
    }

    async fn wait_for_idle(&self, slots: &[char]) -> Result<(), AxisError> {
        let wait = self.config.wait_policy();
        let axes = self.select(slots);

        let polling = async {
            tokio::time::sleep(wait.settle_delay).await;
            loop {
                let mut all_idle = true;
                for axis in &axes {
                    if !axis.move_status().await?.is_idle() {
                        all_idle = false;
                        break;
                    }
                }
                if all_idle {
                    return Ok::<(), AxisError>(());
                }
                tokio::time::sleep(wait.poll_interval).await;
            }
        };

        match tokio::time::timeout(wait.max_wait, polling).await {
            Ok(result) => result,
            Err(_) => Err(AxisError::Timeout(wait.max_wait)),
        }
    }

    async fn publish_status(&self) {
        let Some(broadcast) = &self.broadcast else {
            return;
        };

        let mut parts = Vec::with_capacity(self.registry.len());
        for axis in self.registry.iter() {
            match axis.status().await {
                Ok(status) => parts.push(format!(
                    "{}={}",
                    axis.slot(),
                    status.describe(axis.units())
                )),
                Err(_) => parts.push(format!("{}=BAD", axis.slot())),
            }
        }
        let payload = format!(
            "{} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            parts.join("; ")
        );

        if let Err(e) = broadcast.try_send(payload) {
            debug!("Status broadcast dropped: {}", e);
        }
    }

    fn respond(&self, connection: ConnectionId, text: String) {
        if self.responses.send(Response::new(connection, text)).is_err() {
            warn!("Response queue closed, reply to {} dropped", connection);
        }
    }

    fn select(&self, slots: &[char]) -> Vec<&Axis> {
        if slots.is_empty() {
            return self.registry.iter().collect();
        }
        slots.iter().filter_map(|s| self.registry.get(*s)).collect()
    }

    fn select_targets(&self, targets: &[(char, f64)]) -> Vec<(&Axis, f64)> {
        targets
            .iter()
            .filter_map(|(slot, value)| self.registry.get(*slot).map(|axis| (axis, *value)))
            .collect()
    }

    fn record<T>(reply: &mut Reply, axis: &Axis, operation: &str, result: Result<T, AxisError>) {
        match result {
            Ok(_) => reply.push_detail(axis.slot(), "OK"),
            Err(e) => {
                warn!("{} on axis {} failed: {}", operation, axis.slot(), e);
                reply.push_failure(axis.slot(), e);
            }
        }
    }
}
