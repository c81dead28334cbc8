//! Single-outstanding-command state machine per transport home id.
//!
//! Controller commands (include, exclude, remove failed node) run for a long
//! time on the engine and report progress through controller-state
//! notifications that carry no call-site token. The correlator keeps at most
//! one [`PendingCommand`] per home id and attributes every controller-state
//! notification for that home id to it.
//!
//! ```text
//! Idle ─issue─▶ Issued ─Starting/InProgress/Sleeping─▶ InProgress
//!                 │                                       │
//!                 └──────────Waiting/Normal───────────────┴─▶ WaitingForUser
//!                                                              (reply: Ok)
//! any ─Completed─▶ Idle        any ─Error/Failed─▶ Idle (reply: BackendError)
//! ```
//!
//! On legacy engines the notification never names the command, so the kind
//! stored in the pending command is used instead.

use std::collections::HashMap;

use crate::domain::NetworkId;
use crate::domain::reply::{self, CommandReply, ReplyResolver, ReplyResult};
use crate::error::{GatewayError, TransportError};
use crate::transport::{ControllerCommand, ControllerState, ProtocolVariant};

/// Controller command kinds the gateway issues or tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Node inclusion.
    AddDevice,
    /// Node exclusion.
    RemoveDevice,
    /// Removal of a node from the failed-node list.
    RemoveFailedNode,
    /// Anything else the engine reports.
    Other,
}

impl From<ControllerCommand> for CommandKind {
    fn from(command: ControllerCommand) -> Self {
        match command {
            ControllerCommand::AddDevice => Self::AddDevice,
            ControllerCommand::RemoveDevice => Self::RemoveDevice,
            ControllerCommand::RemoveFailedNode => Self::RemoveFailedNode,
            _ => Self::Other,
        }
    }
}

/// Non-terminal phase of a pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    /// Accepted by the engine, no progress seen yet.
    Issued,
    /// The engine is working on it.
    InProgress,
    /// The reply was resolved; the controller waits for a physical action.
    WaitingForUser,
}

/// The outstanding controller command on one home id.
#[derive(Debug)]
pub struct PendingCommand {
    kind: CommandKind,
    phase: CommandPhase,
    reply: Option<ReplyResolver>,
}

impl PendingCommand {
    /// Kind of the command; also the correlation fallback on legacy engines.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CommandPhase {
        self.phase
    }

    /// Whether the reply is still unresolved.
    #[must_use]
    pub const fn awaiting_reply(&self) -> bool {
        self.reply.is_some()
    }

    fn resolve(&mut self, result: ReplyResult) {
        if let Some(resolver) = self.reply.take() {
            resolver.resolve(result);
        }
    }
}

/// Level-signal change produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingSignal {
    /// Waiting for node addition turned on or off.
    Addition(bool),
    /// Waiting for node removal turned on or off.
    Removal(bool),
}

impl WaitingSignal {
    fn on(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::AddDevice => Some(Self::Addition(true)),
            CommandKind::RemoveDevice => Some(Self::Removal(true)),
            CommandKind::RemoveFailedNode | CommandKind::Other => None,
        }
    }

    fn off(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::AddDevice => Some(Self::Addition(false)),
            CommandKind::RemoveDevice => Some(Self::Removal(false)),
            CommandKind::RemoveFailedNode | CommandKind::Other => None,
        }
    }
}

/// Tracks pending controller commands keyed by home id.
#[derive(Debug, Default)]
pub struct CommandCorrelator {
    pending: HashMap<u32, PendingCommand>,
}

impl CommandCorrelator {
    /// Creates a correlator with no pending commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a controller command through `call` unless one is already
    /// outstanding on `home_id`.
    ///
    /// The returned reply is resolved immediately with
    /// [`GatewayError::CommandInUse`] (without calling `call`) or with
    /// [`GatewayError::BackendError`] if `call` fails; in both cases no
    /// pending command is recorded. Otherwise it stays pending until a
    /// controller-state notification resolves it.
    pub fn issue<F>(
        &mut self,
        network_id: NetworkId,
        home_id: u32,
        kind: CommandKind,
        call: F,
    ) -> CommandReply
    where
        F: FnOnce() -> Result<(), TransportError>,
    {
        if self.pending.contains_key(&home_id) {
            tracing::debug!(%network_id, home_id, ?kind, "controller command already in progress");
            return reply::resolved(Err(GatewayError::CommandInUse(network_id)));
        }
        if let Err(err) = call() {
            tracing::warn!(%network_id, home_id, ?kind, error = %err, "controller command rejected");
            return reply::resolved(Err(err.into()));
        }

        let (resolver, command_reply) = reply::reply_pair();
        self.pending.insert(
            home_id,
            PendingCommand {
                kind,
                phase: CommandPhase::Issued,
                reply: Some(resolver),
            },
        );
        command_reply
    }

    /// Applies a controller-state notification and returns the level
    /// signals to emit.
    pub fn on_controller_state(
        &mut self,
        home_id: u32,
        reported: ControllerCommand,
        state: ControllerState,
        variant: ProtocolVariant,
    ) -> Vec<WaitingSignal> {
        let kind = match variant {
            ProtocolVariant::Modern => CommandKind::from(reported),
            ProtocolVariant::Legacy => self
                .pending
                .get(&home_id)
                .map_or(CommandKind::Other, PendingCommand::kind),
        };
        tracing::debug!(home_id, ?reported, ?kind, ?state, "controller command state");

        let mut signals = Vec::new();
        match state {
            ControllerState::Error | ControllerState::Failed => {
                tracing::warn!(home_id, ?kind, ?state, "controller command failed");
                let error = GatewayError::BackendError(format!("{kind:?} ended in {state:?}"));
                if let Some(removed) = self.finish(home_id, Err(error)) {
                    signals.extend(Self::release(&removed));
                }
            }
            ControllerState::Waiting | ControllerState::Normal => match WaitingSignal::on(kind) {
                Some(signal) => {
                    tracing::info!(home_id, ?kind, "waiting for user action on device");
                    if let Some(pending) = self.pending.get_mut(&home_id) {
                        pending.resolve(Ok(()));
                        pending.phase = CommandPhase::WaitingForUser;
                    }
                    signals.push(signal);
                }
                None => self.progress(home_id),
            },
            ControllerState::Completed => {
                let removed = self.finish(home_id, Ok(()));
                if kind == CommandKind::Other {
                    // The engine sometimes completes an exclusion under a
                    // different command; nothing before a completion stays valid.
                    tracing::warn!(home_id, ?reported, "completion for unexpected controller command");
                    signals.push(WaitingSignal::Addition(false));
                    signals.push(WaitingSignal::Removal(false));
                } else {
                    tracing::info!(home_id, ?kind, "controller command completed");
                    signals.extend(WaitingSignal::off(kind));
                    if let Some(removed) = removed
                        && removed.kind != kind
                    {
                        signals.extend(Self::release(&removed));
                    }
                }
            }
            ControllerState::Cancel => {
                tracing::info!(home_id, ?kind, "controller command cancelled by engine");
                let removed = self.finish(home_id, Err(GatewayError::Cancelled));
                signals.extend(WaitingSignal::off(kind));
                if let Some(removed) = removed
                    && removed.kind != kind
                {
                    signals.extend(Self::release(&removed));
                }
            }
            ControllerState::NodeOk if kind == CommandKind::RemoveFailedNode => {
                tracing::warn!(home_id, "node responds, refusing to remove it as failed");
                let error = GatewayError::BackendError("node is not failed".to_string());
                let _ = self.finish(home_id, Err(error));
            }
            ControllerState::Starting
            | ControllerState::InProgress
            | ControllerState::Sleeping
            | ControllerState::NodeOk
            | ControllerState::NodeFailed => self.progress(home_id),
        }
        signals
    }

    /// Drops the pending command on `home_id` after the engine acknowledged
    /// a cancel. An unresolved reply resolves with
    /// [`GatewayError::Cancelled`].
    pub fn cancel(&mut self, home_id: u32) -> Vec<WaitingSignal> {
        self.finish(home_id, Err(GatewayError::Cancelled))
            .map(|removed| Self::release(&removed).into_iter().collect())
            .unwrap_or_default()
    }

    /// Fails the pending command on `home_id` because the network went away
    /// or is being reset.
    pub fn abandon(&mut self, home_id: u32, reason: &str) -> Vec<WaitingSignal> {
        self.finish(home_id, Err(GatewayError::BackendError(reason.to_string())))
            .map(|removed| Self::release(&removed).into_iter().collect())
            .unwrap_or_default()
    }

    /// Returns the pending command on `home_id`.
    #[must_use]
    pub fn pending(&self, home_id: u32) -> Option<&PendingCommand> {
        self.pending.get(&home_id)
    }

    /// Returns `true` if a command is outstanding on `home_id`.
    #[must_use]
    pub fn is_busy(&self, home_id: u32) -> bool {
        self.pending.contains_key(&home_id)
    }

    fn progress(&mut self, home_id: u32) {
        if let Some(pending) = self.pending.get_mut(&home_id)
            && pending.phase == CommandPhase::Issued
        {
            pending.phase = CommandPhase::InProgress;
        }
    }

    /// Removes the pending command, resolving its reply if still open.
    fn finish(&mut self, home_id: u32, result: ReplyResult) -> Option<PendingCommand> {
        let mut removed = self.pending.remove(&home_id)?;
        removed.resolve(result);
        Some(removed)
    }

    /// Signal that turns off whatever level signal `removed` raised.
    fn release(removed: &PendingCommand) -> Option<WaitingSignal> {
        if removed.phase == CommandPhase::WaitingForUser {
            WaitingSignal::off(removed.kind)
        } else {
            None
        }
    }
}
