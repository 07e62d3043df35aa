//! Match worker that owns the authoritative [`State`].
//!
//! Receives requests from [`MatchHandle`](crate::MatchHandle), runs them
//! through [`GameEngine`] one at a time, and broadcasts every new log entry
//! after the batch it belongs to has been applied.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use skirmish_core::engine::{ApplyReport, ExecutionOutcome};
use skirmish_core::state::LogEntry;
use skirmish_core::{Command, Env, GameEngine, GameError, Patch, PowerOracle, State};

use crate::error::{Result, RuntimeError};

/// Requests the worker serves.
pub enum Request {
    Execute {
        command: Command,
        reply: oneshot::Sender<Result<ExecutionOutcome>>,
    },
    /// Applies raw patches, e.g. a recorded stream from another authority.
    Apply {
        patches: Vec<Patch>,
        reply: oneshot::Sender<ApplyReport>,
    },
    Snapshot {
        reply: oneshot::Sender<State>,
    },
    Digest {
        reply: oneshot::Sender<Result<[u8; 32]>>,
    },
}

/// Events published after each request that changed the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MatchEvent {
    Logged(LogEntry),
    /// A command was applied; counts come from the reducer.
    Applied {
        command: &'static str,
        applied: usize,
        skipped: usize,
    },
    Rejected {
        command: &'static str,
        reason: String,
    },
}

pub struct MatchWorker {
    state: State,
    powers: Arc<dyn PowerOracle>,
    request_rx: mpsc::Receiver<Request>,
    event_tx: broadcast::Sender<MatchEvent>,
}

impl MatchWorker {
    pub fn new(
        state: State,
        powers: Arc<dyn PowerOracle>,
        request_rx: mpsc::Receiver<Request>,
        event_tx: broadcast::Sender<MatchEvent>,
    ) -> Self {
        info!(
            actors = state.actors.len(),
            powers = powers.power_ids().len(),
            "match worker initialized"
        );
        Self {
            state,
            powers,
            request_rx,
            event_tx,
        }
    }

    /// Serves requests until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            self.handle_request(request);
        }
        debug!(round = self.state.round, "match worker stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Execute { command, reply } => {
                let result = self.execute(&command);
                if reply.send(result).is_err() {
                    debug!("Execute reply channel closed (caller dropped)");
                }
            }
            Request::Apply { patches, reply } => {
                let report = self.apply(&patches);
                if reply.send(report).is_err() {
                    debug!("Apply reply channel closed (caller dropped)");
                }
            }
            Request::Snapshot { reply } => {
                if reply.send(self.state.clone()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
            Request::Digest { reply } => {
                let digest = self.state.digest().map_err(RuntimeError::Digest);
                if reply.send(digest).is_err() {
                    debug!("Digest reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn execute(&mut self, command: &Command) -> Result<ExecutionOutcome> {
        let log_start = self.state.log.len();
        let env = Env::with_powers(self.powers.as_ref());
        let outcome = GameEngine::new(&mut self.state).execute(&env, command);

        match &outcome {
            Ok(outcome) => {
                if outcome.report.skipped > 0 {
                    warn!(
                        command = command.name(),
                        skipped = outcome.report.skipped,
                        "command produced patches the reducer skipped"
                    );
                }
                self.publish_log_since(log_start);
                self.publish(MatchEvent::Applied {
                    command: command.name(),
                    applied: outcome.report.applied,
                    skipped: outcome.report.skipped,
                });
            }
            Err(error) => {
                let severity = error.severity();
                if severity.is_internal() {
                    warn!(command = command.name(), code = error.error_code(), %error, "command rejected");
                } else {
                    debug!(command = command.name(), severity = severity.as_str(), %error, "command rejected");
                }
                self.publish(MatchEvent::Rejected {
                    command: command.name(),
                    reason: error.to_string(),
                });
            }
        }
        outcome.map_err(RuntimeError::from)
    }

    fn apply(&mut self, patches: &[Patch]) -> ApplyReport {
        let log_start = self.state.log.len();
        let report = GameEngine::new(&mut self.state).apply(patches);
        self.publish_log_since(log_start);
        self.publish(MatchEvent::Applied {
            command: "apply",
            applied: report.applied,
            skipped: report.skipped,
        });
        report
    }

    fn publish_log_since(&self, start: usize) {
        for entry in &self.state.log[start..] {
            self.publish(MatchEvent::Logged(entry.clone()));
        }
    }

    fn publish(&self, event: MatchEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }
}
