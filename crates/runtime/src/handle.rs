//! Cloneable façade for issuing requests to a running match.

use tokio::sync::{broadcast, mpsc, oneshot};

use skirmish_core::engine::{ApplyReport, ExecutionOutcome};
use skirmish_core::state::LogEntry;
use skirmish_core::{Command, Patch, State};

use crate::error::{Result, RuntimeError};
use crate::worker::{MatchEvent, Request};

/// Client-facing handle to a match worker.
///
/// Every request is serialized through the worker's queue, so handles can be
/// cloned freely across tasks without ever racing on the state.
#[derive(Clone)]
pub struct MatchHandle {
    request_tx: mpsc::Sender<Request>,
    event_tx: broadcast::Sender<MatchEvent>,
}

impl MatchHandle {
    pub(crate) fn new(
        request_tx: mpsc::Sender<Request>,
        event_tx: broadcast::Sender<MatchEvent>,
    ) -> Self {
        Self {
            request_tx,
            event_tx,
        }
    }

    /// Executes `command` atomically against the match state.
    pub async fn execute(&self, command: Command) -> Result<ExecutionOutcome> {
        self.request(|reply| Request::Execute { command, reply })
            .await?
    }

    /// Applies a raw patch stream.
    pub async fn apply(&self, patches: Vec<Patch>) -> Result<ApplyReport> {
        self.request(|reply| Request::Apply { patches, reply }).await
    }

    /// Query the current match state (read-only snapshot).
    pub async fn snapshot(&self) -> Result<State> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    /// SHA-256 digest of the current state.
    pub async fn digest(&self) -> Result<[u8; 32]> {
        self.request(|reply| Request::Digest { reply }).await?
    }

    /// The full log so far.
    pub async fn log(&self) -> Result<Vec<LogEntry>> {
        Ok(self.snapshot().await?.log)
    }

    /// The log as JSON lines, one entry per line.
    pub async fn export_log(&self) -> Result<String> {
        let mut out = String::new();
        for entry in self.log().await? {
            out.push_str(&serde_json::to_string(&entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Subscribe to events published after each applied request.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}
