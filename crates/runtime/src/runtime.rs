//! Match orchestrator.
//!
//! Spawns the worker, wires up request and event channels, and exposes a
//! builder so hosts can pick the starting state, rules and power catalog.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use skirmish_content::PowerCatalog;
use skirmish_core::{PowerOracle, RulesConfig, State};

use crate::config::MatchConfig;
use crate::error::{Result, RuntimeError};
use crate::handle::MatchHandle;
use crate::worker::{MatchEvent, MatchWorker};

/// A running match.
pub struct MatchRuntime {
    handle: MatchHandle,
    worker: JoinHandle<()>,
}

impl MatchRuntime {
    pub fn builder() -> MatchRuntimeBuilder {
        MatchRuntimeBuilder::default()
    }

    /// Get a cloneable handle to this match.
    pub fn handle(&self) -> MatchHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.handle.subscribe()
    }

    /// Drops this runtime's handle and waits for the worker to drain.
    ///
    /// The worker keeps serving while any cloned handle is alive.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`MatchRuntime`].
#[derive(Default)]
pub struct MatchRuntimeBuilder {
    config: MatchConfig,
    rules: Option<RulesConfig>,
    state: Option<State>,
    powers: Option<Arc<dyn PowerOracle>>,
}

impl MatchRuntimeBuilder {
    pub fn config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rules(mut self, rules: RulesConfig) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Start from `state` instead of building one from the config roster.
    pub fn initial_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn powers(mut self, powers: impl PowerOracle + 'static) -> Self {
        self.powers = Some(Arc::new(powers));
        self
    }

    /// Spawns the worker. Must be called inside a tokio runtime.
    pub fn build(self) -> MatchRuntime {
        let state = match self.state {
            Some(state) => match self.rules {
                Some(rules) => state.with_rules(rules),
                None => state,
            },
            None => self
                .config
                .initial_state(self.rules.unwrap_or_default()),
        };
        let powers = self
            .powers
            .unwrap_or_else(|| Arc::new(PowerCatalog::builtin()));

        let (request_tx, request_rx) = mpsc::channel(self.config.command_buffer_size.max(1));
        let (event_tx, _event_rx) = broadcast::channel(self.config.event_buffer_size.max(1));

        let handle = MatchHandle::new(request_tx, event_tx.clone());
        let worker = MatchWorker::new(state, powers, request_rx, event_tx);

        info!(seed = self.config.seed, "match started");
        let worker = tokio::spawn(async move {
            worker.run().await;
        });

        MatchRuntime { handle, worker }
    }
}
