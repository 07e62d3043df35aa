//! Runtime orchestration for a single skirmish match.
//!
//! One [`MatchWorker`] task owns the authoritative state and serializes every
//! request through a bounded queue. Clients talk to it through cloneable
//! [`MatchHandle`]s and observe progress through [`MatchEvent`] broadcasts.
//!
//! - [`runtime`] hosts the orchestrator and builder
//! - [`config`] loads match setup from TOML
//! - [`handle`] and [`worker`] are the two ends of the request channel
pub mod config;
pub mod error;
pub mod handle;
pub mod runtime;
pub mod worker;

pub use config::{BoardConfig, CombatantConfig, MatchConfig};
pub use error::{Result, RuntimeError};
pub use handle::MatchHandle;
pub use runtime::{MatchRuntime, MatchRuntimeBuilder};
pub use worker::{MatchEvent, MatchWorker};
