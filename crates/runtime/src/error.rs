//! Error types surfaced by the match runtime.

use thiserror::Error;
use tokio::sync::oneshot;

use skirmish_core::engine::CommandError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("match worker command channel closed")]
    CommandChannelClosed,

    #[error("match worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("match worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to hash match state")]
    Digest(#[source] bincode::Error),

    #[error("invalid match config")]
    Config(#[from] toml::de::Error),

    #[error("failed to export match log")]
    Export(#[from] serde_json::Error),

    #[error("failed to write match log")]
    Io(#[from] std::io::Error),
}
