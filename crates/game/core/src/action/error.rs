//! Power-use errors.

use crate::error::{ErrorSeverity, GameError};
use crate::state::ActionKind;

/// Why a power cannot be used right now.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerError {
    #[error("actor not found")]
    ActorNotFound,

    #[error("actor is dead")]
    ActorDead,

    /// Dying actors take no actions.
    #[error("actor is dying")]
    ActorDying,

    #[error("not your turn")]
    NotYourTurn,

    #[error("no {0} action available")]
    NoAction(ActionKind),

    #[error("immediate action already used this round")]
    ImmediateUsed,

    #[error("opportunity action already used this turn")]
    OpportunityUsed,

    #[error("encounter power already used")]
    EncounterUsed,

    #[error("daily power already used")]
    DailyUsed,

    #[error("power requires targets")]
    RequiresTargets,
}

impl GameError for PowerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ActorNotFound | Self::RequiresTargets => ErrorSeverity::Validation,
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ActorNotFound => "POWER_ACTOR_NOT_FOUND",
            Self::ActorDead => "POWER_ACTOR_DEAD",
            Self::ActorDying => "POWER_ACTOR_DYING",
            Self::NotYourTurn => "POWER_NOT_YOUR_TURN",
            Self::NoAction(_) => "POWER_NO_ACTION",
            Self::ImmediateUsed => "POWER_IMMEDIATE_USED",
            Self::OpportunityUsed => "POWER_OPPORTUNITY_USED",
            Self::EncounterUsed => "POWER_ENCOUNTER_USED",
            Self::DailyUsed => "POWER_DAILY_USED",
            Self::RequiresTargets => "POWER_REQUIRES_TARGETS",
        }
    }
}
