use super::{ActorId, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "kebab-case")]
pub enum ReactiveKind {
    Opportunity,
    Interrupt,
    Reaction,
}

/// What opened a reactive window.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReactiveTrigger {
    /// Left a threatened square while moving.
    Movement {
        mover: ActorId,
        from: Position,
        to: Position,
    },
    /// Made a ranged or area attack while adjacent to an enemy.
    RangedAttack { attacker: ActorId },
    /// An attack hit, before damage.
    Hit { attacker: ActorId, defender: ActorId },
    /// Damage from an attack was applied.
    Damaged { attacker: ActorId, defender: ActorId },
}

impl ReactiveTrigger {
    /// The actor whose action provoked the window.
    pub fn provoker(&self) -> &ActorId {
        match self {
            Self::Movement { mover, .. } => mover,
            Self::RangedAttack { attacker }
            | Self::Hit { attacker, .. }
            | Self::Damaged { attacker, .. } => attacker,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReactiveStatus {
    Open,
    Resolved,
}

/// An open (or resolved) opportunity, interrupt or reaction window.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReactiveEvent {
    pub id: u64,
    pub kind: ReactiveKind,
    pub trigger: ReactiveTrigger,
    pub eligible: Vec<ActorId>,
    pub status: ReactiveStatus,
}

impl ReactiveEvent {
    pub fn is_open(&self) -> bool {
        self.status == ReactiveStatus::Open
    }
}
