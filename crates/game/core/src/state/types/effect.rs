use super::{ActorId, DamageType, EffectId};

/// Every condition the rules engine knows about.
///
/// The list is closed on purpose: action masks and combat flags are computed
/// with exhaustive matches, so adding a variant forces every consumer to
/// decide what it means.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum ConditionId {
    Dazed,
    Stunned,
    Immobilized,
    Restrained,
    Slowed,
    Weakened,
    Blinded,
    Prone,
    Invisible,
    Marked,
    OngoingDamage,
    Grabbed,
    Unconscious,
    Dominated,
    Deafened,
    Pushed,
}

/// When an effect instance ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[strum(serialize_all = "camelCase")]
pub enum Duration {
    /// Save at the end of each of the target's turns.
    SaveEnds,
    /// Ends at the end of the source's next turn.
    EndOfSourceNext,
    /// Ends at the start of the source's next turn.
    StartOfSourceNext,
    /// Ends at the start of the owner's next turn (owner defaults to target).
    UntilStartOfTurn,
    /// Ends at the end of the owner's next turn (owner defaults to target).
    UntilEndOfTurn,
    /// Lasts the whole encounter unless it must be sustained.
    Encounter,
}

/// Condition-specific payload.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectData {
    /// Ongoing damage per tick.
    pub amount: Option<i32>,
    pub damage_type: Option<DamageType>,
    /// Squares of forced movement carried by the condition.
    pub squares: Option<u32>,
    /// Requires a sustain each round or it ends at the target's end of turn.
    pub sustain: bool,
    /// Overrides the target as the reference actor for `until*` durations.
    pub owner: Option<ActorId>,
    /// Marking actor for `marked`.
    pub by: Option<ActorId>,
}

impl EffectData {
    pub fn ongoing(amount: i32, damage_type: DamageType) -> Self {
        Self {
            amount: Some(amount),
            damage_type: Some(damage_type),
            ..Self::default()
        }
    }

    pub fn sustained() -> Self {
        Self {
            sustain: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectMeta {
    /// Last round in which the effect was sustained.
    pub sustained_round: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppliedAt {
    pub round: u32,
    pub turn_actor: Option<ActorId>,
}

/// A live condition on one target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectInstance {
    pub id: EffectId,
    pub condition: ConditionId,
    pub source: ActorId,
    pub target: ActorId,
    pub duration: Duration,
    pub applied_at: AppliedAt,
    pub data: EffectData,
    pub meta: EffectMeta,
}

impl EffectInstance {
    /// Reference actor for `untilStartOfTurn` / `untilEndOfTurn`.
    pub fn owner(&self) -> &ActorId {
        self.data.owner.as_ref().unwrap_or(&self.target)
    }

    pub fn involves(&self, actor: &ActorId) -> bool {
        &self.source == actor || &self.target == actor
    }
}
