//! Projections of the live effect set onto action slots and combat flags.

use bitflags::bitflags;

use crate::state::{ActionPool, ActorId, ConditionId, State};

bitflags! {
    /// Movement and combat modifiers derived from an actor's conditions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CombatFlags: u8 {
        /// Cannot walk, run or shift.
        const SPEED0       = 1 << 0;
        /// Movement budget capped at the slow limit.
        const SLOW_CAP2    = 1 << 1;
        const CANNOT_SHIFT = 1 << 2;
        /// Halves damage dealt.
        const WEAKENED     = 1 << 3;
        /// Attackers gain combat advantage against this actor.
        const GRANT_CA     = 1 << 4;
        /// This actor has combat advantage against everyone.
        const HAS_CA       = 1 << 5;
    }
}

/// Flags contributed by a single condition.
pub const fn condition_flags(condition: ConditionId) -> CombatFlags {
    match condition {
        ConditionId::Immobilized | ConditionId::Grabbed => CombatFlags::SPEED0,
        ConditionId::Restrained => CombatFlags::SPEED0
            .union(CombatFlags::CANNOT_SHIFT)
            .union(CombatFlags::GRANT_CA),
        ConditionId::Slowed => CombatFlags::SLOW_CAP2,
        ConditionId::Weakened => CombatFlags::WEAKENED,
        ConditionId::Blinded
        | ConditionId::Prone
        | ConditionId::Dazed
        | ConditionId::Stunned
        | ConditionId::Dominated => CombatFlags::GRANT_CA,
        ConditionId::Unconscious => CombatFlags::SPEED0.union(CombatFlags::GRANT_CA),
        ConditionId::Invisible => CombatFlags::HAS_CA,
        ConditionId::Marked
        | ConditionId::OngoingDamage
        | ConditionId::Deafened
        | ConditionId::Pushed => CombatFlags::empty(),
    }
}

/// Upper bound on the action pool imposed by a single condition.
pub const fn condition_mask(condition: ConditionId) -> ActionPool {
    match condition {
        ConditionId::Dazed | ConditionId::Dominated => ActionPool {
            standard: 1,
            move_: 0,
            minor: 0,
            immediate_used_this_round: false,
        },
        ConditionId::Stunned | ConditionId::Unconscious => ActionPool::EMPTY,
        ConditionId::Immobilized
        | ConditionId::Restrained
        | ConditionId::Slowed
        | ConditionId::Weakened
        | ConditionId::Blinded
        | ConditionId::Prone
        | ConditionId::Invisible
        | ConditionId::Marked
        | ConditionId::OngoingDamage
        | ConditionId::Grabbed
        | ConditionId::Deafened
        | ConditionId::Pushed => ActionPool::FULL,
    }
}

pub fn compute_flags(state: &State, actor: &ActorId) -> CombatFlags {
    state
        .effects_on(actor)
        .fold(CombatFlags::empty(), |flags, effect| {
            flags | condition_flags(effect.condition)
        })
}

/// Per-slot minimum of the full pool and every condition's cap.
pub fn compute_action_mask(state: &State, actor: &ActorId) -> ActionPool {
    state
        .effects_on(actor)
        .map(|effect| condition_mask(effect.condition))
        .fold(ActionPool::FULL, |mask, cap| intersect(&mask, &cap))
}

/// Slot-wise minimum. The immediate flag is carried from `pool`.
pub fn intersect(pool: &ActionPool, mask: &ActionPool) -> ActionPool {
    ActionPool {
        standard: pool.standard.min(mask.standard),
        move_: pool.move_.min(mask.move_),
        minor: pool.minor.min(mask.minor),
        immediate_used_this_round: pool.immediate_used_this_round,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_condition_has_a_consistent_projection() {
        for condition in ConditionId::iter() {
            let mask = condition_mask(condition);
            assert!(mask.standard <= 1 && mask.move_ <= 1 && mask.minor <= 1);
            let flags = condition_flags(condition);
            if flags.contains(CombatFlags::CANNOT_SHIFT) {
                assert!(flags.contains(CombatFlags::SPEED0), "{condition}");
            }
        }
    }

    #[test]
    fn dazed_allows_only_a_standard_action() {
        let mask = condition_mask(ConditionId::Dazed);
        assert_eq!((mask.standard, mask.move_, mask.minor), (1, 0, 0));
        assert_eq!(intersect(&ActionPool::FULL, &mask).minor, 0);
    }

    #[test]
    fn restrained_pins_and_exposes() {
        let flags = condition_flags(ConditionId::Restrained);
        assert!(flags.contains(CombatFlags::SPEED0 | CombatFlags::CANNOT_SHIFT | CombatFlags::GRANT_CA));
        assert!(!flags.contains(CombatFlags::HAS_CA));
    }
}
