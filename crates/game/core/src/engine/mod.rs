//! Command execution and the patch reducer.
//!
//! The [`GameEngine`] is the only authority over a [`State`]. Every rules
//! function proposes patches against a shared borrow; the engine applies
//! them, so a command either lands whole or, when it fails validation,
//! leaves the state untouched.
//!
//! Commands that fail for expected domain reasons inside the rules (an
//! exhausted action pool, a reused encounter power, a denied reaction) still
//! succeed here: their outcome is a log-only patch list. `CommandError` is
//! reserved for requests the engine cannot turn into patches at all.

mod proposal;
mod reducer;
pub mod turns;

pub use proposal::Proposal;
pub use reducer::{ApplyReport, PatchError, apply_patch, apply_patches, replay};
pub use turns::{
    ActionUnavailable, SpendPlan, TurnError, advance_turn, can_spend_action, delay_turn,
    plan_spend, ready_action, set_initiative_order, spend_action,
};

use tracing::debug;

use crate::action::{PowerOptions, execute_power};
use crate::combat::{
    AttackContext, AttackOptions, AttackSpec, HitOutcome, apply_damage, build_attack_preview,
    resolve_attack_multi, resolve_interrupt, resolve_opportunity, resolve_reaction,
};
use crate::effects::{apply_condition, remove_condition, saving_throw, sustain_effect};
use crate::env::{Env, OracleError};
use crate::error::{ErrorSeverity, GameError};
use crate::healing::{HealOptions, apply_healing, death_save, gain_temp_hp, second_wind, stabilize};
use crate::state::{
    ActionKind, ActorId, ConditionId, DamageType, Duration, EffectData, EffectId, Patch, Position,
    State,
};
use crate::tactics::{
    MoveError, MoveMode, MovePlan, TargetChoices, TargetPreview, TargetingErrors,
    build_move_preview_log, build_target_preview_log, commit_move, preview_move,
    preview_targeting, pull, push, slide, stage_targeting_selection, stand_up,
};

/// A request against the encounter.
#[derive(Clone, Debug, PartialEq, Eq, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "command", rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    SetInitiative {
        order: Vec<ActorId>,
    },
    AdvanceTurn,
    SpendAction {
        kind: ActionKind,
    },
    Delay {
        actor: ActorId,
    },
    Ready {
        actor: ActorId,
        trigger: String,
    },
    PreviewMove {
        actor: ActorId,
        to: Position,
        mode: MoveMode,
    },
    /// Walk, run or shift on the actor's own turn, paying a move action.
    Move {
        actor: ActorId,
        to: Position,
        mode: MoveMode,
    },
    StandUp {
        actor: ActorId,
    },
    PreviewAttack {
        attacker: ActorId,
        defender: ActorId,
        spec: AttackSpec,
    },
    /// Raw attack resolution; spends nothing.
    Attack {
        attacker: ActorId,
        defenders: Vec<ActorId>,
        spec: AttackSpec,
        #[cfg_attr(feature = "serde", serde(default))]
        options: AttackOptions,
    },
    Damage {
        actor: ActorId,
        amount: i32,
        #[cfg_attr(feature = "serde", serde(default))]
        damage_type: DamageType,
    },
    Heal {
        actor: ActorId,
        amount: i32,
        #[cfg_attr(feature = "serde", serde(default))]
        options: HealOptions,
    },
    GainTempHp {
        actor: ActorId,
        amount: i32,
    },
    ApplyCondition {
        condition: ConditionId,
        source: ActorId,
        target: ActorId,
        duration: Duration,
        #[cfg_attr(feature = "serde", serde(default))]
        data: EffectData,
    },
    RemoveCondition {
        effect: EffectId,
    },
    SavingThrow {
        effect: EffectId,
        force_d20: Option<i32>,
    },
    SustainEffect {
        effect: EffectId,
    },
    Push {
        source: ActorId,
        target: ActorId,
        squares: u32,
    },
    Pull {
        source: ActorId,
        target: ActorId,
        squares: u32,
    },
    /// Slides `target` one square at a time towards `toward`.
    Slide {
        source: ActorId,
        target: ActorId,
        squares: u32,
        toward: Position,
    },
    SecondWind {
        actor: ActorId,
    },
    DeathSave {
        actor: ActorId,
        force_d20: Option<i32>,
    },
    Stabilize {
        target: ActorId,
        healer: ActorId,
        force_d20: Option<i32>,
    },
    PreviewTargeting {
        actor: ActorId,
        power: String,
        #[cfg_attr(feature = "serde", serde(default))]
        choices: TargetChoices,
    },
    StageTargeting {
        actor: ActorId,
        power: String,
        #[cfg_attr(feature = "serde", serde(default))]
        choices: TargetChoices,
        targets: Vec<ActorId>,
    },
    /// Uses a power from the content repository. Without explicit targets
    /// the actor's staged selection is used and then cleared.
    UsePower {
        actor: ActorId,
        power: String,
        targets: Option<Vec<ActorId>>,
        #[cfg_attr(feature = "serde", serde(default))]
        options: PowerOptions,
    },
    OpportunityAttack {
        actor: ActorId,
        event: u64,
        #[cfg_attr(feature = "serde", serde(default))]
        options: AttackOptions,
    },
    Interrupt {
        actor: ActorId,
        event: u64,
    },
    Reaction {
        actor: ActorId,
        event: u64,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Command-specific result returned alongside the applied patches.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum CommandResult {
    #[default]
    None,
    Move(MovePlan),
    Targeting(TargetPreview),
    Attacks(Vec<(ActorId, HitOutcome)>),
    Save { d20: i32, success: bool },
}

/// Patches a command produced, how the reducer took them, and any result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub patches: Vec<Patch>,
    pub report: ApplyReport,
    pub result: CommandResult,
}

/// Requests the engine cannot turn into patches.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("actor {0} not found")]
    UnknownActor(ActorId),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Targeting(#[from] TargetingErrors),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GameError for CommandError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownActor(_) | Self::Targeting(_) => ErrorSeverity::Validation,
            Self::Turn(inner) => inner.severity(),
            Self::Move(inner) => inner.severity(),
            Self::Oracle(inner) => inner.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownActor(_) => "COMMAND_UNKNOWN_ACTOR",
            Self::Targeting(_) => "COMMAND_INVALID_TARGETS",
            Self::Turn(inner) => inner.error_code(),
            Self::Move(inner) => inner.error_code(),
            Self::Oracle(inner) => inner.error_code(),
        }
    }
}

/// Applies commands to one encounter.
pub struct GameEngine<'a> {
    state: &'a mut State,
}

impl<'a> GameEngine<'a> {
    pub fn new(state: &'a mut State) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &State {
        &*self.state
    }

    /// Applies an externally built patch list.
    pub fn apply(&mut self, patches: &[Patch]) -> ApplyReport {
        apply_patches(self.state, patches)
    }

    /// Proposes `command` against the current state and applies the result.
    pub fn execute(
        &mut self,
        env: &Env<'_>,
        command: &Command,
    ) -> Result<ExecutionOutcome, CommandError> {
        let (patches, result) = self.propose(env, command)?;
        let report = apply_patches(self.state, &patches);
        debug!(
            command = command.name(),
            applied = report.applied,
            skipped = report.skipped,
            "command applied"
        );
        Ok(ExecutionOutcome {
            patches,
            report,
            result,
        })
    }

    fn propose(
        &self,
        env: &Env<'_>,
        command: &Command,
    ) -> Result<(Vec<Patch>, CommandResult), CommandError> {
        let state: &State = &*self.state;
        let none = |patches: Vec<Patch>| (patches, CommandResult::None);
        let proposed = match command {
            Command::SetInitiative { order } => none(set_initiative_order(state, order.clone())?),
            Command::AdvanceTurn => none(advance_turn(state)?),
            Command::SpendAction { kind } => none(spend_action(state, *kind)),
            Command::Delay { actor } => none(delay_turn(state, actor)?),
            Command::Ready { actor, trigger } => {
                none(ready_action(state, actor, trigger.clone())?)
            }
            Command::PreviewMove { actor, to, mode } => {
                let preview = preview_move(state, actor, *to, *mode);
                let log = build_move_preview_log(actor, &preview, *mode);
                let result = preview.map_or(CommandResult::None, CommandResult::Move);
                (vec![log], result)
            }
            Command::Move { actor, to, mode } => {
                require_turn(state, actor)?;
                let plan = preview_move(state, actor, *to, *mode)?;
                plan_spend(state, ActionKind::Move).map_err(|_| MoveError::NoMoveAction)?;
                let mut proposal = Proposal::begin(state);
                proposal.extend(spend_action(state, ActionKind::Move));
                let committed = commit_move(proposal.state(), &plan)?;
                proposal.extend(committed);
                (proposal.finish(), CommandResult::Move(plan))
            }
            Command::StandUp { actor } => {
                require_turn(state, actor)?;
                none(stand_up(state, actor)?)
            }
            Command::PreviewAttack {
                attacker,
                defender,
                spec,
            } => {
                require_actor(state, attacker)?;
                let ctx = AttackContext::new(attacker.clone(), defender.clone());
                none(vec![build_attack_preview(state, &ctx, spec)])
            }
            Command::Attack {
                attacker,
                defenders,
                spec,
                options,
            } => {
                require_actor(state, attacker)?;
                let Some(first) = defenders.first() else {
                    return Ok(none(Vec::new()));
                };
                let ctx = AttackContext::new(attacker.clone(), first.clone());
                let resolutions = resolve_attack_multi(state, &ctx, defenders, spec, options);
                let outcomes = resolutions
                    .iter()
                    .map(|r| (r.defender.clone(), r.outcome))
                    .collect();
                let patches = resolutions.into_iter().flat_map(|r| r.patches).collect();
                (patches, CommandResult::Attacks(outcomes))
            }
            Command::Damage {
                actor,
                amount,
                damage_type,
            } => none(apply_damage(state, actor, *amount, *damage_type)),
            Command::Heal {
                actor,
                amount,
                options,
            } => none(apply_healing(state, actor, *amount, *options)),
            Command::GainTempHp { actor, amount } => none(gain_temp_hp(state, actor, *amount)),
            Command::ApplyCondition {
                condition,
                source,
                target,
                duration,
                data,
            } => {
                require_actor(state, target)?;
                none(apply_condition(
                    state,
                    *condition,
                    source,
                    target,
                    *duration,
                    data.clone(),
                ))
            }
            Command::RemoveCondition { effect } => none(remove_condition(state, effect)),
            Command::SavingThrow { effect, force_d20 } => {
                match saving_throw(state, effect, *force_d20) {
                    Some(save) => (
                        save.patches,
                        CommandResult::Save {
                            d20: save.d20,
                            success: save.success,
                        },
                    ),
                    None => none(Vec::new()),
                }
            }
            Command::SustainEffect { effect } => none(sustain_effect(state, effect)),
            Command::Push {
                source,
                target,
                squares,
            } => none(push(state, source, target, *squares)),
            Command::Pull {
                source,
                target,
                squares,
            } => none(pull(state, source, target, *squares)),
            Command::Slide {
                source,
                target,
                squares,
                toward,
            } => {
                let toward = *toward;
                none(slide(state, Some(source), target, *squares, |_, options| {
                    options.iter().copied().min_by_key(|cell| cell.distance(toward))
                }))
            }
            Command::SecondWind { actor } => none(second_wind(state, actor)),
            Command::DeathSave { actor, force_d20 } => none(death_save(state, actor, *force_d20)),
            Command::Stabilize {
                target,
                healer,
                force_d20,
            } => none(stabilize(state, target, healer, *force_d20)),
            Command::PreviewTargeting {
                actor,
                power,
                choices,
            } => {
                let power = env.power(power)?;
                let preview =
                    preview_targeting(state, actor, &power.template, &power.targeting, choices);
                let log = build_target_preview_log(actor, &preview);
                (vec![log], CommandResult::Targeting(preview))
            }
            Command::StageTargeting {
                actor,
                power,
                choices,
                targets,
            } => {
                let power = env.power(power)?;
                none(stage_targeting_selection(
                    state,
                    actor,
                    &power.template,
                    &power.targeting,
                    choices,
                    targets,
                )?)
            }
            Command::UsePower {
                actor,
                power,
                targets,
                options,
            } => {
                let power = env.power(power)?;
                let staged = state.staging.as_deref().filter(|staged| staged.actor == *actor);
                let chosen: &[ActorId] = match (targets, staged) {
                    (Some(targets), _) => targets,
                    (None, Some(staged)) => &staged.targets,
                    (None, None) => &[],
                };
                let mut patches = execute_power(state, actor, power, chosen, options);
                if targets.is_none() && staged.is_some() {
                    patches.push(Patch::SetStaging { staging: None });
                }
                none(patches)
            }
            Command::OpportunityAttack {
                actor,
                event,
                options,
            } => none(resolve_opportunity(state, actor, *event, options)),
            Command::Interrupt { actor, event } => none(resolve_interrupt(state, actor, *event)),
            Command::Reaction { actor, event } => none(resolve_reaction(state, actor, *event)),
        };
        Ok(proposed)
    }
}

fn require_actor(state: &State, actor: &ActorId) -> Result<(), CommandError> {
    match state.actor(actor) {
        Some(_) => Ok(()),
        None => Err(CommandError::UnknownActor(actor.clone())),
    }
}

fn require_turn(state: &State, actor: &ActorId) -> Result<(), CommandError> {
    require_actor(state, actor)?;
    if state.current_actor() != Some(actor) {
        return Err(TurnError::NotYourTurn(actor.clone()).into());
    }
    Ok(())
}
