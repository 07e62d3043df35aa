//! Template resolution and target discovery.
//!
//! [`preview_targeting`] never fails: validation problems come back as
//! [`TargetingError`] codes inside the preview. Staging a selection records it
//! on the state so a later power use can read it back.

use crate::state::{ActorId, LogData, LogKind, LogRecord, Patch, Position, State};

use super::los::has_line_of_effect;
use super::templates::{Cells, Facing, cells_for_blast, cells_for_burst};

const DEFAULT_RADIUS: u32 = 1;
const DEFAULT_SIZE: u32 = 3;
const DEFAULT_RANGE: u32 = 5;
const DEFAULT_REACH: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum TemplateKind {
    #[default]
    Single,
    Burst,
    Blast,
}

/// Where a template is anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum TemplateOrigin {
    /// The user itself ("personal").
    #[cfg_attr(feature = "serde", serde(rename = "self"))]
    #[strum(serialize = "self")]
    Personal,
    #[default]
    Melee,
    Ranged,
    /// A chosen point within range.
    Area,
    /// Centered on or projected from the user.
    Close,
}

impl TemplateOrigin {
    const fn uses_range(self) -> bool {
        matches!(self, Self::Ranged | Self::Area)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TemplateSpec {
    pub kind: TemplateKind,
    pub origin: TemplateOrigin,
    pub radius: Option<u32>,
    pub size: Option<u32>,
    pub range: Option<u32>,
    /// Melee reach for single-target templates.
    pub reach: Option<u32>,
    pub requires_loe_to_origin: Option<bool>,
}

impl TemplateSpec {
    pub fn single(origin: TemplateOrigin) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    pub fn burst(origin: TemplateOrigin, radius: u32) -> Self {
        Self {
            kind: TemplateKind::Burst,
            origin,
            radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn blast(size: u32) -> Self {
        Self {
            kind: TemplateKind::Blast,
            origin: TemplateOrigin::Close,
            size: Some(size),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: u32) -> Self {
        self.range = Some(range);
        self
    }

    /// Fills defaults: radius 1, size 3, range 5 for ranged and area origins.
    /// LoE to the origin is required by default only for ranged and area.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        match self.kind {
            TemplateKind::Burst => {
                self.radius.get_or_insert(DEFAULT_RADIUS);
            }
            TemplateKind::Blast => {
                self.size.get_or_insert(DEFAULT_SIZE);
            }
            TemplateKind::Single => {}
        }
        if self.origin.uses_range() {
            self.range.get_or_insert(DEFAULT_RANGE);
            self.requires_loe_to_origin = Some(self.requires_loe_to_origin != Some(false));
        } else {
            self.requires_loe_to_origin = Some(false);
        }
        self
    }

    pub fn validate(&self) -> Result<(), TargetingErrors> {
        let mut errors = Vec::new();
        if self.kind == TemplateKind::Burst && self.radius.is_none() {
            errors.push(TargetingError::RadiusRequired);
        }
        if self.kind == TemplateKind::Blast && self.size.is_none() {
            errors.push(TargetingError::SizeRequired);
        }
        if self.origin.uses_range() && self.range.is_none() {
            errors.push(TargetingError::RangeRequired);
        }
        TargetingErrors::check(errors)
    }

    fn requires_loe(&self) -> bool {
        self.requires_loe_to_origin.unwrap_or(false)
    }
}

/// Relationship a target must have to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum TargetWho {
    #[default]
    Any,
    Creatures,
    #[cfg_attr(feature = "serde", serde(rename = "self"))]
    #[strum(serialize = "self")]
    Personal,
    NotSelf,
    Enemies,
    Allies,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TargetFilter {
    pub who: TargetWho,
    pub min_targets: u32,
    pub max_targets: u32,
    pub include_self: bool,
}

impl TargetFilter {
    pub fn new(who: TargetWho) -> Self {
        Self {
            who,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn up_to(mut self, max_targets: u32) -> Self {
        self.max_targets = max_targets;
        self
    }

    /// Clamps `max_targets` to at least `min_targets`.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.max_targets = self.max_targets.max(self.min_targets);
        self
    }

    pub fn validate(&self) -> Result<(), TargetingErrors> {
        if self.max_targets < self.min_targets {
            return Err(TargetingErrors(vec![TargetingError::BadCounts]));
        }
        Ok(())
    }

    fn admits(&self, state: &State, user: &ActorId, candidate: &ActorId) -> bool {
        let is_self = user == candidate;
        match self.who {
            TargetWho::Any | TargetWho::Creatures => self.include_self || !is_self,
            TargetWho::Personal => is_self,
            TargetWho::NotSelf => !is_self,
            TargetWho::Enemies => match (state.actor(user), state.actor(candidate)) {
                (Some(a), Some(b)) => a.is_enemy_of(b),
                _ => !is_self,
            },
            TargetWho::Allies => !is_self && state.are_allies(user, candidate),
        }
    }
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self {
            who: TargetWho::Any,
            min_targets: 1,
            max_targets: 1,
            include_self: false,
        }
    }
}

/// Player choices that complete a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TargetChoices {
    /// Center of an area burst.
    pub center: Option<Position>,
    /// Direction of a blast.
    pub facing: Option<Facing>,
}

impl TargetChoices {
    pub fn centered(center: Position) -> Self {
        Self {
            center: Some(center),
            facing: None,
        }
    }

    pub fn facing(facing: Facing) -> Self {
        Self {
            center: None,
            facing: Some(facing),
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::EnumString, thiserror::Error,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetingError {
    #[error("attacker has no position")]
    NoAttackerPosition,
    #[error("area burst needs a center")]
    CenterRequired,
    #[error("center is out of range")]
    OutOfRange,
    #[error("no line of effect to the origin")]
    NoLoeToOrigin,
    #[error("blast needs a facing")]
    FacingRequired,
    #[error("no valid targets")]
    NoCandidates,
    #[error("burst needs a radius")]
    RadiusRequired,
    #[error("blast needs a size")]
    SizeRequired,
    #[error("ranged template needs a range")]
    RangeRequired,
    #[error("max targets below min targets")]
    BadCounts,
}

impl TargetingError {
    pub fn code(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, thiserror::Error)]
#[error("targeting failed: {}", self.codes().join(", "))]
pub struct TargetingErrors(pub Vec<TargetingError>);

impl TargetingErrors {
    fn check(errors: Vec<TargetingError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.0.iter().map(|error| error.code()).collect()
    }

    pub fn contains(&self, error: TargetingError) -> bool {
        self.0.contains(&error)
    }
}

/// Cells covered and actors found for a template.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TargetPreview {
    pub cells: Cells,
    pub targets: Vec<ActorId>,
    pub errors: Vec<TargetingError>,
}

impl TargetPreview {
    fn fail(mut self, error: TargetingError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Self, TargetingErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(TargetingErrors(self.errors))
        }
    }
}

/// A selection recorded on the state for the acting player.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StagedTargeting {
    pub actor: ActorId,
    pub spec: TemplateSpec,
    pub choices: TargetChoices,
    pub cells: Vec<Position>,
    pub targets: Vec<ActorId>,
}

/// Resolves `spec` for `attacker` and lists the actors it can affect.
///
/// Candidates are returned in actor-id order, filtered by line of effect from
/// the template's origin and by `filter`, then truncated to `max_targets`.
pub fn preview_targeting(
    state: &State,
    attacker: &ActorId,
    spec: &TemplateSpec,
    filter: &TargetFilter,
    choices: &TargetChoices,
) -> TargetPreview {
    let preview = TargetPreview::default();
    let Some(attacker_cell) = state.position_of(attacker) else {
        return preview.fail(TargetingError::NoAttackerPosition);
    };
    let spec = spec.clone().normalize();
    let filter = filter.normalize();

    let mut origin = attacker_cell;
    let mut errors = Vec::new();
    let cells = match spec.kind {
        TemplateKind::Burst => {
            let radius = spec.radius.unwrap_or(DEFAULT_RADIUS);
            if spec.origin == TemplateOrigin::Area {
                let Some(center) = choices.center else {
                    return preview.fail(TargetingError::CenterRequired);
                };
                if spec.range.is_some_and(|range| attacker_cell.distance(center) > range) {
                    errors.push(TargetingError::OutOfRange);
                }
                if spec.requires_loe() && !has_line_of_effect(&state.board, attacker_cell, center)
                {
                    errors.push(TargetingError::NoLoeToOrigin);
                }
                origin = center;
                cells_for_burst(center, radius, &state.board)
            } else {
                cells_for_burst(attacker_cell, radius, &state.board)
            }
        }
        TemplateKind::Blast => {
            let Some(facing) = choices.facing else {
                return preview.fail(TargetingError::FacingRequired);
            };
            let size = spec.size.unwrap_or(DEFAULT_SIZE);
            cells_for_blast(attacker_cell, facing, size, &state.board)
        }
        TemplateKind::Single => {
            let reach = if spec.origin == TemplateOrigin::Melee {
                spec.reach.unwrap_or(DEFAULT_REACH)
            } else {
                spec.range.unwrap_or(DEFAULT_RANGE)
            };
            cells_for_burst(attacker_cell, reach, &state.board)
        }
    };

    if !errors.is_empty() {
        return TargetPreview {
            cells,
            targets: Vec::new(),
            errors,
        };
    }

    let needs_loe = !matches!(spec.origin, TemplateOrigin::Personal) || spec.requires_loe();
    let found: Vec<ActorId> = state
        .board
        .positions
        .iter()
        .filter(|(_, pos)| cells.contains(pos))
        .filter(|(_, pos)| !needs_loe || has_line_of_effect(&state.board, origin, **pos))
        .filter(|(id, _)| filter.admits(state, attacker, id))
        .map(|(id, _)| id.clone())
        .collect();

    let targets: Vec<ActorId> = found.into_iter().take(filter.max_targets as usize).collect();
    if targets.is_empty() || (targets.len() as u32) < filter.min_targets {
        errors.push(TargetingError::NoCandidates);
    }

    TargetPreview {
        cells,
        targets,
        errors,
    }
}

/// Records `targets` as the acting player's selection and logs
/// `template-choose`.
///
/// Only targets the preview would accept are kept, in the given order.
pub fn stage_targeting_selection(
    state: &State,
    actor: &ActorId,
    spec: &TemplateSpec,
    filter: &TargetFilter,
    choices: &TargetChoices,
    targets: &[ActorId],
) -> Result<Vec<Patch>, TargetingErrors> {
    let preview = preview_targeting(state, actor, spec, filter, choices).into_result()?;
    let selected: Vec<ActorId> = targets
        .iter()
        .filter(|id| preview.targets.contains(id))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(TargetingErrors(vec![TargetingError::NoCandidates]));
    }

    let staged = StagedTargeting {
        actor: actor.clone(),
        spec: spec.clone().normalize(),
        choices: *choices,
        cells: preview.cells.iter().copied().collect(),
        targets: selected,
    };
    let record = LogRecord::new(
        LogKind::TemplateChoose,
        format!("{actor} selects {} target(s)", staged.targets.len()),
        LogData::Targeting {
            actor: actor.clone(),
            cells: staged.cells.clone(),
            targets: staged.targets.clone(),
            errors: Vec::new(),
        },
    );
    Ok(vec![
        Patch::SetStaging {
            staging: Some(Box::new(staged)),
        },
        Patch::log(record),
    ])
}

/// `target-preview` log entry for a preview.
pub fn build_target_preview_log(actor: &ActorId, preview: &TargetPreview) -> Patch {
    let msg = if preview.is_ok() {
        format!("{actor} previews {} target(s)", preview.targets.len())
    } else {
        let codes: Vec<&str> = preview.errors.iter().map(|e| e.code()).collect();
        format!("{actor} targeting invalid: {}", codes.join(", "))
    };
    Patch::log(LogRecord::new(
        LogKind::TargetPreview,
        msg,
        LogData::Targeting {
            actor: actor.clone(),
            cells: preview.cells.iter().copied().collect(),
            targets: preview.targets.clone(),
            errors: preview.errors.clone(),
        },
    ))
}
