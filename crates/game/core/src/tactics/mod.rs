//! Grid tactics: geometry, line of effect, pathing, movement, forced
//! movement, area templates and target discovery.
//!
//! Everything here reads [`State`](crate::state::State) and returns values or
//! patches; nothing mutates the board directly.
pub mod forced;
pub mod grid;
pub mod los;
pub mod movement;
pub mod pathing;
pub mod targeting;
pub mod templates;

pub use forced::{ForcedKind, pull, push, slide};
pub use grid::{chebyshev, is_legal_destination, neighbors4, neighbors8};
pub use los::has_line_of_effect;
pub use movement::{
    MoveError, MoveMode, MovePlan, MoveWarning, build_move_preview_log, commit_move,
    detect_provokers, preview_move, stand_up,
};
pub use pathing::{PathOptions, PathResult, find_path, path_cost, reachable};
pub use targeting::{
    StagedTargeting, TargetChoices, TargetFilter, TargetPreview, TargetWho, TargetingError,
    TargetingErrors, TemplateKind, TemplateOrigin, TemplateSpec, build_target_preview_log,
    preview_targeting, stage_targeting_selection,
};
pub use templates::{
    Cells, Facing, area_burst_centers_within, cells_for_blast, cells_for_burst, cells_for_single,
    facing_from_vector,
};
