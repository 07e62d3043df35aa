/// Rules constants and tunable parameters.
///
/// Lives on the [`State`](crate::State) so that replaying a patch stream
/// always runs against the same rules that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RulesConfig {
    /// Minimum d20 for a saving throw to succeed.
    pub save_target: i32,
    /// Highest d20 that counts as a failed death save.
    pub death_save_fail_max: i32,
    /// Natural roll that turns a death save into a surge heal.
    pub death_save_critical: i32,
    /// Accumulated death-save failures that kill.
    pub death_failures_to_die: u8,
    pub stabilize_dc: i32,
    /// Extra squares granted by a run.
    pub run_bonus: u32,
    /// Budget cap imposed by `slowed`.
    pub slow_cap: u32,
    /// Reach within which adjacent enemies are provoked.
    pub threat_range: u32,
    pub combat_advantage_bonus: i32,
    pub cover_penalty: i32,
    pub superior_cover_penalty: i32,
    pub concealment_penalty: i32,
    pub total_concealment_penalty: i32,
    pub second_wind_defense_bonus: i32,
}

impl RulesConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_NEIGHBORS: usize = 8;
    /// Upper bound on A* node expansions per search.
    pub const MAX_PATH_EXPANSIONS: usize = 16_384;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_SAVE_TARGET: i32 = 10;
    pub const DEFAULT_STABILIZE_DC: i32 = 15;
    pub const DEFAULT_RUN_BONUS: u32 = 2;
    pub const DEFAULT_THREAT_RANGE: u32 = 1;

    pub fn new() -> Self {
        Self {
            save_target: Self::DEFAULT_SAVE_TARGET,
            death_save_fail_max: 9,
            death_save_critical: 20,
            death_failures_to_die: 3,
            stabilize_dc: Self::DEFAULT_STABILIZE_DC,
            run_bonus: Self::DEFAULT_RUN_BONUS,
            slow_cap: 2,
            threat_range: Self::DEFAULT_THREAT_RANGE,
            combat_advantage_bonus: 2,
            cover_penalty: 2,
            superior_cover_penalty: 5,
            concealment_penalty: 2,
            total_concealment_penalty: 5,
            second_wind_defense_bonus: 2,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self::new()
    }
}
