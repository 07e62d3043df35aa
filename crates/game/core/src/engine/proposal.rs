//! Staging area for composite operations.
//!
//! Operations such as multi-target attacks or a full turn advance are built
//! from several sub-steps, and later sub-steps must observe the effects of
//! earlier ones (RNG cursor, minted ids, hit points). A [`Proposal`] keeps a
//! private scratch copy of the caller's state and applies each sub-step's
//! patches to it as they are proposed. The caller's state is never touched;
//! applying [`Proposal::finish`] to it reproduces the scratch state exactly,
//! except that the scratch log holds only the records proposed here.

use crate::state::{LogRecord, Patch, State};

use super::reducer::apply_patch;

pub struct Proposal {
    scratch: State,
    patches: Vec<Patch>,
}

impl Proposal {
    pub fn begin(state: &State) -> Self {
        Self {
            scratch: state.clone_without_log(),
            patches: Vec::new(),
        }
    }

    /// State as it would look after everything proposed so far.
    pub fn state(&self) -> &State {
        &self.scratch
    }

    pub fn push(&mut self, patch: Patch) {
        // A patch that cannot apply to the scratch state is still recorded so
        // the caller's reducer reports it the same way.
        let _ = apply_patch(&mut self.scratch, &patch);
        self.patches.push(patch);
    }

    pub fn extend(&mut self, patches: impl IntoIterator<Item = Patch>) {
        for patch in patches {
            self.push(patch);
        }
    }

    pub fn log(&mut self, record: LogRecord) {
        self.push(Patch::log(record));
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn finish(self) -> Vec<Patch> {
        self.patches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::apply_patches;
    use crate::env::{DiceSpec, roll};
    use crate::state::{Board, LogKind};

    #[test]
    fn later_steps_observe_earlier_patches() {
        let state = State::new(11, Board::new(3, 3));
        let mut proposal = Proposal::begin(&state);

        let first = roll(proposal.state(), &DiceSpec::D20);
        proposal.extend(first.patches);
        let second = roll(proposal.state(), &DiceSpec::D20);
        proposal.extend(second.patches);

        assert_eq!(proposal.state().rng.cursor, 2);
        assert_eq!(state.rng.cursor, 0);

        let mut scratch = proposal.state().clone();
        let mut live = state.clone();
        apply_patches(&mut live, &proposal.finish());
        assert_eq!(live.log, scratch.log);
        scratch.log = live.log.clone();
        assert_eq!(live, scratch);
    }

    #[test]
    fn scratch_starts_without_the_callers_log() {
        let mut state = State::new(11, Board::new(3, 3));
        for n in 0..50 {
            let patches = [Patch::log(LogRecord::message(LogKind::Info, format!("entry {n}")))];
            apply_patches(&mut state, &patches);
        }

        let mut proposal = Proposal::begin(&state);
        assert!(proposal.state().log.is_empty());
        assert_eq!(proposal.state().ts, state.ts);

        proposal.log(LogRecord::message(LogKind::Info, "proposed"));
        let stamped: Vec<u64> = proposal.state().log.iter().map(|e| e.ts).collect();
        assert_eq!(stamped, vec![51]);

        apply_patches(&mut state, &proposal.finish());
        assert_eq!(state.log.len(), 51);
        assert_eq!(state.log.last().map(|e| e.ts), Some(51));
    }
}
