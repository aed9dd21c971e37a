//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! The engine promises that two sessions fed the same input events and
//! time deltas stay bit-identical. Sources of non-determinism to guard
//! against:
//!
//! - **Collection iteration order**: entities live in `Vec`s and are
//!   pruned by survivor filtering, never reordered. Path-cell membership
//!   uses a set that is only probed, never iterated.
//!
//! - **System randomness**: the engine has none; spawn schedules and
//!   stat scaling are pure functions of the wave number.
//!
//! - **Float evaluation order**: single-threaded and frame-stepped, so
//!   the same operations run in the same order every time.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual system determinism
//! 2. **Property tests**: random build plans must still produce
//!    deterministic outcomes
//! 3. **Integration tests**: full scripted campaigns are reproducible,
//!    including across save/resume

use td_core::session::Session;

use crate::fixtures::drive_tick;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed
    /// error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```
/// use td_test_utils::determinism::verify_determinism;
/// use td_test_utils::fixtures::{drive_tick, strip_session};
///
/// let result = verify_determinism(
///     3,
///     120,
///     || strip_session(2),
///     drive_tick,
///     |session| session.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for [`Session`].
///
/// Runs the scripted player (waves auto-started, endless accepted) for
/// `num_ticks` frames, twice, and verifies the final state hashes match
/// exactly.
pub fn verify_session_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Session,
{
    let result = verify_determinism(2, num_ticks, &setup_fn, drive_tick, Session::state_hash);
    result.is_deterministic
}

/// Compare two scripted runs tick-by-tick, finding the first divergence.
///
/// Useful for debugging non-determinism by finding exactly when two runs
/// start to differ.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` for the first differing tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Session,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        drive_tick(&mut first);
        drive_tick(&mut second);

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the engine.
pub mod strategies {
    use proptest::prelude::*;
    use td_core::entities::TowerKind;
    use td_core::grid::Cell;

    /// Generate a grid cell on the default 16x12 board.
    pub fn arb_cell() -> impl Strategy<Value = Cell> {
        (0i32..16, 0i32..12)
    }

    /// Generate a tower kind.
    pub fn arb_tower_kind() -> impl Strategy<Value = TowerKind> {
        prop_oneof![
            Just(TowerKind::Basic),
            Just(TowerKind::Sniper),
            Just(TowerKind::Shotgun),
        ]
    }

    /// Generate a build plan: kinds and cells to try placing, in order.
    /// Placements may be rejected (path cells, duplicates, cost) - that
    /// rejection path is part of what gets exercised.
    pub fn arb_build_plan(max_len: usize) -> impl Strategy<Value = Vec<(TowerKind, Cell)>> {
        proptest::collection::vec((arb_tower_kind(), arb_cell()), 0..max_len)
    }
}
