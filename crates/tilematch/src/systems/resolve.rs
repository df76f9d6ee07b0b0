use crate::components::{Coord, MoveOutcome, MovePolicy, SimEvent, TileKind, Topology};
use crate::error::{BoardError, SwapRejection};
use crate::grid::Grid;
use crate::profile::BoardProfile;
use crate::systems::adjacency::is_step;
use crate::systems::board::TileSource;
use crate::systems::matcher::{find_all_matches, find_runs_through, MatchSet};

/// Where a settle cycle stands. `Idle` means no cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Swapped = 1,
    Matching = 2,
    Removing = 3,
    Compacting = 4,
    Refilling = 5,
}

/// What one call to [`ResolutionEngine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// The phase that just ran.
    pub phase: Phase,
    /// Set when this step ended the cycle.
    pub outcome: Option<MoveOutcome>,
}

/// Check a swap request against the board without touching it.
pub fn validate_swap(grid: &Grid, a: Coord, b: Coord, topology: Topology) -> Result<(), BoardError> {
    let kind_a = grid.get(a)?;
    let kind_b = grid.get(b)?;
    if a == b {
        return Err(BoardError::InvalidSwap(SwapRejection::SameCell));
    }
    if kind_a.is_none() || kind_b.is_none() {
        return Err(BoardError::InvalidSwap(SwapRejection::EmptyCell));
    }
    if !is_step(a, b, topology) {
        return Err(BoardError::InvalidSwap(SwapRejection::NotAdjacent));
    }
    Ok(())
}

/// Clear every cell of every match-set. Emits one `Matched` per set.
pub fn remove_matches(
    grid: &mut Grid,
    matches: &[MatchSet],
    events: &mut Vec<SimEvent>,
) -> Result<(), BoardError> {
    for set in matches {
        for &c in &set.cells {
            grid.set(c, None)?;
        }
        events.push(SimEvent::Matched { size: set.size() });
    }
    Ok(())
}

/// Let tiles fall to the bottom of each column. Returns how many tiles moved.
pub fn compact(grid: &mut Grid) -> usize {
    let (width, height) = grid.dimensions();
    let mut falls = 0;
    for x in 0..width {
        // next free slot, counted from the bottom
        let mut write = height;
        for y in (0..height).rev() {
            if grid.is_occupied(Coord::new(x as i32, y as i32)) {
                write -= 1;
                if write != y {
                    grid.move_within_column(x, y, write);
                    falls += 1;
                }
            }
        }
    }
    falls
}

/// Fill every empty cell from `source`. With `avoid_runs`, a drawn kind that
/// would complete a run is swapped for the first tileset kind that does not.
pub fn refill<S: TileSource + ?Sized>(
    grid: &mut Grid,
    profile: &BoardProfile,
    source: &mut S,
    avoid_runs: bool,
) -> Result<usize, BoardError> {
    let empty: Vec<Coord> = grid.coords().filter(|&c| !grid.is_occupied(c)).collect();
    for &c in &empty {
        let drawn = source.draw(&profile.tileset).ok_or(BoardError::EmptyTileset)?;
        let kind = if avoid_runs {
            run_free_kind(grid, c, profile, drawn)?
        } else {
            drawn
        };
        grid.set(c, Some(kind))?;
    }
    Ok(empty.len())
}

fn run_free_kind(
    grid: &mut Grid,
    c: Coord,
    profile: &BoardProfile,
    drawn: TileKind,
) -> Result<TileKind, BoardError> {
    let others = profile.tileset.iter().copied().filter(|&k| k != drawn);
    for kind in std::iter::once(drawn).chain(others) {
        grid.set(c, Some(kind))?;
        if find_runs_through(grid, c, profile.topology).is_empty() {
            return Ok(kind);
        }
    }
    Ok(drawn)
}

/// Drives one settle cycle a step at a time:
/// `Idle -> Swapped -> Matching -> Removing -> Compacting -> Refilling -> (Matching | Idle)`.
///
/// Every step completes instantly; the caller decides how long to wait
/// between steps. The engine owns no board, it works on the grid it is handed.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    phase: Phase,
    pending_swap: Option<(Coord, Coord)>,
    matches: Vec<MatchSet>,
    matched_any: bool,
    passes: usize,
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionEngine {
    pub fn new() -> Self {
        ResolutionEngine {
            phase: Phase::Idle,
            pending_swap: None,
            matches: Vec::new(),
            matched_any: false,
            passes: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Refill passes run so far in the current cycle.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Start a cycle with a swap. The swap itself happens on the first step.
    pub fn begin_swap(
        &mut self,
        grid: &Grid,
        a: Coord,
        b: Coord,
        topology: Topology,
    ) -> Result<(), BoardError> {
        if self.is_busy() {
            return Err(BoardError::Busy);
        }
        validate_swap(grid, a, b, topology)?;
        self.reset();
        self.pending_swap = Some((a, b));
        self.phase = Phase::Swapped;
        Ok(())
    }

    /// Start a cycle on the board as it stands, with no swap.
    pub fn begin_settle(&mut self) -> Result<(), BoardError> {
        if self.is_busy() {
            return Err(BoardError::Busy);
        }
        self.reset();
        self.phase = Phase::Matching;
        Ok(())
    }

    fn reset(&mut self) {
        self.pending_swap = None;
        self.matches.clear();
        self.matched_any = false;
        self.passes = 0;
    }

    /// Run the current phase and advance to the next one.
    pub fn step<S: TileSource + ?Sized>(
        &mut self,
        grid: &mut Grid,
        profile: &BoardProfile,
        source: &mut S,
        events: &mut Vec<SimEvent>,
    ) -> Result<StepReport, BoardError> {
        let phase = self.phase;
        let mut outcome = None;

        match phase {
            Phase::Idle => {}
            Phase::Swapped => {
                if let Some((a, b)) = self.pending_swap {
                    grid.swap(a, b)?;
                    events.push(SimEvent::Swapped { a, b });
                }
                self.phase = Phase::Matching;
            }
            Phase::Matching => {
                self.matches = find_all_matches(grid, profile.topology);
                if self.matches.is_empty() && !grid.is_full() {
                    // gaps left on a handed-in board still fall and refill
                    self.phase = Phase::Compacting;
                } else if self.matches.is_empty() {
                    outcome = Some(self.finish(grid, profile.policy, events)?);
                } else {
                    self.matched_any = true;
                    self.phase = Phase::Removing;
                }
            }
            Phase::Removing => {
                remove_matches(grid, &self.matches, events)?;
                self.matches.clear();
                self.phase = Phase::Compacting;
            }
            Phase::Compacting => {
                let falls = compact(grid);
                events.push(SimEvent::Compacted { falls });
                self.phase = Phase::Refilling;
            }
            Phase::Refilling => {
                self.passes += 1;
                let avoid_runs = self.passes > profile.cascade_limit;
                let cells = refill(grid, profile, source, avoid_runs)?;
                events.push(SimEvent::Refilled { cells });

                let hard_cap = profile.cascade_limit.saturating_mul(2).max(1);
                if self.passes >= hard_cap {
                    log::warn!(
                        "cascade stopped after {} refill passes; board may still hold runs",
                        self.passes
                    );
                    outcome = Some(self.finish(grid, profile.policy, events)?);
                } else {
                    self.phase = Phase::Matching;
                }
            }
        }

        log::debug!("resolve: {:?} -> {:?}", phase, self.phase);
        Ok(StepReport { phase, outcome })
    }

    /// Close the cycle: revert or keep a non-matching swap, report the move.
    fn finish(
        &mut self,
        grid: &mut Grid,
        policy: MovePolicy,
        events: &mut Vec<SimEvent>,
    ) -> Result<MoveOutcome, BoardError> {
        let outcome = if self.matched_any {
            MoveOutcome::Matched
        } else {
            events.push(SimEvent::NoMatch);
            match (self.pending_swap, policy) {
                (Some((a, b)), MovePolicy::ExplicitMatchesOnly) => {
                    grid.swap(a, b)?;
                    events.push(SimEvent::SwapReverted { a, b });
                    MoveOutcome::NoEffectiveMove
                }
                (Some(_), MovePolicy::AllowNonMatching) => MoveOutcome::EffectiveNoMatch,
                (None, _) => MoveOutcome::NoEffectiveMove,
            }
        };
        events.push(SimEvent::MoveFinished {
            matched: outcome.matched(),
        });
        self.phase = Phase::Idle;
        self.pending_swap = None;
        Ok(outcome)
    }

    /// Step until the cycle ends. Returns immediately when idle.
    pub fn run_to_idle<S: TileSource + ?Sized>(
        &mut self,
        grid: &mut Grid,
        profile: &BoardProfile,
        source: &mut S,
        events: &mut Vec<SimEvent>,
    ) -> Result<Option<MoveOutcome>, BoardError> {
        while self.is_busy() {
            let report = self.step(grid, profile, source, events)?;
            if report.outcome.is_some() {
                return Ok(report.outcome);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{from_ascii, to_ascii};
    use crate::systems::board::Rng;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    /// Hands out a fixed sequence of kinds, cycling.
    struct Scripted {
        kinds: Vec<TileKind>,
        next: usize,
    }

    impl Scripted {
        fn new(letters: &str) -> Self {
            Scripted {
                kinds: letters.bytes().map(|b| TileKind(b - b'A')).collect(),
                next: 0,
            }
        }
    }

    impl TileSource for Scripted {
        fn draw(&mut self, _choices: &[TileKind]) -> Option<TileKind> {
            let k = self.kinds[self.next % self.kinds.len()];
            self.next += 1;
            Some(k)
        }
    }

    /// Swapping (2,2) B with (2,3) A turns row 2 into A A A E B.
    fn scenario_board() -> Grid {
        from_ascii(&["CDECD", "DECDE", "AABEB", "ECACE", "CDEDC"])
    }

    fn run_swap(
        grid: &mut Grid,
        profile: &BoardProfile,
        source: &mut dyn TileSource,
        a: Coord,
        b: Coord,
    ) -> (MoveOutcome, Vec<SimEvent>) {
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_swap(grid, a, b, profile.topology).unwrap();
        let outcome = engine
            .run_to_idle(grid, profile, source, &mut events)
            .unwrap()
            .unwrap();
        (outcome, events)
    }

    #[test]
    fn matching_swap_clears_compacts_and_refills() {
        let mut grid = scenario_board();
        let profile = BoardProfile::default();
        let mut source = Scripted::new("AB");
        let (outcome, events) = run_swap(&mut grid, &profile, &mut source, c(2, 2), c(2, 3));

        assert_eq!(outcome, MoveOutcome::Matched);
        assert_eq!(
            events,
            vec![
                SimEvent::Swapped { a: c(2, 2), b: c(2, 3) },
                SimEvent::Matched { size: 3 },
                SimEvent::Compacted { falls: 6 },
                SimEvent::Refilled { cells: 3 },
                SimEvent::MoveFinished { matched: true },
            ]
        );
        assert_eq!(
            to_ascii(&grid),
            vec!["ABACD", "CDEDE", "DECEB", "ECBCE", "CDEDC"]
        );
        assert!(grid.is_full());
    }

    #[test]
    fn non_matching_swap_is_reverted_under_explicit_policy() {
        let mut grid = scenario_board();
        let before = grid.clone();
        let profile = BoardProfile::default();
        let (outcome, events) = run_swap(&mut grid, &profile, &mut Rng::new(1), c(0, 0), c(1, 0));

        assert_eq!(outcome, MoveOutcome::NoEffectiveMove);
        assert_eq!(grid, before);
        assert_eq!(
            events,
            vec![
                SimEvent::Swapped { a: c(0, 0), b: c(1, 0) },
                SimEvent::NoMatch,
                SimEvent::SwapReverted { a: c(0, 0), b: c(1, 0) },
                SimEvent::MoveFinished { matched: false },
            ]
        );
    }

    #[test]
    fn non_matching_swap_sticks_when_allowed() {
        let mut grid = scenario_board();
        let profile = BoardProfile::default().with_policy(MovePolicy::AllowNonMatching);
        let (outcome, events) = run_swap(&mut grid, &profile, &mut Rng::new(1), c(0, 0), c(1, 0));

        assert_eq!(outcome, MoveOutcome::EffectiveNoMatch);
        assert_eq!(to_ascii(&grid)[0], "DCECD");
        assert_eq!(events.last(), Some(&SimEvent::MoveFinished { matched: false }));
        assert!(!events.iter().any(|e| matches!(e, SimEvent::SwapReverted { .. })));
    }

    #[test]
    fn settling_a_quiet_board_changes_nothing() {
        let mut grid = scenario_board();
        let before = grid.clone();
        let profile = BoardProfile::default();
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_settle().unwrap();
        let outcome = engine
            .run_to_idle(&mut grid, &profile, &mut Rng::new(3), &mut events)
            .unwrap();

        assert_eq!(outcome, Some(MoveOutcome::NoEffectiveMove));
        assert_eq!(grid, before);
        assert_eq!(
            events,
            vec![SimEvent::NoMatch, SimEvent::MoveFinished { matched: false }]
        );
    }

    #[test]
    fn invalid_swaps_are_rejected_without_change() {
        let grid = scenario_board();
        let mut engine = ResolutionEngine::new();
        let t = Topology::Orthogonal;
        assert_eq!(
            engine.begin_swap(&grid, c(0, 0), c(2, 0), t),
            Err(BoardError::InvalidSwap(SwapRejection::NotAdjacent))
        );
        assert_eq!(
            engine.begin_swap(&grid, c(0, 0), c(1, 1), t),
            Err(BoardError::InvalidSwap(SwapRejection::NotAdjacent))
        );
        assert_eq!(
            engine.begin_swap(&grid, c(1, 1), c(1, 1), t),
            Err(BoardError::InvalidSwap(SwapRejection::SameCell))
        );
        assert_eq!(
            engine.begin_swap(&grid, c(4, 4), c(5, 4), t),
            Err(BoardError::OutOfBounds { x: 5, y: 4 })
        );
        assert!(!engine.is_busy());
        assert_eq!(grid, scenario_board());
    }

    #[test]
    fn empty_cells_cannot_be_swapped() {
        let grid = from_ascii(&["A.", "BC"]);
        assert_eq!(
            validate_swap(&grid, c(0, 0), c(1, 0), Topology::Orthogonal),
            Err(BoardError::InvalidSwap(SwapRejection::EmptyCell))
        );
    }

    #[test]
    fn diagonal_swap_allowed_under_diagonal_topology() {
        let grid = scenario_board();
        assert!(validate_swap(&grid, c(0, 0), c(1, 1), Topology::Diagonal).is_ok());
    }

    #[test]
    fn steps_walk_the_state_machine() {
        let mut grid = scenario_board();
        let profile = BoardProfile::default();
        let mut source = Scripted::new("AB");
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_swap(&grid, c(2, 2), c(2, 3), profile.topology).unwrap();

        let mut phases = Vec::new();
        loop {
            assert!(engine.is_busy());
            let report = engine.step(&mut grid, &profile, &mut source, &mut events).unwrap();
            phases.push(report.phase);
            if report.outcome.is_some() {
                break;
            }
            // mid-cycle requests are refused
            assert_eq!(engine.begin_settle(), Err(BoardError::Busy));
        }

        assert_eq!(
            phases,
            vec![
                Phase::Swapped,
                Phase::Matching,
                Phase::Removing,
                Phase::Compacting,
                Phase::Refilling,
                Phase::Matching,
            ]
        );
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(grid.is_packed());
    }

    #[test]
    fn adversarial_refills_switch_to_run_free_draws() {
        let mut grid = scenario_board();
        let mut profile = BoardProfile::default();
        profile.cascade_limit = 3;
        // every refill lays A A A across the top row
        let mut source = Scripted::new("A");
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_swap(&grid, c(2, 2), c(2, 3), profile.topology).unwrap();
        let outcome = engine
            .run_to_idle(&mut grid, &profile, &mut source, &mut events)
            .unwrap();

        assert_eq!(outcome, Some(MoveOutcome::Matched));
        let matched = events.iter().filter(|e| matches!(e, SimEvent::Matched { .. })).count();
        let refills = events.iter().filter(|e| matches!(e, SimEvent::Refilled { .. })).count();
        assert_eq!(matched, 4);
        assert_eq!(refills, 4);
        assert_eq!(engine.passes(), 4);
        assert!(find_all_matches(&grid, profile.topology).is_empty());
        assert!(grid.is_full());
    }

    #[test]
    fn single_pass_limit_rematches_before_the_cap() {
        // the first refill stacks D D D over an E that lands beside E E
        let mut grid = from_ascii(&["EAB", "CBA", "CAB", "CEE"]);
        let mut profile = BoardProfile::new(3, 4, 5);
        profile.cascade_limit = 1;
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_settle().unwrap();
        let outcome = engine
            .run_to_idle(&mut grid, &profile, &mut Scripted::new("D"), &mut events)
            .unwrap();

        assert_eq!(outcome, Some(MoveOutcome::Matched));
        assert_eq!(
            events,
            vec![
                SimEvent::Matched { size: 3 },
                SimEvent::Compacted { falls: 1 },
                SimEvent::Refilled { cells: 3 },
                SimEvent::Matched { size: 3 },
                SimEvent::Matched { size: 3 },
                SimEvent::Compacted { falls: 6 },
                SimEvent::Refilled { cells: 6 },
                SimEvent::MoveFinished { matched: true },
            ]
        );
        assert_eq!(to_ascii(&grid), vec!["DDA", "DAB", "ABA", "DAB"]);
        assert!(find_all_matches(&grid, profile.topology).is_empty());
    }

    #[test]
    fn hopeless_cascade_hits_the_hard_cap() {
        // a single-kind tileset can never refill without a run
        let mut grid = from_ascii(&["AAA", "AAA", "AAA"]);
        let mut profile = BoardProfile::new(3, 3, 1);
        profile.cascade_limit = 2;
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_settle().unwrap();
        let outcome = engine
            .run_to_idle(&mut grid, &profile, &mut Rng::new(5), &mut events)
            .unwrap();

        assert_eq!(outcome, Some(MoveOutcome::Matched));
        assert!(!engine.is_busy());
        assert_eq!(engine.passes(), 4);
        assert_eq!(
            events.iter().filter(|e| matches!(e, SimEvent::MoveFinished { .. })).count(),
            1
        );
        assert!(grid.is_full());
    }

    #[test]
    fn cascades_terminate_for_random_refills() {
        for seed in 1..50u64 {
            let mut grid = from_ascii(&["AAAB", "BBBA", "AABB", "CCCA"]);
            let profile = BoardProfile::new(4, 4, 3);
            let mut rng = Rng::new(seed);
            let mut engine = ResolutionEngine::new();
            let mut events = Vec::new();
            engine.begin_settle().unwrap();
            let mut steps = 0;
            while engine.is_busy() {
                engine
                    .step(&mut grid, &profile, &mut rng, &mut events)
                    .unwrap();
                steps += 1;
                assert!(steps < 4 * 2 * profile.cascade_limit + 8, "seed {}", seed);
            }
            assert!(grid.is_full() && grid.is_packed());
        }
    }

    #[test]
    fn settle_fills_gaps_without_runs() {
        let mut grid = from_ascii(&["AACD", "B.DA", "CDAB", "DABA"]);
        let profile = BoardProfile::new(4, 4, 4);
        let mut engine = ResolutionEngine::new();
        let mut events = Vec::new();
        engine.begin_settle().unwrap();
        let outcome = engine
            .run_to_idle(&mut grid, &profile, &mut Scripted::new("B"), &mut events)
            .unwrap();

        assert_eq!(outcome, Some(MoveOutcome::NoEffectiveMove));
        assert_eq!(to_ascii(&grid), vec!["ABCD", "BADA", "CDAB", "DABA"]);
        assert!(grid.is_full() && grid.is_packed());
        assert_eq!(
            events,
            vec![
                SimEvent::Compacted { falls: 1 },
                SimEvent::Refilled { cells: 1 },
                SimEvent::NoMatch,
                SimEvent::MoveFinished { matched: false },
            ]
        );
    }

    #[test]
    fn remove_matches_clears_cells_and_reports_sizes() {
        let mut grid = from_ascii(&["AAAB", "BCDC", "BCDC"]);
        let matches = find_all_matches(&grid, Topology::Orthogonal);
        let mut events = Vec::new();
        remove_matches(&mut grid, &matches, &mut events).unwrap();
        assert_eq!(to_ascii(&grid), vec!["...B", "BCDC", "BCDC"]);
        assert_eq!(events, vec![SimEvent::Matched { size: 3 }]);
    }

    #[test]
    fn compact_packs_columns_from_the_bottom() {
        let mut grid = from_ascii(&["AB", ".C", "D.", ".E"]);
        let falls = compact(&mut grid);
        assert_eq!(to_ascii(&grid), vec!["..", ".B", "AC", "DE"]);
        assert_eq!(falls, 4);
        assert!(grid.is_packed());
    }
}
