use bytemuck::{Pod, Zeroable};

use crate::components::{Coord, MoveOutcome, SimEvent};
use crate::error::BoardError;
use crate::grid::Grid;
use crate::profile::{BoardProfile, StepTiming};
use crate::systems::board::{generate, Rng};
use crate::systems::matcher::{find_all_matches, MatchSet};
use crate::systems::playability::{find_legal_move, has_legal_move, SwapMove};
use crate::systems::resolve::{Phase, ResolutionEngine, StepReport};

/// Per-cell data written to a flat buffer for the host renderer.
/// 6 bytes stride, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CellSlot {
    pub x: u16,
    pub y: u16,
    pub kind: u8,
    /// bit 0 = occupied
    pub flags: u8,
}

pub const SLOT_OCCUPIED: u8 = 1 << 0;

/// One play session: a board, its profile, the RNG that feeds it and the
/// resolution cycle in flight. Nothing here is global; hosts create as many
/// sessions as they like.
pub struct Session {
    profile: BoardProfile,
    grid: Grid,
    rng: Rng,
    engine: ResolutionEngine,
    cycle_from_swap: bool,
    moves_made: u32,
    last_outcome: Option<MoveOutcome>,

    // Events emitted since the last drain
    events: Vec<SimEvent>,

    // The cell buffer: rebuilt after every step, read by the host.
    cell_buffer: Vec<CellSlot>,
}

impl Session {
    /// Validate `profile` and generate the first board from `seed`.
    pub fn new(profile: BoardProfile, seed: u64) -> Result<Self, BoardError> {
        let mut rng = Rng::new(seed);
        let grid = generate(&profile, &mut rng)?;
        log::info!(
            "session: {}x{} board, {} kinds, {:?}, seed {}",
            profile.width,
            profile.height,
            profile.tileset.len(),
            profile.topology,
            seed
        );
        Ok(Self::assemble(profile, grid, rng))
    }

    /// Resume from an existing board. The grid must match the profile's size,
    /// be full, and hold only kinds from the profile's tileset.
    pub fn from_grid(profile: BoardProfile, grid: Grid, seed: u64) -> Result<Self, BoardError> {
        profile.validate()?;
        if grid.dimensions() != (profile.width, profile.height) {
            return Err(BoardError::InvalidDimensions {
                width: grid.width(),
                height: grid.height(),
            });
        }
        for c in grid.coords() {
            match grid.kind_at(c) {
                None => return Err(BoardError::UnfilledCell { x: c.x, y: c.y }),
                Some(kind) if !profile.tileset.contains(&kind) => {
                    return Err(BoardError::UnknownTileKind(kind))
                }
                Some(_) => {}
            }
        }
        Ok(Self::assemble(profile, grid, Rng::new(seed)))
    }

    fn assemble(profile: BoardProfile, grid: Grid, rng: Rng) -> Self {
        let capacity = grid.width() * grid.height();
        let mut session = Session {
            profile,
            grid,
            rng,
            engine: ResolutionEngine::new(),
            cycle_from_swap: false,
            moves_made: 0,
            last_outcome: None,
            events: Vec::with_capacity(16),
            cell_buffer: Vec::with_capacity(capacity),
        };
        session.rebuild_cell_buffer();
        session
    }

    /// Replace the board with one built from a new profile.
    pub fn generate(&mut self, profile: BoardProfile) -> Result<(), BoardError> {
        if self.engine.is_busy() {
            return Err(BoardError::Busy);
        }
        let grid = generate(&profile, &mut self.rng)?;
        self.profile = profile;
        self.grid = grid;
        self.moves_made = 0;
        self.last_outcome = None;
        self.rebuild_cell_buffer();
        Ok(())
    }

    /// Throw the board away and build a fresh one from the current profile.
    pub fn regenerate(&mut self) -> Result<(), BoardError> {
        if self.engine.is_busy() {
            return Err(BoardError::Busy);
        }
        self.regenerate_board()
    }

    fn regenerate_board(&mut self) -> Result<(), BoardError> {
        self.grid = generate(&self.profile, &mut self.rng)?;
        self.events.push(SimEvent::Regenerated);
        self.rebuild_cell_buffer();
        log::info!("session: board regenerated");
        Ok(())
    }

    pub fn check_playable(&self) -> bool {
        has_legal_move(&self.grid, self.profile.topology)
    }

    /// A swap that would match right now, if any.
    pub fn hint(&self) -> Option<SwapMove> {
        find_legal_move(&self.grid, self.profile.topology)
    }

    /// Match-sets currently on the board, without resolving them.
    pub fn pending_matches(&self) -> Vec<MatchSet> {
        find_all_matches(&self.grid, self.profile.topology)
    }

    /// Start a resolution cycle with a swap. Rejected while a cycle is running.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), BoardError> {
        self.engine
            .begin_swap(&self.grid, a, b, self.profile.topology)?;
        self.cycle_from_swap = true;
        Ok(())
    }

    /// Start a resolution cycle without a swap, e.g. after loading a board.
    pub fn settle(&mut self) -> Result<(), BoardError> {
        self.engine.begin_settle()?;
        self.cycle_from_swap = false;
        Ok(())
    }

    /// Advance the running cycle by one step. The host may wait
    /// `timing_for(report.phase)` before calling again.
    pub fn step(&mut self) -> Result<StepReport, BoardError> {
        let report = self.engine.step(
            &mut self.grid,
            &self.profile,
            &mut self.rng,
            &mut self.events,
        )?;
        let finished = match report.outcome {
            Some(outcome) => self.finish_cycle(outcome),
            None => Ok(()),
        };
        self.rebuild_cell_buffer();
        finished.map(|()| report)
    }

    /// Step until the cycle ends. `None` if no cycle was running.
    pub fn resolve(&mut self) -> Result<Option<MoveOutcome>, BoardError> {
        while self.engine.is_busy() {
            if let Some(outcome) = self.step()?.outcome {
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    pub fn swap_and_resolve(&mut self, a: Coord, b: Coord) -> Result<MoveOutcome, BoardError> {
        self.swap(a, b)?;
        Ok(self.resolve()?.unwrap_or(MoveOutcome::NoEffectiveMove))
    }

    fn finish_cycle(&mut self, outcome: MoveOutcome) -> Result<(), BoardError> {
        if self.cycle_from_swap && outcome != MoveOutcome::NoEffectiveMove {
            self.moves_made += 1;
        }
        self.cycle_from_swap = false;
        self.last_outcome = Some(outcome);

        if !self.check_playable() {
            log::info!("session: no legal move left, regenerating");
            self.regenerate_board()?;
        }
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    /// Swaps that changed the board. Scoring policy lives with the caller.
    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    pub fn last_outcome(&self) -> Option<MoveOutcome> {
        self.last_outcome
    }

    /// Delay hint for the step that just ran, straight from the profile.
    pub fn timing_for(&self, phase: Phase) -> u32 {
        let StepTiming {
            swap_ms,
            remove_ms,
            fall_ms,
            refill_ms,
        } = self.profile.timing;
        match phase {
            Phase::Swapped => swap_ms,
            Phase::Removing => remove_ms,
            Phase::Compacting => fall_ms,
            Phase::Refilling => refill_ms,
            Phase::Idle | Phase::Matching => 0,
        }
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Hand over every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Rebuild the flat cell buffer from the current grid, row-major.
    fn rebuild_cell_buffer(&mut self) {
        self.cell_buffer.clear();
        for c in self.grid.coords() {
            let kind = self.grid.kind_at(c);
            // grid dimensions are capped at MAX_DIMENSION, so coordinates fit
            self.cell_buffer.push(CellSlot {
                x: c.x as u16,
                y: c.y as u16,
                kind: kind.map_or(0, |k| k.0),
                flags: if kind.is_some() { SLOT_OCCUPIED } else { 0 },
            });
        }
    }

    pub fn cell_buffer(&self) -> &[CellSlot] {
        &self.cell_buffer
    }

    /// The cell buffer as raw bytes for zero-copy hosts.
    pub fn cell_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cell_buffer)
    }

    /// Pointer to the cell buffer data for SharedArrayBuffer access.
    pub fn cell_buffer_ptr(&self) -> *const CellSlot {
        self.cell_buffer.as_ptr()
    }

    /// Number of slots in the cell buffer.
    pub fn cell_buffer_len(&self) -> usize {
        self.cell_buffer.len()
    }
}
