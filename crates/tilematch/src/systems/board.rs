use glam::IVec2;

use crate::components::{Coord, Heading, TileKind};
use crate::error::BoardError;
use crate::grid::Grid;
use crate::profile::BoardProfile;
use crate::systems::matcher::find_all_matches;
use crate::systems::playability::has_legal_move;

/// Seedable pseudo-random number generator (xorshift64).
/// Deterministic, fast, no-std compatible.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        // Avoid zero state
        Rng {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Generate next u64 using xorshift64.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a random number in [0, upper_bound).
    pub fn next_int(&mut self, upper_bound: u32) -> u32 {
        (self.next_u64() % upper_bound as u64) as u32
    }
}

/// Where new tiles come from. `Rng` draws uniformly; tests plug in scripted
/// sequences to force cascades.
pub trait TileSource {
    /// Pick one kind from `choices`, or `None` if there is nothing to pick.
    fn draw(&mut self, choices: &[TileKind]) -> Option<TileKind>;
}

impl TileSource for Rng {
    fn draw(&mut self, choices: &[TileKind]) -> Option<TileKind> {
        if choices.is_empty() {
            return None;
        }
        let i = self.next_int(choices.len() as u32) as usize;
        Some(choices[i])
    }
}

/// Directions already filled when scanning row-major from the top-left.
const PLACED_ORTHOGONAL: [Heading; 2] = [Heading::W, Heading::N];
const PLACED_DIAGONAL: [Heading; 2] = [Heading::NW, Heading::NE];

/// Kinds that would finish a three-in-a-line at `c` with the two placed
/// cells behind it in any of `directions`.
fn completing_kinds(grid: &Grid, c: Coord, directions: &[Heading], out: &mut Vec<TileKind>) {
    for h in directions {
        let step: IVec2 = h.offset();
        let near = grid.kind_at(c + step);
        if near.is_some() && near == grid.kind_at(c + step * 2) {
            if let Some(k) = near {
                if !out.contains(&k) {
                    out.push(k);
                }
            }
        }
    }
}

/// Candidate kinds for `c`, relaxing the exclusion set when it would leave
/// nothing: first diagonals are dropped, then any kind is allowed.
fn candidates_for(grid: &Grid, c: Coord, profile: &BoardProfile) -> Vec<TileKind> {
    let mut excluded = Vec::with_capacity(4);
    completing_kinds(grid, c, &PLACED_ORTHOGONAL, &mut excluded);
    let orthogonal_only = excluded.len();
    if profile.topology.includes_diagonals() {
        completing_kinds(grid, c, &PLACED_DIAGONAL, &mut excluded);
    }

    let allowed: Vec<TileKind> = profile
        .tileset
        .iter()
        .copied()
        .filter(|k| !excluded.contains(k))
        .collect();
    if !allowed.is_empty() {
        return allowed;
    }

    let relaxed: Vec<TileKind> = profile
        .tileset
        .iter()
        .copied()
        .filter(|k| !excluded[..orthogonal_only].contains(k))
        .collect();
    if !relaxed.is_empty() {
        log::warn!("generator: dropped diagonal exclusions at {:?}", c);
        return relaxed;
    }

    log::warn!("generator: no kind avoids a run at {:?}, allowing any", c);
    profile.tileset.clone()
}

/// One pass over the board: every cell gets a kind that avoids an immediate run.
fn fill_board<S: TileSource>(profile: &BoardProfile, source: &mut S) -> Result<Grid, BoardError> {
    let mut grid = Grid::new(profile.width, profile.height)?;
    for y in 0..profile.height as i32 {
        for x in 0..profile.width as i32 {
            let c = Coord::new(x, y);
            let choices = candidates_for(&grid, c, profile);
            let kind = source.draw(&choices).ok_or(BoardError::EmptyTileset)?;
            grid.set(c, Some(kind))?;
        }
    }
    Ok(grid)
}

/// Build a fresh board with no matches on it and at least one legal move.
///
/// Whole boards are retried up to `max_generation_attempts` times; tilesets
/// too small for the topology end in `UngeneratableBoard` rather than a hang.
pub fn generate<S: TileSource>(profile: &BoardProfile, source: &mut S) -> Result<Grid, BoardError> {
    profile.validate()?;

    let attempts = profile.max_generation_attempts.max(1);
    for attempt in 1..=attempts {
        let grid = fill_board(profile, source)?;
        if !find_all_matches(&grid, profile.topology).is_empty() {
            log::debug!("generator: attempt {} left a run, retrying", attempt);
            continue;
        }
        if !has_legal_move(&grid, profile.topology) {
            log::debug!("generator: attempt {} has no legal move, retrying", attempt);
            continue;
        }
        log::debug!(
            "generator: {}x{} board ready after {} attempt(s)",
            profile.width,
            profile.height,
            attempt
        );
        return Ok(grid);
    }

    Err(BoardError::UngeneratableBoard { attempts })
}
