use crate::components::{
    MovePolicy, TileKind, Topology, DEFAULT_CASCADE_LIMIT, DEFAULT_HEIGHT,
    DEFAULT_MAX_GENERATION_ATTEMPTS, DEFAULT_TILE_KINDS, DEFAULT_WIDTH,
};
use crate::error::BoardError;
use crate::grid::MAX_DIMENSION;

/// Per-step delay hints in milliseconds. The simulation never reads them;
/// they ride along so the host can pace its animations from one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepTiming {
    pub swap_ms: u32,
    pub remove_ms: u32,
    pub fall_ms: u32,
    pub refill_ms: u32,
}

impl Default for StepTiming {
    fn default() -> Self {
        StepTiming {
            swap_ms: 250,
            remove_ms: 200,
            fall_ms: 250,
            refill_ms: 250,
        }
    }
}

/// Everything a session needs to build and run a board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoardProfile {
    pub width: usize,
    pub height: usize,
    /// Ordered, distinct tile kinds to draw from.
    pub tileset: Vec<TileKind>,
    pub topology: Topology,
    pub policy: MovePolicy,
    pub timing: StepTiming,
    pub max_generation_attempts: usize,
    pub cascade_limit: usize,
}

impl Default for BoardProfile {
    fn default() -> Self {
        BoardProfile {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tileset: (0..DEFAULT_TILE_KINDS).map(TileKind).collect(),
            topology: Topology::Orthogonal,
            policy: MovePolicy::ExplicitMatchesOnly,
            timing: StepTiming::default(),
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            cascade_limit: DEFAULT_CASCADE_LIMIT,
        }
    }
}

impl BoardProfile {
    /// A profile with `kinds` tile kinds numbered from zero.
    pub fn new(width: usize, height: usize, kinds: u8) -> Self {
        BoardProfile {
            width,
            height,
            tileset: (0..kinds).map(TileKind).collect(),
            ..Self::default()
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_policy(mut self, policy: MovePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail fast on configurations no board can be built from.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_DIMENSION
            || self.height > MAX_DIMENSION
        {
            return Err(BoardError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.tileset.is_empty() {
            return Err(BoardError::EmptyTileset);
        }
        for (i, kind) in self.tileset.iter().enumerate() {
            if self.tileset[..i].contains(kind) {
                return Err(BoardError::DuplicateTileKind(*kind));
            }
        }
        // a zero limit would end a cycle before the refilled board is matched
        if self.cascade_limit == 0 {
            return Err(BoardError::InvalidCascadeLimit);
        }
        Ok(())
    }
}
