use glam::IVec2;

/// A board coordinate: `x` is the column, `y` the row. Row 0 is the top row.
pub type Coord = IVec2;

/// Identifies a tile's match-equivalence class. Equality is the only thing
/// the rules engine ever asks of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileKind(pub u8);

impl std::fmt::Display for TileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the eight unit steps on the board, listed clockwise from "above".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Heading {
    N = 0,
    NE = 1,
    E = 2,
    SE = 3,
    S = 4,
    SW = 5,
    W = 6,
    NW = 7,
}

impl Heading {
    pub const ALL: [Heading; 8] = [
        Heading::N,
        Heading::NE,
        Heading::E,
        Heading::SE,
        Heading::S,
        Heading::SW,
        Heading::W,
        Heading::NW,
    ];

    pub const ORTHOGONAL: [Heading; 4] = [Heading::N, Heading::E, Heading::S, Heading::W];

    /// Unit offset in board space (y grows downward).
    pub fn offset(self) -> IVec2 {
        match self {
            Heading::N => IVec2::new(0, -1),
            Heading::NE => IVec2::new(1, -1),
            Heading::E => IVec2::new(1, 0),
            Heading::SE => IVec2::new(1, 1),
            Heading::S => IVec2::new(0, 1),
            Heading::SW => IVec2::new(-1, 1),
            Heading::W => IVec2::new(-1, 0),
            Heading::NW => IVec2::new(-1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        (self as u8) % 2 == 1
    }
}

/// Adjacency rule shared by swap legality and match-run headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Topology {
    #[default]
    Orthogonal,
    Diagonal,
}

impl Topology {
    pub fn headings(self) -> &'static [Heading] {
        match self {
            Topology::Orthogonal => &Heading::ORTHOGONAL,
            Topology::Diagonal => &Heading::ALL,
        }
    }

    pub fn includes_diagonals(self) -> bool {
        self == Topology::Diagonal
    }
}

/// What happens to a swap that produces no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovePolicy {
    /// Non-matching swaps are reverted.
    #[default]
    ExplicitMatchesOnly,
    /// Non-matching swaps stay on the board.
    AllowNonMatching,
}

/// How a resolution cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveOutcome {
    /// The swap matched nothing and was reverted.
    NoEffectiveMove = 0,
    /// The swap stayed on the board but matched nothing.
    EffectiveNoMatch = 1,
    /// At least one match-set was cleared.
    Matched = 2,
}

impl MoveOutcome {
    pub fn matched(self) -> bool {
        self == MoveOutcome::Matched
    }
}

/// Events the simulation emits for the presentation layer and the scoring
/// collaborator. Emitted synchronously, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Swapped { a: Coord, b: Coord },
    /// One per match-set; `size` is the number of distinct cleared cells.
    Matched { size: usize },
    NoMatch,
    SwapReverted { a: Coord, b: Coord },
    Compacted { falls: usize },
    Refilled { cells: usize },
    MoveFinished { matched: bool },
    Regenerated,
}

impl SimEvent {
    /// Compact event code for hosts that read a byte stream.
    pub fn code(&self) -> u8 {
        match self {
            SimEvent::Swapped { .. } => 0,
            SimEvent::Matched { .. } => 1,
            SimEvent::NoMatch => 2,
            SimEvent::SwapReverted { .. } => 3,
            SimEvent::Compacted { .. } => 4,
            SimEvent::Refilled { .. } => 5,
            SimEvent::MoveFinished { .. } => 6,
            SimEvent::Regenerated => 7,
        }
    }
}

/// Default board dimensions (the classic 5x5 level).
pub const DEFAULT_WIDTH: usize = 5;
pub const DEFAULT_HEIGHT: usize = 5;
pub const DEFAULT_TILE_KINDS: u8 = 5;

/// Whole-board generation retries before giving up.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: usize = 100;

/// Refill passes after which refills avoid completing runs.
pub const DEFAULT_CASCADE_LIMIT: usize = 32;

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_clockwise_from_north() {
        let offsets: Vec<IVec2> = Heading::ALL.iter().map(|h| h.offset()).collect();
        assert_eq!(offsets[0], IVec2::new(0, -1));
        assert_eq!(offsets[2], IVec2::new(1, 0));
        assert_eq!(offsets[4], IVec2::new(0, 1));
        assert_eq!(offsets[6], IVec2::new(-1, 0));
    }

    #[test]
    fn orthogonal_topology_has_no_diagonals() {
        assert!(Topology::Orthogonal.headings().iter().all(|h| !h.is_diagonal()));
        assert_eq!(Topology::Diagonal.headings().len(), 8);
        assert_eq!(
            Topology::Diagonal.headings().iter().filter(|h| h.is_diagonal()).count(),
            4
        );
    }

    #[test]
    fn event_codes_are_distinct() {
        let events = [
            SimEvent::Swapped { a: IVec2::ZERO, b: IVec2::X },
            SimEvent::Matched { size: 3 },
            SimEvent::NoMatch,
            SimEvent::SwapReverted { a: IVec2::ZERO, b: IVec2::X },
            SimEvent::Compacted { falls: 0 },
            SimEvent::Refilled { cells: 0 },
            SimEvent::MoveFinished { matched: false },
            SimEvent::Regenerated,
        ];
        let mut codes: Vec<u8> = events.iter().map(SimEvent::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), events.len());
    }
}
