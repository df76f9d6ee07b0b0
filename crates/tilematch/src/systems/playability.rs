use glam::IVec2;

use crate::components::{Coord, Heading, TileKind, Topology, MIN_RUN};
use crate::grid::Grid;
use crate::systems::adjacency::neighbors;
use crate::systems::matcher::line_length;

/// A swap that would produce at least one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapMove {
    pub a: Coord,
    pub b: Coord,
}

/// One heading per line axis: horizontal, vertical and, with diagonals, both slopes.
fn axes(topology: Topology) -> &'static [Heading] {
    const ORTHOGONAL: [Heading; 2] = [Heading::E, Heading::S];
    const DIAGONAL: [Heading; 4] = [Heading::E, Heading::S, Heading::SE, Heading::SW];
    match topology {
        Topology::Orthogonal => &ORTHOGONAL,
        Topology::Diagonal => &DIAGONAL,
    }
}

/// Would swapping `a` and `b` line up three or more at either end of the swap?
///
/// Reads the board through a swapped view; the grid itself is never touched.
pub fn swap_creates_match(grid: &Grid, a: Coord, b: Coord, topology: Topology) -> bool {
    let view = |p: Coord| -> Option<TileKind> {
        if p == a {
            grid.kind_at(b)
        } else if p == b {
            grid.kind_at(a)
        } else {
            grid.kind_at(p)
        }
    };

    [a, b].into_iter().any(|pos| {
        let Some(kind) = view(pos) else {
            return false;
        };
        axes(topology).iter().any(|h| {
            let axis: IVec2 = h.offset();
            line_length(&view, pos, kind, axis) >= MIN_RUN
        })
    })
}

/// Every legal matching swap, each unordered pair once, in scan order.
pub fn legal_moves(grid: &Grid, topology: Topology) -> Vec<SwapMove> {
    let mut moves = Vec::new();
    for_each_move(grid, topology, |m| {
        moves.push(m);
        false
    });
    moves
}

/// First matching swap in scan order. Used as a hint for the player.
pub fn find_legal_move(grid: &Grid, topology: Topology) -> Option<SwapMove> {
    let mut found = None;
    for_each_move(grid, topology, |m| {
        found = Some(m);
        true
    });
    found
}

/// `false` only when no swap anywhere on the board would yield a match.
pub fn has_legal_move(grid: &Grid, topology: Topology) -> bool {
    find_legal_move(grid, topology).is_some()
}

/// Visit matching swaps until `visit` returns true.
fn for_each_move<F>(grid: &Grid, topology: Topology, mut visit: F)
where
    F: FnMut(SwapMove) -> bool,
{
    for a in grid.occupied() {
        for b in neighbors(grid, a, topology) {
            // each unordered pair once: only look forward in row-major order
            if (b.y, b.x) < (a.y, a.x) {
                continue;
            }
            if grid.kind_at(a) == grid.kind_at(b) {
                continue;
            }
            if swap_creates_match(grid, a, b, topology) && visit(SwapMove { a, b }) {
                return;
            }
        }
    }
}
