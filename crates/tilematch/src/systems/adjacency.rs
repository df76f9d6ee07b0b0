use crate::components::{Coord, Topology};
use crate::grid::Grid;

/// Occupied neighbors of `c`, clockwise starting above.
///
/// An empty or off-board origin has no neighbors, so adjacency stays
/// symmetric: `b` is a neighbor of `a` exactly when `a` is a neighbor of `b`.
pub fn neighbors(grid: &Grid, c: Coord, topology: Topology) -> Vec<Coord> {
    if !grid.is_occupied(c) {
        return Vec::new();
    }
    topology
        .headings()
        .iter()
        .map(|h| c + h.offset())
        .filter(|&n| grid.is_occupied(n))
        .collect()
}

pub fn are_adjacent(grid: &Grid, a: Coord, b: Coord, topology: Topology) -> bool {
    neighbors(grid, a, topology).contains(&b)
}

/// Geometric adjacency, ignoring cell contents.
pub fn is_step(a: Coord, b: Coord, topology: Topology) -> bool {
    let d = b - a;
    topology.headings().iter().any(|h| h.offset() == d)
}
