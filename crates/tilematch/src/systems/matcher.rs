use glam::IVec2;

use crate::components::{Coord, TileKind, Topology, MIN_RUN};
use crate::grid::Grid;
use crate::systems::adjacency::neighbors;

/// A merged group of same-kind cells that will be cleared together.
/// Cells are distinct and sorted row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet {
    pub kind: TileKind,
    pub cells: Vec<Coord>,
}

impl MatchSet {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.cells.contains(&c)
    }
}

fn sort_row_major(cells: &mut Vec<Coord>) {
    cells.sort_by_key(|c| (c.y, c.x));
    cells.dedup();
}

/// Step from `from` along `step` while cells hold `kind`, pushing each one.
fn walk(grid: &Grid, from: Coord, step: IVec2, kind: TileKind, out: &mut Vec<Coord>) {
    let mut c = from + step;
    while grid.kind_at(c) == Some(kind) {
        out.push(c);
        c += step;
    }
}

/// Length of the same-kind line through `origin` along `axis` (both ways),
/// reading cells through `kind_at`. `origin` itself is assumed to hold `kind`.
pub(crate) fn line_length<F>(kind_at: F, origin: Coord, kind: TileKind, axis: IVec2) -> usize
where
    F: Fn(Coord) -> Option<TileKind>,
{
    let mut len = 1;
    for step in [axis, -axis] {
        let mut c = origin + step;
        while kind_at(c) == Some(kind) {
            len += 1;
            c += step;
        }
    }
    len
}

/// All cells of every run of at least three that passes through `origin`.
///
/// Each same-kind neighbor fixes a heading; the run is the whole same-kind
/// line along that heading's axis, so an origin in the middle of a run still
/// credits the full run. Runs along different headings are unioned.
pub fn find_runs_through(grid: &Grid, origin: Coord, topology: Topology) -> Vec<Coord> {
    let Some(kind) = grid.kind_at(origin) else {
        return Vec::new();
    };

    let mut result: Vec<Coord> = Vec::new();
    for n in neighbors(grid, origin, topology) {
        if grid.kind_at(n) != Some(kind) {
            continue;
        }
        let heading = n - origin;
        let mut run = vec![origin];
        walk(grid, origin, heading, kind, &mut run);
        walk(grid, origin, -heading, kind, &mut run);
        if run.len() >= MIN_RUN {
            result.extend(run);
        }
    }

    sort_row_major(&mut result);
    result
}

/// Scan the whole board and return one match-set per connected group of runs.
///
/// Runs sharing a cell are merged transitively, so an L, T or cross shape is
/// a single set. Sets come out in order of their first cell, row-major.
pub fn find_all_matches(grid: &Grid, topology: Topology) -> Vec<MatchSet> {
    let mut claimed = vec![false; grid.len()];
    let mut sets = Vec::new();

    for origin in grid.occupied() {
        let Some(origin_idx) = grid.index_of(origin) else {
            continue;
        };
        if claimed[origin_idx] {
            continue;
        }
        let seed = find_runs_through(grid, origin, topology);
        if seed.is_empty() {
            continue;
        }

        let mut cells = Vec::new();
        let mut frontier = seed;
        while let Some(c) = frontier.pop() {
            let Some(i) = grid.index_of(c) else {
                continue;
            };
            if claimed[i] {
                continue;
            }
            claimed[i] = true;
            cells.push(c);
            frontier.extend(find_runs_through(grid, c, topology));
        }

        sort_row_major(&mut cells);
        if let Some(kind) = grid.kind_at(origin) {
            log::debug!("match-set of {} {:?} cells at {:?}", cells.len(), kind, cells[0]);
            sets.push(MatchSet { kind, cells });
        }
    }

    sets
}
