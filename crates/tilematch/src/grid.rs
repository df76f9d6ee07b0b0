use crate::components::{Coord, TileKind};
use crate::error::BoardError;

/// Largest width or height a board may have. Cell coordinates must fit a `u16`.
pub const MAX_DIMENSION: usize = u16::MAX as usize;

/// The board grid. Uses column-major layout: x is column, y is row, row 0 on top.
/// `None` means an empty cell, which only exists during a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Flat storage in column-major order: index = x * height + y
    cells: Vec<Option<TileKind>>,
}

impl Grid {
    /// Create an all-empty grid. Both dimensions must lie in `1..=MAX_DIMENSION`.
    pub fn new(width: usize, height: usize) -> Result<Self, BoardError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(BoardError::InvalidDimensions { width, height });
        }
        Ok(Grid {
            width,
            height,
            cells: vec![None; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as usize) < self.width && (c.y as usize) < self.height
    }

    #[inline]
    fn idx(&self, c: Coord) -> Option<usize> {
        self.in_bounds(c)
            .then(|| c.x as usize * self.height + c.y as usize)
    }

    fn checked_idx(&self, c: Coord) -> Result<usize, BoardError> {
        self.idx(c).ok_or(BoardError::OutOfBounds { x: c.x, y: c.y })
    }

    pub fn get(&self, c: Coord) -> Result<Option<TileKind>, BoardError> {
        let i = self.checked_idx(c)?;
        Ok(self.cells[i])
    }

    /// Kind at `c`, or `None` when the cell is empty or off the board.
    /// Scanners use this to stop a walk at the first gap or edge.
    #[inline]
    pub fn kind_at(&self, c: Coord) -> Option<TileKind> {
        self.idx(c).and_then(|i| self.cells[i])
    }

    pub fn is_occupied(&self, c: Coord) -> bool {
        self.kind_at(c).is_some()
    }

    pub fn set(&mut self, c: Coord, kind: Option<TileKind>) -> Result<(), BoardError> {
        let i = self.checked_idx(c)?;
        self.cells[i] = kind;
        Ok(())
    }

    /// Exchange the contents of two cells.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), BoardError> {
        let ia = self.checked_idx(a)?;
        let ib = self.checked_idx(b)?;
        self.cells.swap(ia, ib);
        Ok(())
    }

    /// Move a tile down its column, leaving the source cell empty.
    /// Callers stay inside `0..height`; both rows are in bounds by construction.
    pub(crate) fn move_within_column(&mut self, x: usize, from_y: usize, to_y: usize) {
        let from_i = x * self.height + from_y;
        let to_i = x * self.height + to_y;
        self.cells[to_i] = self.cells[from_i].take();
    }

    /// Every coordinate in row-major order, top-left first.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Coord::new(x, y)))
    }

    /// Occupied coordinates in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = Coord> + '_ {
        self.coords().filter(|&c| self.is_occupied(c))
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// True when no column has an empty cell sitting below a tile.
    pub fn is_packed(&self) -> bool {
        (0..self.width).all(|x| {
            let column = &self.cells[x * self.height..(x + 1) * self.height];
            // top to bottom: once a tile is seen, nothing below may be empty
            let first_tile = column.iter().position(Option::is_some);
            match first_tile {
                Some(top) => column[top..].iter().all(Option::is_some),
                None => true,
            }
        })
    }

    pub(crate) fn index_of(&self, c: Coord) -> Option<usize> {
        self.idx(c)
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Build a grid from ASCII rows: `A`..`Z` map to kinds 0..25, `.` is empty.
#[cfg(test)]
pub(crate) fn from_ascii(rows: &[&str]) -> Grid {
    let height = rows.len();
    let width = rows[0].len();
    let mut grid = Grid::new(width, height).unwrap();
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), width, "ragged row {}", y);
        for (x, ch) in row.chars().enumerate() {
            let kind = match ch {
                '.' => None,
                'A'..='Z' => Some(TileKind(ch as u8 - b'A')),
                other => panic!("unexpected cell {:?}", other),
            };
            grid.set(Coord::new(x as i32, y as i32), kind).unwrap();
        }
    }
    grid
}

#[cfg(test)]
pub(crate) fn to_ascii(grid: &Grid) -> Vec<String> {
    (0..grid.height() as i32)
        .map(|y| {
            (0..grid.width() as i32)
                .map(|x| match grid.kind_at(Coord::new(x, y)) {
                    Some(k) => (b'A' + k.0) as char,
                    None => '.',
                })
                .collect()
        })
        .collect()
}
