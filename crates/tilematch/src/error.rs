use thiserror::Error;

use crate::components::TileKind;

/// Why a swap request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRejection {
    SameCell,
    EmptyCell,
    NotAdjacent,
}

impl std::fmt::Display for SwapRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SwapRejection::SameCell => "both coordinates name the same cell",
            SwapRejection::EmptyCell => "one of the cells is empty",
            SwapRejection::NotAdjacent => "cells are not adjacent",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("coordinate ({x}, {y}) is outside the board")]
    OutOfBounds { x: i32, y: i32 },
    #[error("invalid swap: {0}")]
    InvalidSwap(SwapRejection),
    #[error("no playable board after {attempts} generation attempts")]
    UngeneratableBoard { attempts: usize },
    #[error("tileset is empty")]
    EmptyTileset,
    #[error("tile kind {0} appears more than once in the tileset")]
    DuplicateTileKind(TileKind),
    #[error("board dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: usize, height: usize },
    #[error("a resolution cycle is in progress")]
    Busy,
    #[error("cascade limit must be at least 1")]
    InvalidCascadeLimit,
    #[error("cell ({x}, {y}) is empty")]
    UnfilledCell { x: i32, y: i32 },
    #[error("tile kind {0} is not in the tileset")]
    UnknownTileKind(TileKind),
}
