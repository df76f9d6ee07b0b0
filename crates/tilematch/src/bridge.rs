use std::cell::RefCell;
use wasm_bindgen::prelude::*;

use crate::components::{Coord, MovePolicy, Topology};
use crate::error::BoardError;
use crate::profile::BoardProfile;
use crate::state::Session;

thread_local! {
    static SESSION: RefCell<Option<Session>> = RefCell::new(None);
}

fn with_session<R>(f: impl FnOnce(&mut Session) -> R) -> Result<R, JsError> {
    SESSION.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(session) => Ok(f(session)),
            None => Err(JsError::new("session not initialized, call init_session() first")),
        }
    })
}

fn install(session: Session) {
    SESSION.with(|cell| {
        *cell.borrow_mut() = Some(session);
    });
}

/// Start a session on the default 5x5 board.
#[wasm_bindgen]
pub fn init_session(seed: f64) -> Result<(), JsError> {
    let session = Session::new(BoardProfile::default(), seed as u64)
        .map_err(|e| JsError::new(&e.to_string()))?;
    install(session);
    log::info!("tilematch-sim: session initialized with seed {}", seed as u64);
    Ok(())
}

/// Start a session with an explicit board shape.
/// diagonal: 8-way adjacency; revert: undo swaps that match nothing.
#[wasm_bindgen]
pub fn init_session_with_profile(
    seed: f64,
    width: u32,
    height: u32,
    kinds: u8,
    diagonal: bool,
    revert: bool,
) -> Result<(), JsError> {
    let topology = if diagonal {
        Topology::Diagonal
    } else {
        Topology::Orthogonal
    };
    let policy = if revert {
        MovePolicy::ExplicitMatchesOnly
    } else {
        MovePolicy::AllowNonMatching
    };
    let profile = BoardProfile::new(width as usize, height as usize, kinds)
        .with_topology(topology)
        .with_policy(policy);
    let session = Session::new(profile, seed as u64).map_err(|e| JsError::new(&e.to_string()))?;
    install(session);
    Ok(())
}

/// Request a swap. The host then calls `step_session` until it returns 0.
#[wasm_bindgen]
pub fn swap_tiles(ax: i32, ay: i32, bx: i32, by: i32) -> Result<(), JsError> {
    with_session(|s| s.swap(Coord::new(ax, ay), Coord::new(bx, by)))?
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Run one resolution step. Returns the suggested delay in milliseconds
/// before the next step, or 0 once the session is idle again.
#[wasm_bindgen]
pub fn step_session() -> Result<u32, JsError> {
    with_session(|s| -> Result<u32, BoardError> {
        let report = s.step()?;
        Ok(if s.is_busy() { s.timing_for(report.phase).max(1) } else { 0 })
    })?
    .map_err(|e| JsError::new(&e.to_string()))
}

#[wasm_bindgen]
pub fn is_busy() -> Result<bool, JsError> {
    with_session(|s| s.is_busy())
}

/// Returns the current phase as a u8.
#[wasm_bindgen]
pub fn get_phase() -> Result<u8, JsError> {
    with_session(|s| s.phase() as u8)
}

#[wasm_bindgen]
pub fn regenerate_board() -> Result<(), JsError> {
    with_session(|s| s.regenerate())?.map_err(|e| JsError::new(&e.to_string()))
}

#[wasm_bindgen]
pub fn check_playable() -> Result<bool, JsError> {
    with_session(|s| s.check_playable())
}

/// Returns the hinted swap packed as [ax, ay, bx, by], or an empty array.
#[wasm_bindgen]
pub fn get_hint() -> Result<Vec<i32>, JsError> {
    with_session(|s| match s.hint() {
        Some(m) => vec![m.a.x, m.a.y, m.b.x, m.b.y],
        None => Vec::new(),
    })
}

/// Returns a pointer to the cell buffer (for SharedArrayBuffer reads).
#[wasm_bindgen]
pub fn get_cell_buffer_ptr() -> Result<*const u8, JsError> {
    with_session(|s| s.cell_buffer_ptr() as *const u8)
}

/// Returns the number of cells in the buffer (6 bytes each: x, y as u16, kind, flags).
#[wasm_bindgen]
pub fn get_cell_buffer_len() -> Result<u32, JsError> {
    with_session(|s| s.cell_buffer_len() as u32)
}

/// Drain pending events as byte codes (see `SimEvent::code`).
#[wasm_bindgen]
pub fn drain_event_codes() -> Result<Vec<u8>, JsError> {
    with_session(|s| s.drain_events().iter().map(|e| e.code()).collect())
}

#[wasm_bindgen]
pub fn get_board_width() -> Result<u32, JsError> {
    with_session(|s| s.grid().width() as u32)
}

#[wasm_bindgen]
pub fn get_board_height() -> Result<u32, JsError> {
    with_session(|s| s.grid().height() as u32)
}

#[wasm_bindgen]
pub fn get_moves_made() -> Result<u32, JsError> {
    with_session(|s| s.moves_made())
}
