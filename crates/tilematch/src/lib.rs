pub mod components;
pub mod error;
pub mod grid;
pub mod profile;
pub mod state;
pub mod systems;

#[cfg(target_arch = "wasm32")]
pub mod bridge;

pub use components::{Coord, MoveOutcome, MovePolicy, SimEvent, TileKind, Topology};
pub use error::{BoardError, SwapRejection};
pub use grid::Grid;
pub use profile::{BoardProfile, StepTiming};
pub use state::Session;
pub use systems::resolve::Phase;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("tilematch-sim initialized");
}
