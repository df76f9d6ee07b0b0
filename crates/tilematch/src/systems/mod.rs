pub mod adjacency;
pub mod board;
pub mod matcher;
pub mod playability;
pub mod resolve;
