//! Schema module - Grid, path and configuration types for rescue path search.

mod config;
mod evolution;
mod grid;
mod path;

pub use config::*;
pub use evolution::*;
pub use grid::*;
pub use path::*;
