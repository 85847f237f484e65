//! Compute module - route scoring, concurrent evaluation, planning and team analysis.

mod context;
mod explored;
mod fitness;
mod planner;
mod pool;
mod report;
mod team;

pub mod evolution;

pub use context::*;
pub use explored::*;
pub use fitness::*;
pub use planner::*;
pub use pool::*;
pub use report::*;
pub use team::*;
