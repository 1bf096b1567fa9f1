//! Solution Reporter
//!
//! Turns a solver assignment back into a per-sprint schedule, recomputes the
//! objective from it and checks it against the planning rules.

pub mod schedule;
pub mod verify;

pub use schedule::*;
pub use verify::*;
