//! Solver Strategies
//!
//! Backends implementing [`PlanningSolver`](crate::optimizer::PlanningSolver):
//! - MILP: good_lp over the pure-Rust microlp engine (exact solution)

pub mod milp;

pub use milp::*;
