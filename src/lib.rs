//! Sprint planner
//!
//! Allocates a backlog of stories across capacity-bounded sprints by solving a
//! mixed-integer program that maximizes risk-adjusted utility plus correlation
//! bonuses, subject to capacity, inclusion and dependency constraints.

pub mod config;
pub mod domain;
pub mod loader;
pub mod optimizer;
pub mod planner;
pub mod report;
pub mod telemetry;
