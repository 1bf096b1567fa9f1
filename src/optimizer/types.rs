use serde::{Deserialize, Serialize};
use strum::Display;

use super::model::{PlanningModel, VarId};

/// Outcome of one solver run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// Feasible incumbent returned before optimality was proven
    FeasibleSuboptimal,
    Infeasible,
    Unbounded,
    /// Solver failed or ran out of time
    NotSolved,
}

impl SolveStatus {
    /// Whether this status carries a variable assignment
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::FeasibleSuboptimal)
    }
}

/// Concrete variable values produced by a solver, indexed by [`VarId`]
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
    objective_value: f64,
}

impl Assignment {
    pub fn new(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            values,
            objective_value,
        }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Binary variable read with a 0.5 threshold
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }

    /// Integer variable rounded to the nearest non-negative unit
    pub fn units(&self, var: VarId) -> u32 {
        self.value(var).round().max(0.0) as u32
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Objective value reported by the solver
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
    /// Solver message for failed runs
    pub detail: Option<String>,
}

impl SolverOutcome {
    pub fn solved(status: SolveStatus, assignment: Assignment) -> Self {
        Self {
            status,
            assignment: Some(assignment),
            detail: None,
        }
    }

    pub fn failed(status: SolveStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            assignment: None,
            detail: Some(detail.into()),
        }
    }
}

/// Solver adapter: one blocking call per model, no retries.
pub trait PlanningSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &PlanningModel) -> SolverOutcome;
}
