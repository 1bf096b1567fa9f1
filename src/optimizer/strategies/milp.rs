//! MILP solver adapter
//!
//! Translates a [`PlanningModel`] into a `good_lp` problem and solves it with the
//! pure-Rust microlp engine (branch and bound over the LP relaxation). No native
//! solver library is required, so the adapter runs anywhere the crate builds.
//!
//! An optional wall-clock budget is handed to microlp itself. When it expires
//! with an incumbent the outcome is `FeasibleSuboptimal`; without one it is
//! `NotSolved`.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::optimizer::model::PlanningModel;
use crate::optimizer::types::{PlanningSolver, SolveStatus, SolverOutcome};

/// Warn when the model grows beyond this many binaries; microlp branches naively
const LARGE_MODEL_BINARIES: usize = 2_000;

#[derive(Debug, Clone, Default)]
pub struct MilpSolver {
    /// Wall-clock budget for one solve
    time_limit: Option<Duration>,
}

impl MilpSolver {
    pub fn new(time_limit: Option<Duration>) -> Self {
        Self { time_limit }
    }

    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self::new(Some(time_limit))
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

impl PlanningSolver for MilpSolver {
    fn name(&self) -> &'static str {
        "milp-microlp"
    }

    fn solve(&self, model: &PlanningModel) -> SolverOutcome {
        let binaries = model.assignment_vars().len();
        if binaries > LARGE_MODEL_BINARIES && self.time_limit.is_none() {
            warn!(
                binaries,
                "large planning model, consider setting a solver time limit"
            );
        }

        let started = Instant::now();
        let outcome = solve_lp(model, self.time_limit);
        debug!(
            status = %outcome.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "MILP solve finished"
        );
        outcome
    }
}

#[cfg(feature = "optimization")]
fn solve_lp(model: &PlanningModel, time_limit: Option<Duration>) -> SolverOutcome {
    use good_lp::solvers::microlp::microlp;
    use good_lp::{
        constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable,
        WithTimeLimit,
    };

    use crate::optimizer::model::{LinearExpr, Relation, VarKind};
    use crate::optimizer::types::Assignment;

    fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
        expr.terms()
            .iter()
            .map(|(var, coefficient)| *coefficient * vars[var.index()])
            .sum()
    }

    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = model
        .variables()
        .iter()
        .map(|info| {
            let definition = match info.kind {
                VarKind::Binary => variable().binary(),
                VarKind::Integer => variable().integer().min(0.0),
            };
            problem.add(definition.name(info.name.clone()))
        })
        .collect();

    let objective = to_expression(model.objective(), &vars);
    let mut lp = problem.maximise(objective.clone()).using(microlp);
    if let Some(limit) = time_limit {
        lp = lp.with_time_limit(limit.as_secs_f64());
    }

    for c in model.constraints() {
        let lhs = to_expression(&c.lhs, &vars);
        let rhs = c.rhs;
        lp = match c.relation {
            Relation::LessOrEqual => lp.with(constraint!(lhs <= rhs)),
            Relation::Equal => lp.with(constraint!(lhs == rhs)),
        };
    }

    match lp.solve() {
        Ok(solution) => {
            let status = solved_status(solution.status());
            if status == SolveStatus::FeasibleSuboptimal {
                warn!(?time_limit, "MILP stopped early with an incumbent");
            }
            let values = vars.iter().map(|&v| solution.value(v)).collect();
            let objective_value = solution.eval(objective);
            SolverOutcome::solved(status, Assignment::new(values, objective_value))
        }
        Err(err) => resolution_failure(err),
    }
}

#[cfg(feature = "optimization")]
fn solved_status(status: good_lp::SolutionStatus) -> SolveStatus {
    match status {
        good_lp::SolutionStatus::Optimal => SolveStatus::Optimal,
        good_lp::SolutionStatus::TimeLimit | good_lp::SolutionStatus::GapLimit => {
            SolveStatus::FeasibleSuboptimal
        }
    }
}

#[cfg(feature = "optimization")]
fn resolution_failure(err: good_lp::ResolutionError) -> SolverOutcome {
    use good_lp::ResolutionError;

    match err {
        ResolutionError::Infeasible => SolverOutcome::failed(
            SolveStatus::Infeasible,
            "no assignment satisfies all constraints",
        ),
        ResolutionError::Unbounded => {
            SolverOutcome::failed(SolveStatus::Unbounded, "objective is unbounded")
        }
        // microlp interrupted before any feasible incumbent
        ResolutionError::Other(msg) if msg.to_lowercase().contains("time limit") => {
            warn!("MILP time limit reached without a feasible assignment");
            SolverOutcome::failed(
                SolveStatus::NotSolved,
                "time limit reached before a feasible assignment was found",
            )
        }
        err => SolverOutcome::failed(SolveStatus::NotSolved, err.to_string()),
    }
}

#[cfg(not(feature = "optimization"))]
fn solve_lp(_model: &PlanningModel, _time_limit: Option<Duration>) -> SolverOutcome {
    SolverOutcome::failed(
        SolveStatus::NotSolved,
        "MILP optimization requires 'optimization' feature to be enabled",
    )
}
