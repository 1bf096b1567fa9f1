//! Build-solve-report pipeline
//!
//! Problem data → model builder → solver adapter → solution reporter. Every run
//! builds a fresh model; a failed or infeasible solve never yields a schedule.

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{PlanningProblem, ProblemInput, ValidationError};
use crate::optimizer::{build_model, PlanningSolver, SolveStatus};
use crate::report::{verify, SolutionReport, Violation};

/// Default relative tolerance for the objective cross-check
pub const DEFAULT_OBJECTIVE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid planning problem: {0}")]
    Validation(#[from] ValidationError),
    #[error("no schedule satisfies all constraints")]
    Infeasible,
    #[error("objective is unbounded")]
    Unbounded,
    #[error("solver did not finish: {detail}")]
    NotSolved { detail: String },
    #[error("solver returned {status} without an assignment")]
    MissingAssignment { status: SolveStatus },
    #[error("solver assignment breaks {} planning rule(s)", .0.len())]
    UnsoundSolution(Vec<Violation>),
}

pub struct SprintPlanner {
    solver: Box<dyn PlanningSolver>,
    objective_tolerance: f64,
}

impl SprintPlanner {
    pub fn new(solver: Box<dyn PlanningSolver>) -> Self {
        Self {
            solver,
            objective_tolerance: DEFAULT_OBJECTIVE_TOLERANCE,
        }
    }

    pub fn with_objective_tolerance(mut self, tolerance: f64) -> Self {
        self.objective_tolerance = tolerance;
        self
    }

    /// Validate raw input, then plan
    pub fn plan_input(&self, input: ProblemInput) -> Result<SolutionReport, PlanError> {
        let problem = PlanningProblem::new(input)?;
        self.plan(&problem)
    }

    pub fn plan(&self, problem: &PlanningProblem) -> Result<SolutionReport, PlanError> {
        let model = build_model(problem);
        info!(
            solver = self.solver.name(),
            sprints = problem.sprints().len(),
            stories = problem.stories().len(),
            variables = model.variables().len(),
            constraints = model.constraints().len(),
            "solving sprint plan"
        );

        let outcome = self.solver.solve(&model);
        let assignment = match outcome.status {
            SolveStatus::Optimal | SolveStatus::FeasibleSuboptimal => outcome
                .assignment
                .ok_or(PlanError::MissingAssignment {
                    status: outcome.status,
                })?,
            SolveStatus::Infeasible => {
                warn!(
                    total_points = problem.total_story_points(),
                    total_capacity = problem.total_capacity(),
                    "sprint plan infeasible"
                );
                return Err(PlanError::Infeasible);
            }
            SolveStatus::Unbounded => return Err(PlanError::Unbounded),
            SolveStatus::NotSolved => {
                return Err(PlanError::NotSolved {
                    detail: outcome.detail.unwrap_or_default(),
                })
            }
        };

        let violations = verify(problem, &model, &assignment);
        if !violations.is_empty() {
            for violation in &violations {
                warn!(%violation, "solver assignment rejected");
            }
            return Err(PlanError::UnsoundSolution(violations));
        }

        let report = SolutionReport::from_assignment(problem, &model, outcome.status, &assignment);
        if !report.objective_consistent(self.objective_tolerance) {
            warn!(
                reported = report.objective_value,
                recomputed = report.realized.total(),
                "objective cross-check mismatch"
            );
        }

        info!(
            status = %report.status,
            objective = report.objective_value,
            "sprint plan ready"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dependency, Sprint, Story, StoryId};
    use crate::optimizer::{Assignment, PlanningModel, SolverOutcome};

    /// Replays a fixed outcome, placing every story in the sprint given by `placement`
    struct FixedSolver {
        status: SolveStatus,
        placement: Option<Vec<usize>>,
    }

    impl PlanningSolver for FixedSolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, model: &PlanningModel) -> SolverOutcome {
            match &self.placement {
                Some(placement) => {
                    let mut values = vec![0.0; model.variables().len()];
                    for (j, &i) in placement.iter().enumerate() {
                        values[model.assignment_var(i, j).index()] = 1.0;
                    }
                    let objective = model.objective().evaluate(&values);
                    SolverOutcome::solved(self.status, Assignment::new(values, objective))
                }
                None => SolverOutcome::failed(self.status, "fixed failure"),
            }
        }
    }

    fn input() -> ProblemInput {
        ProblemInput {
            sprints: vec![Sprint::new(1, 10), Sprint::new(2, 10)],
            stories: vec![
                Story::new(1, 6, 50.0, 1.0),
                Story::new(2, 5, 40.0, 1.0),
                Story::new(3, 4, 20.0, 1.0),
            ],
            dependencies: vec![Dependency::new(2, &[1], 1)],
            correlations: vec![],
        }
    }

    fn planner(status: SolveStatus, placement: Option<Vec<usize>>) -> SprintPlanner {
        SprintPlanner::new(Box::new(FixedSolver { status, placement }))
    }

    #[test]
    fn test_plan_returns_report_for_sound_assignment() {
        let report = planner(SolveStatus::FeasibleSuboptimal, Some(vec![0, 1, 1]))
            .plan_input(input())
            .unwrap();
        assert_eq!(report.status, SolveStatus::FeasibleSuboptimal);
        assert_eq!(report.sprint_of(StoryId(2)), Some(crate::domain::SprintId(2)));
        assert!((report.objective_value - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_rejects_unsound_assignment() {
        let err = planner(SolveStatus::Optimal, Some(vec![1, 0, 0]))
            .plan_input(input())
            .unwrap_err();
        match err {
            PlanError::UnsoundSolution(violations) => {
                assert!(matches!(violations[..], [Violation::Precedence { .. }]))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_maps_failure_statuses() {
        let err = planner(SolveStatus::Infeasible, None).plan_input(input()).unwrap_err();
        assert!(matches!(err, PlanError::Infeasible));

        let err = planner(SolveStatus::Unbounded, None).plan_input(input()).unwrap_err();
        assert!(matches!(err, PlanError::Unbounded));

        let err = planner(SolveStatus::NotSolved, None).plan_input(input()).unwrap_err();
        assert_eq!(err.to_string(), "solver did not finish: fixed failure");

        let err = planner(SolveStatus::Optimal, None).plan_input(input()).unwrap_err();
        assert!(matches!(
            err,
            PlanError::MissingAssignment {
                status: SolveStatus::Optimal
            }
        ));
    }

    #[test]
    fn test_plan_surfaces_validation_errors() {
        let mut bad = input();
        bad.sprints[0].capacity = 0;
        let err = planner(SolveStatus::Optimal, Some(vec![0, 1, 1]))
            .plan_input(bad)
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }
}
