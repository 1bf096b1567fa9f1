//! Model Builder
//!
//! Encodes a validated [`PlanningProblem`] as a maximization MILP:
//!
//! ```text
//! max  Σ_i Σ_j utility[j]·risk[j]·X[i,j]
//!    + Σ_i Σ_j∈corr utility[j]·affinity[j]·Y[i,j] / max(1, cap[j])
//! ```
//!
//! subject to capacity, inclusion, dependency and correlation constraints.
//! Dependencies with threshold 1 use the same inequality whether they list one
//! prerequisite (AND) or several (OR): at least one prerequisite in an earlier
//! sprint. A caller wanting "all of several" must set the threshold to the
//! number of prerequisites.

use itertools::iproduct;
use tracing::debug;

use super::model::{
    AssignmentVars, BonusVars, ConstraintFamily, LinearConstraint, LinearExpr, PlanningModel,
    Relation, VariableRegistry,
};
use crate::domain::{DependencyMode, PlanningProblem, SprintId};

pub struct ModelBuilder<'a> {
    problem: &'a PlanningProblem,
    registry: VariableRegistry,
    constraints: Vec<LinearConstraint>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(problem: &'a PlanningProblem) -> Self {
        Self {
            problem,
            registry: VariableRegistry::default(),
            constraints: Vec::new(),
        }
    }

    pub fn build(mut self) -> PlanningModel {
        let problem = self.problem;
        let stories = problem.stories();
        let n_sprints = problem.sprints().len();

        let assignment = self
            .registry
            .assignment_grid(n_sprints, stories.len(), |i, j| {
                format!("X[{},{}]", SprintId::from_position(i), stories[j].id)
            });

        // Correlation links are sorted by story position and unique per story
        let correlating: Vec<usize> = problem.correlations().iter().map(|c| c.story).collect();
        let bonus = self
            .registry
            .bonus_grid(n_sprints, stories.len(), &correlating, |i, j| {
                format!("Y[{},{}]", SprintId::from_position(i), stories[j].id)
            });

        let objective = self.objective(&assignment, &bonus);
        self.capacity_constraints(&assignment);
        self.inclusion_constraints(&assignment);
        self.dependency_constraints(&assignment);
        self.correlation_constraints(&assignment, &bonus);

        let model = PlanningModel {
            variables: self.registry.into_variables(),
            assignment,
            bonus,
            objective,
            constraints: self.constraints,
        };

        debug!(
            assignment_vars = model.assignment_vars().len(),
            bonus_vars = model.bonus_vars().len(),
            constraints = model.constraints().len(),
            "planning model built"
        );

        model
    }

    fn objective(&self, assignment: &AssignmentVars, bonus: &BonusVars) -> LinearExpr {
        let stories = self.problem.stories();
        let n_sprints = self.problem.sprints().len();

        let mut objective: LinearExpr = iproduct!(0..n_sprints, 0..stories.len())
            .map(|(i, j)| (assignment.get(i, j), stories[j].base_value()))
            .collect();

        for link in self.problem.correlations() {
            let coefficient = stories[link.story].utility * link.affinity / link.bonus_divisor();
            for i in 0..n_sprints {
                if let Some(y) = bonus.get(i, link.story) {
                    objective.add_term(y, coefficient);
                }
            }
        }

        objective
    }

    /// Σ_j points[j]·X[i,j] <= capacity[i]
    fn capacity_constraints(&mut self, assignment: &AssignmentVars) {
        let problem = self.problem;
        for (i, sprint) in problem.sprints().iter().enumerate() {
            let lhs = problem
                .stories()
                .iter()
                .enumerate()
                .map(|(j, story)| (assignment.get(i, j), f64::from(story.story_points)))
                .collect();
            self.push(
                format!("capacity_sprint_{}", sprint.id),
                ConstraintFamily::Capacity,
                lhs,
                Relation::LessOrEqual,
                f64::from(sprint.capacity),
            );
        }
    }

    /// Σ_i X[i,j] = 1
    fn inclusion_constraints(&mut self, assignment: &AssignmentVars) {
        let problem = self.problem;
        let n_sprints = problem.sprints().len();
        for (j, story) in problem.stories().iter().enumerate() {
            let lhs = (0..n_sprints).map(|i| (assignment.get(i, j), 1.0)).collect();
            self.push(
                format!("inclusion_{}", story.id),
                ConstraintFamily::Inclusion,
                lhs,
                Relation::Equal,
                1.0,
            );
        }
    }

    /// c·X[i,j] - Σ_{k<i, d∈prereqs(j)} X[k,d] <= 0
    ///
    /// In the first sprint the sum is empty, so no dependent story can start there.
    fn dependency_constraints(&mut self, assignment: &AssignmentVars) {
        let problem = self.problem;
        let stories = problem.stories();
        let n_sprints = problem.sprints().len();

        for link in problem.dependencies() {
            let story = stories[link.dependent].id;
            let family = match link.mode {
                DependencyMode::SingleAnd => ConstraintFamily::DependencyAnd,
                DependencyMode::OrGroup => ConstraintFamily::DependencyOr,
                DependencyMode::MultiAnd => ConstraintFamily::DependencyMultiAnd,
            };
            if link.mode == DependencyMode::OrGroup {
                debug!(
                    %story,
                    prerequisites = link.prerequisites.len(),
                    "threshold 1 over several prerequisites: any one prerequisite suffices"
                );
            }

            for i in 0..n_sprints {
                let mut lhs = LinearExpr::new()
                    .with_term(assignment.get(i, link.dependent), f64::from(link.required));
                for (k, &d) in iproduct!(0..i, &link.prerequisites) {
                    lhs.add_term(assignment.get(k, d), -1.0);
                }
                self.push(
                    format!("{family}_sprint_{}_{story}", SprintId::from_position(i)),
                    family,
                    lhs,
                    Relation::LessOrEqual,
                    0.0,
                );
            }
        }
    }

    /// Y[i,j] - Σ_{k∈partners(j)} X[i,k] <= 0 and Y[i,j] - cap[j]·X[i,j] <= 0
    fn correlation_constraints(&mut self, assignment: &AssignmentVars, bonus: &BonusVars) {
        let problem = self.problem;
        let stories = problem.stories();
        let n_sprints = problem.sprints().len();

        for link in problem.correlations() {
            let story = stories[link.story].id;
            for i in 0..n_sprints {
                let Some(y) = bonus.get(i, link.story) else {
                    continue;
                };
                let sprint = SprintId::from_position(i);

                let mut partner = LinearExpr::new().with_term(y, 1.0);
                for &k in &link.partners {
                    partner.add_term(assignment.get(i, k), -1.0);
                }
                self.push(
                    format!("correlation_partner_sprint_{sprint}_{story}"),
                    ConstraintFamily::CorrelationPartner,
                    partner,
                    Relation::LessOrEqual,
                    0.0,
                );

                let cap = LinearExpr::new()
                    .with_term(y, 1.0)
                    .with_term(assignment.get(i, link.story), -f64::from(link.cap));
                self.push(
                    format!("correlation_cap_sprint_{sprint}_{story}"),
                    ConstraintFamily::CorrelationCap,
                    cap,
                    Relation::LessOrEqual,
                    0.0,
                );
            }
        }
    }

    fn push(
        &mut self,
        name: String,
        family: ConstraintFamily,
        lhs: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name,
            family,
            lhs,
            relation,
            rhs,
        });
    }
}

/// Build the planning model for `problem`
pub fn build_model(problem: &PlanningProblem) -> PlanningModel {
    ModelBuilder::new(problem).build()
}
