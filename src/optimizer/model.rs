//! Solver-agnostic MILP model
//!
//! Linear expressions over typed variable handles, named constraints tagged with
//! the family they belong to, and the two variable grids of the planning model:
//! - X[sprint, story]: binary assignment
//! - Y[sprint, story]: non-negative integer correlation bonus, correlating stories only
//!
//! Every expression can be evaluated against a plain value vector, so a model
//! can be checked against any assignment without a solver.

use serde::Serialize;
use strum::{Display, EnumIter};

/// Handle of a decision variable inside one [`PlanningModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VarKind {
    Binary,
    /// Non-negative integer, unbounded above
    Integer,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

/// Sum of `coefficient * variable` terms; constraint constants live in the rhs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// Combined coefficient of `var` (terms may repeat a variable)
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.index()])
            .sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Relation {
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = "=")]
    Equal,
}

/// Which part of the planning formulation a constraint encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    /// Sprint points within capacity
    Capacity,
    /// Story scheduled exactly once
    Inclusion,
    /// Single prerequisite, threshold 1
    DependencyAnd,
    /// Any one of several prerequisites
    DependencyOr,
    /// Threshold count of several prerequisites
    DependencyMultiAnd,
    /// Bonus needs a partner in the same sprint
    CorrelationPartner,
    /// Bonus needs the story itself in the sprint, capped
    CorrelationCap,
}

/// `lhs (<= | =) rhs`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub family: ConstraintFamily,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs.evaluate(values);
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs + tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Dense X[sprint, story] grid, row-major by sprint
#[derive(Debug, Clone)]
pub struct AssignmentVars {
    stories: usize,
    ids: Vec<VarId>,
}

impl AssignmentVars {
    pub fn get(&self, sprint: usize, story: usize) -> VarId {
        self.ids[sprint * self.stories + story]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Y[sprint, story] restricted to correlating stories
#[derive(Debug, Clone)]
pub struct BonusVars {
    /// Column of each story in the grid, `None` for non-correlating stories
    columns: Vec<Option<usize>>,
    width: usize,
    ids: Vec<VarId>,
}

impl BonusVars {
    pub fn get(&self, sprint: usize, story: usize) -> Option<VarId> {
        let column = self.columns.get(story).copied().flatten()?;
        self.ids.get(sprint * self.width + column).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A complete, self-contained maximization model.
#[derive(Debug, Clone)]
pub struct PlanningModel {
    pub(crate) variables: Vec<Variable>,
    pub(crate) assignment: AssignmentVars,
    pub(crate) bonus: BonusVars,
    pub(crate) objective: LinearExpr,
    pub(crate) constraints: Vec<LinearConstraint>,
}

impl PlanningModel {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.index()]
    }

    /// X[sprint, story] by zero-based positions
    pub fn assignment_var(&self, sprint: usize, story: usize) -> VarId {
        self.assignment.get(sprint, story)
    }

    /// Y[sprint, story] by zero-based positions, if the story correlates
    pub fn bonus_var(&self, sprint: usize, story: usize) -> Option<VarId> {
        self.bonus.get(sprint, story)
    }

    pub fn assignment_vars(&self) -> &AssignmentVars {
        &self.assignment
    }

    pub fn bonus_vars(&self) -> &BonusVars {
        &self.bonus
    }

    /// Objective to maximize
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn family_count(&self, family: ConstraintFamily) -> usize {
        self.constraints.iter().filter(|c| c.family == family).count()
    }

    /// Constraints violated by `values` beyond `tolerance`
    pub fn violated<'a>(
        &'a self,
        values: &'a [f64],
        tolerance: f64,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(values, tolerance))
    }
}

/// Incremental variable registry used by the model builder
#[derive(Debug, Default)]
pub(crate) struct VariableRegistry {
    variables: Vec<Variable>,
}

impl VariableRegistry {
    pub(crate) fn add(&mut self, name: String, kind: VarKind) -> VarId {
        self.variables.push(Variable { name, kind });
        VarId(self.variables.len() - 1)
    }

    pub(crate) fn assignment_grid(
        &mut self,
        sprints: usize,
        stories: usize,
        mut name: impl FnMut(usize, usize) -> String,
    ) -> AssignmentVars {
        let mut ids = Vec::with_capacity(sprints * stories);
        for sprint in 0..sprints {
            for story in 0..stories {
                ids.push(self.add(name(sprint, story), VarKind::Binary));
            }
        }
        AssignmentVars { stories, ids }
    }

    /// `correlating` holds story positions in ascending order
    pub(crate) fn bonus_grid(
        &mut self,
        sprints: usize,
        stories: usize,
        correlating: &[usize],
        mut name: impl FnMut(usize, usize) -> String,
    ) -> BonusVars {
        let mut columns = vec![None; stories];
        for (column, &story) in correlating.iter().enumerate() {
            columns[story] = Some(column);
        }
        let mut ids = Vec::with_capacity(sprints * correlating.len());
        for sprint in 0..sprints {
            for &story in correlating {
                ids.push(self.add(name(sprint, story), VarKind::Integer));
            }
        }
        BonusVars {
            columns,
            width: correlating.len(),
            ids,
        }
    }

    pub(crate) fn into_variables(self) -> Vec<Variable> {
        self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_linear_expr_evaluate() {
        let expr = LinearExpr::new()
            .with_term(VarId(0), 2.0)
            .with_term(VarId(2), -1.5)
            .with_term(VarId(0), 1.0);
        let values = [1.0, 7.0, 2.0];
        assert!((expr.evaluate(&values) - 0.0).abs() < 1e-12);
        assert_eq!(expr.coefficient(VarId(0)), 3.0);
        assert_eq!(expr.coefficient(VarId(1)), 0.0);
        assert_eq!(LinearExpr::new().evaluate(&values), 0.0);
    }

    #[test]
    fn test_constraint_satisfaction() {
        let le = LinearConstraint {
            name: "le".to_string(),
            family: ConstraintFamily::Capacity,
            lhs: [(VarId(0), 4.0), (VarId(1), 6.0)].into_iter().collect(),
            relation: Relation::LessOrEqual,
            rhs: 10.0,
        };
        assert!(le.is_satisfied(&[1.0, 1.0], 1e-9));
        assert!(!le.is_satisfied(&[1.0, 1.5], 1e-9));

        let eq = LinearConstraint {
            name: "eq".to_string(),
            family: ConstraintFamily::Inclusion,
            lhs: [(VarId(0), 1.0), (VarId(1), 1.0)].into_iter().collect(),
            relation: Relation::Equal,
            rhs: 1.0,
        };
        assert!(eq.is_satisfied(&[0.0, 1.0], 1e-9));
        assert!(!eq.is_satisfied(&[1.0, 1.0], 1e-9));
        assert_eq!(eq.relation.to_string(), "=");
    }

    #[test]
    fn test_bonus_grid_only_for_correlating_stories() {
        let mut registry = VariableRegistry::default();
        let x = registry.assignment_grid(2, 3, |i, j| format!("X[{i},{j}]"));
        let y = registry.bonus_grid(2, 3, &[1], |i, j| format!("Y[{i},{j}]"));
        assert_eq!(x.len(), 6);
        assert_eq!(y.len(), 2);
        assert!(y.get(0, 0).is_none());
        assert!(y.get(1, 2).is_none());

        let variables = registry.into_variables();
        let y11 = y.get(1, 1).unwrap();
        assert_eq!(variables[y11.index()].name, "Y[1,1]");
        assert_eq!(variables[y11.index()].kind, VarKind::Integer);
        assert_eq!(variables[x.get(1, 2).index()].name, "X[1,2]");
    }

    #[test]
    fn test_constraint_family_names() {
        let names: Vec<String> = ConstraintFamily::iter().map(|f| f.to_string()).collect();
        assert_eq!(names[0], "capacity");
        assert!(names.contains(&"dependency_multi_and".to_string()));
        assert!(names.contains(&"correlation_cap".to_string()));
    }
}
