use serde::Serialize;
use std::fmt;

use crate::domain::{PlanningProblem, SprintId, StoryId};
use crate::optimizer::{Assignment, PlanningModel, SolveStatus};

/// Realized objective split into its two parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ObjectiveBreakdown {
    /// Σ utility·risk over scheduled stories
    pub base_value: f64,
    /// Σ correlation bonus over realized units
    pub bonus_value: f64,
}

impl ObjectiveBreakdown {
    pub fn total(&self) -> f64 {
        self.base_value + self.bonus_value
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledStory {
    pub id: StoryId,
    pub story_points: u32,
    pub utility: f64,
    pub risk: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SprintReport {
    pub sprint: SprintId,
    pub capacity: u32,
    /// In backlog order
    pub stories: Vec<ScheduledStory>,
    pub points_used: u32,
    pub headroom: u32,
}

/// Correlation bonus realized by one story in one sprint
#[derive(Debug, Clone, Serialize)]
pub struct BonusAward {
    pub sprint: SprintId,
    pub story: StoryId,
    pub units: u32,
    pub value: f64,
}

/// Schedule reconstructed from a solver assignment
#[derive(Debug, Clone, Serialize)]
pub struct SolutionReport {
    pub status: SolveStatus,
    /// Objective value reported by the solver
    pub objective_value: f64,
    /// Objective recomputed from the schedule
    pub realized: ObjectiveBreakdown,
    pub sprints: Vec<SprintReport>,
    pub bonuses: Vec<BonusAward>,
}

impl SolutionReport {
    pub fn from_assignment(
        problem: &PlanningProblem,
        model: &PlanningModel,
        status: SolveStatus,
        assignment: &Assignment,
    ) -> Self {
        let stories = problem.stories();

        let sprints: Vec<SprintReport> = problem
            .sprints()
            .iter()
            .enumerate()
            .map(|(i, sprint)| {
                let scheduled: Vec<ScheduledStory> = stories
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| assignment.is_set(model.assignment_var(i, *j)))
                    .map(|(_, story)| ScheduledStory {
                        id: story.id,
                        story_points: story.story_points,
                        utility: story.utility,
                        risk: story.risk,
                    })
                    .collect();
                let points_used = scheduled.iter().map(|s| s.story_points).sum::<u32>();
                SprintReport {
                    sprint: sprint.id,
                    capacity: sprint.capacity,
                    stories: scheduled,
                    points_used,
                    headroom: sprint.capacity.saturating_sub(points_used),
                }
            })
            .collect();

        let mut realized = ObjectiveBreakdown {
            base_value: sprints
                .iter()
                .flat_map(|s| &s.stories)
                .map(|s| s.utility * s.risk)
                .sum(),
            bonus_value: 0.0,
        };

        let mut bonuses = Vec::new();
        for (i, sprint) in problem.sprints().iter().enumerate() {
            for link in problem.correlations() {
                let Some(y) = model.bonus_var(i, link.story) else {
                    continue;
                };
                let units = assignment.units(y);
                if units == 0 {
                    continue;
                }
                let story = &stories[link.story];
                let value = story.utility * link.affinity * f64::from(units) / link.bonus_divisor();
                realized.bonus_value += value;
                bonuses.push(BonusAward {
                    sprint: sprint.id,
                    story: story.id,
                    units,
                    value,
                });
            }
        }

        Self {
            status,
            objective_value: assignment.objective_value(),
            realized,
            sprints,
            bonuses,
        }
    }

    /// Sprint a story landed in, if any
    pub fn sprint_of(&self, story: StoryId) -> Option<SprintId> {
        self.sprints
            .iter()
            .find(|s| s.stories.iter().any(|st| st.id == story))
            .map(|s| s.sprint)
    }

    /// Absolute difference between solver and recomputed objective
    pub fn objective_gap(&self) -> f64 {
        (self.objective_value - self.realized.total()).abs()
    }

    /// Gap within `tolerance`, relative to the objective magnitude (at least 1)
    pub fn objective_consistent(&self, tolerance: f64) -> bool {
        self.objective_gap() <= tolerance * self.objective_value.abs().max(1.0)
    }
}

impl fmt::Display for SolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Objective Value: {:.2}", self.objective_value)?;
        writeln!(f)?;
        write!(f, "Sprint Assignment:")?;
        for sprint in &self.sprints {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "Sprint {} (Capacity: {} points):", sprint.sprint, sprint.capacity)?;
            for story in &sprint.stories {
                writeln!(f)?;
                write!(
                    f,
                    "  Story {} - Points: {}, Utility: {}, Risk: {}",
                    story.id, story.story_points, story.utility, story.risk
                )?;
            }
            writeln!(f)?;
            write!(f, "  Total points used: {}/{}", sprint.points_used, sprint.capacity)?;
        }
        if !self.bonuses.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "Correlation bonuses:")?;
            for bonus in &self.bonuses {
                writeln!(f)?;
                write!(
                    f,
                    "  Sprint {} Story {} - Units: {}, Value: {:.2}",
                    bonus.sprint, bonus.story, bonus.units, bonus.value
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Correlation, Dependency, ProblemInput, Sprint, Story};
    use crate::optimizer::build_model;

    fn problem() -> PlanningProblem {
        PlanningProblem::new(ProblemInput {
            sprints: vec![Sprint::new(1, 10), Sprint::new(2, 10)],
            stories: vec![
                Story::new(1, 6, 50.0, 1.0),
                Story::new(2, 5, 40.0, 1.0),
                Story::new(3, 4, 20.0, 1.5),
            ],
            dependencies: vec![Dependency::new(2, &[1], 1)],
            correlations: vec![Correlation::new(3, 0.5, &[1], 2)],
        })
        .unwrap()
    }

    fn assignment(
        model: &PlanningModel,
        placement: &[usize],
        bonus: &[(usize, usize, f64)],
        objective: f64,
    ) -> Assignment {
        let mut values = vec![0.0; model.variables().len()];
        for (j, &i) in placement.iter().enumerate() {
            values[model.assignment_var(i, j).index()] = 1.0;
        }
        for &(i, j, units) in bonus {
            values[model.bonus_var(i, j).unwrap().index()] = units;
        }
        Assignment::new(values, objective)
    }

    #[test]
    fn test_report_reconstructs_schedule() {
        let problem = problem();
        let model = build_model(&problem);
        let assignment = assignment(&model, &[0, 1, 0], &[(0, 2, 1.0)], 125.0);
        let report =
            SolutionReport::from_assignment(&problem, &model, SolveStatus::Optimal, &assignment);

        assert_eq!(report.sprints.len(), 2);
        let first = &report.sprints[0];
        let ids: Vec<_> = first.stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StoryId(1), StoryId(3)]);
        assert_eq!(first.points_used, 10);
        assert_eq!(first.headroom, 0);
        assert_eq!(report.sprints[1].points_used, 5);
        assert_eq!(report.sprints[1].headroom, 5);
        assert_eq!(report.sprint_of(StoryId(2)), Some(SprintId(2)));
    }

    #[test]
    fn test_objective_breakdown_and_consistency() {
        let problem = problem();
        let model = build_model(&problem);
        let assignment = assignment(&model, &[0, 1, 0], &[(0, 2, 1.0)], 125.0);
        let report =
            SolutionReport::from_assignment(&problem, &model, SolveStatus::Optimal, &assignment);

        assert!((report.realized.base_value - 120.0).abs() < 1e-9);
        assert!((report.realized.bonus_value - 5.0).abs() < 1e-9);
        assert!(report.objective_consistent(1e-9));
        assert_eq!(report.bonuses.len(), 1);
        assert_eq!(report.bonuses[0].story, StoryId(3));
        assert_eq!(report.bonuses[0].units, 1);

        let wrong = self::assignment(&model, &[0, 1, 0], &[(0, 2, 1.0)], 140.0);
        let report =
            SolutionReport::from_assignment(&problem, &model, SolveStatus::Optimal, &wrong);
        assert!(!report.objective_consistent(1e-6));
        assert!((report.objective_gap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_lists_sprints() {
        let problem = problem();
        let model = build_model(&problem);
        let assignment = assignment(&model, &[0, 1, 0], &[], 120.0);
        let report =
            SolutionReport::from_assignment(&problem, &model, SolveStatus::Optimal, &assignment);
        let text = report.to_string();

        assert!(text.starts_with("Status: optimal\nObjective Value: 120.00"));
        assert!(text.contains("Sprint 1 (Capacity: 10 points):"));
        assert!(text.contains("  Story R.03 - Points: 4, Utility: 20, Risk: 1.5"));
        assert!(text.contains("  Total points used: 5/10"));
        assert!(!text.contains("Correlation bonuses"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let problem = problem();
        let model = build_model(&problem);
        let assignment = assignment(&model, &[0, 1, 0], &[], 120.0);
        let report =
            SolutionReport::from_assignment(&problem, &model, SolveStatus::Optimal, &assignment);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "optimal");
        assert_eq!(json["sprints"][0]["sprint"], 1);
        assert_eq!(json["sprints"][0]["stories"][1]["id"], 3);
        assert_eq!(json["sprints"][1]["headroom"], 5);
    }
}
