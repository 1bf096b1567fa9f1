//! Independent check of an assignment against the planning rules.
//!
//! Works from the problem data rather than the model's constraint rows, so a
//! mis-encoded constraint shows up here as a violation.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{PlanningProblem, SprintId, StoryId};
use crate::optimizer::{Assignment, PlanningModel};

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("story {story} is not scheduled")]
    Unscheduled { story: StoryId },
    #[error("story {story} is scheduled in {} sprints", .sprints.len())]
    ScheduledMoreThanOnce {
        story: StoryId,
        sprints: Vec<SprintId>,
    },
    #[error("sprint {sprint} uses {used} of {capacity} points")]
    OverCapacity {
        sprint: SprintId,
        used: u64,
        capacity: u32,
    },
    #[error(
        "story {story} in sprint {sprint} has {satisfied} of {required} prerequisites earlier"
    )]
    Precedence {
        story: StoryId,
        sprint: SprintId,
        satisfied: u32,
        required: u32,
    },
    #[error("story {story} earns {units} bonus units in sprint {sprint} without a partner there")]
    UnsupportedBonus {
        story: StoryId,
        sprint: SprintId,
        units: u32,
    },
    #[error("story {story} earns {units} bonus units in sprint {sprint}, cap is {cap}")]
    BonusOverCap {
        story: StoryId,
        sprint: SprintId,
        units: u32,
        cap: u32,
    },
}

/// All rule violations of `assignment`, empty for a sound schedule
pub fn verify(
    problem: &PlanningProblem,
    model: &PlanningModel,
    assignment: &Assignment,
) -> Vec<Violation> {
    let stories = problem.stories();
    let n_sprints = problem.sprints().len();
    let placed = |i: usize, j: usize| assignment.is_set(model.assignment_var(i, j));
    let mut violations = Vec::new();

    // Sprint position of every story scheduled exactly once
    let mut position = vec![None; stories.len()];
    for (j, story) in stories.iter().enumerate() {
        let sprints: Vec<usize> = (0..n_sprints).filter(|&i| placed(i, j)).collect();
        match sprints.as_slice() {
            [] => violations.push(Violation::Unscheduled { story: story.id }),
            [i] => position[j] = Some(*i),
            many => violations.push(Violation::ScheduledMoreThanOnce {
                story: story.id,
                sprints: many.iter().map(|&i| SprintId::from_position(i)).collect(),
            }),
        }
    }

    for (i, sprint) in problem.sprints().iter().enumerate() {
        let used: u64 = stories
            .iter()
            .enumerate()
            .filter(|&(j, _)| placed(i, j))
            .map(|(_, s)| u64::from(s.story_points))
            .sum();
        if used > u64::from(sprint.capacity) {
            violations.push(Violation::OverCapacity {
                sprint: sprint.id,
                used,
                capacity: sprint.capacity,
            });
        }
    }

    for link in problem.dependencies() {
        let Some(i) = position[link.dependent] else {
            continue;
        };
        let satisfied = link
            .prerequisites
            .iter()
            .map(|&d| (0..i).filter(|&k| placed(k, d)).count() as u32)
            .sum::<u32>();
        if satisfied < link.required {
            violations.push(Violation::Precedence {
                story: stories[link.dependent].id,
                sprint: SprintId::from_position(i),
                satisfied,
                required: link.required,
            });
        }
    }

    for link in problem.correlations() {
        for i in 0..n_sprints {
            let Some(y) = model.bonus_var(i, link.story) else {
                continue;
            };
            let units = assignment.units(y);
            if units == 0 {
                continue;
            }
            let story = stories[link.story].id;
            let sprint = SprintId::from_position(i);
            let partner_here = link.partners.iter().any(|&k| placed(i, k));
            if !placed(i, link.story) || !partner_here {
                violations.push(Violation::UnsupportedBonus {
                    story,
                    sprint,
                    units,
                });
            }
            if units > link.cap {
                violations.push(Violation::BonusOverCap {
                    story,
                    sprint,
                    units,
                    cap: link.cap,
                });
            }
        }
    }

    violations
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
                Story::new(3, 4, 20.0, 1.0),
            ],
            dependencies: vec![Dependency::new(2, &[1], 1)],
            correlations: vec![Correlation::new(3, 0.5, &[1], 1)],
        })
        .unwrap()
    }

    fn check(x: &[(usize, usize)], y: &[(usize, usize, f64)]) -> Vec<Violation> {
        let problem = problem();
        let model = build_model(&problem);
        let mut values = vec![0.0; model.variables().len()];
        for &(i, j) in x {
            values[model.assignment_var(i, j).index()] = 1.0;
        }
        for &(i, j, units) in y {
            values[model.bonus_var(i, j).unwrap().index()] = units;
        }
        verify(&problem, &model, &Assignment::new(values, 0.0))
    }

    #[test]
    fn test_sound_schedule_has_no_violations() {
        assert!(check(&[(0, 0), (1, 1), (0, 2)], &[(0, 2, 1.0)]).is_empty());
    }

    #[test]
    fn test_inclusion_violations() {
        let violations = check(&[(0, 0), (1, 0), (1, 1)], &[]);
        assert!(violations.contains(&Violation::Unscheduled { story: StoryId(3) }));
        assert!(violations.contains(&Violation::ScheduledMoreThanOnce {
            story: StoryId(1),
            sprints: vec![SprintId(1), SprintId(2)],
        }));
    }

    #[test]
    fn test_capacity_violation() {
        let violations = check(&[(0, 0), (1, 1), (1, 2)], &[]);
        assert!(violations.is_empty());

        let violations = check(&[(1, 0), (1, 1), (1, 2)], &[]);
        assert!(violations.contains(&Violation::OverCapacity {
            sprint: SprintId(2),
            used: 15,
            capacity: 10,
        }));
    }

    #[test]
    fn test_precedence_violation() {
        let violations = check(&[(1, 0), (0, 1), (1, 2)], &[]);
        assert_eq!(
            violations,
            vec![Violation::Precedence {
                story: StoryId(2),
                sprint: SprintId(1),
                satisfied: 0,
                required: 1,
            }]
        );
    }

    #[test]
    fn test_bonus_soundness() {
        let violations = check(&[(0, 0), (1, 1), (1, 2)], &[(1, 2, 1.0)]);
        assert!(matches!(violations[..], [Violation::UnsupportedBonus { units: 1, .. }]));

        let violations = check(&[(0, 0), (1, 1), (0, 2)], &[(0, 2, 2.0)]);
        assert!(matches!(violations[..], [Violation::BonusOverCap { cap: 1, .. }]));
        assert_eq!(
            violations[0].to_string(),
            "story R.03 earns 2 bonus units in sprint 1, cap is 1"
        );
    }
}
