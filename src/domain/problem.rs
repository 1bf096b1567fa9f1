use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::{Correlation, Dependency, DependencyMode, Sprint, SprintId, Story, StoryId};

/// Problem instance validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("at least one sprint is required")]
    NoSprints,
    #[error("at least one story is required")]
    NoStories,
    #[error("sprint at position {position} has id {found}, expected {expected}")]
    SprintOrder {
        position: usize,
        found: SprintId,
        expected: SprintId,
    },
    #[error("story {0} is defined more than once")]
    DuplicateStory(StoryId),
    #[error("invalid {record}: {source}")]
    InvalidField {
        record: String,
        source: ValidationErrors,
    },
    #[error("{record}: {field} must be finite, got {value}")]
    NonFinite {
        record: String,
        field: &'static str,
        value: f64,
    },
    #[error("{context} references unknown story {story}")]
    UnknownStory { context: String, story: StoryId },
    #[error("{context} lists story {story} more than once")]
    DuplicateReference { context: String, story: StoryId },
    #[error("story {0} has more than one dependency entry")]
    DuplicateDependency(StoryId),
    #[error("dependency of story {0} has no prerequisites")]
    EmptyPrerequisites(StoryId),
    #[error("dependency of story {story} requires {count} of {prerequisites} prerequisites")]
    InvalidThreshold {
        story: StoryId,
        count: u32,
        prerequisites: usize,
    },
    #[error("story {0} has more than one correlation entry")]
    DuplicateCorrelation(StoryId),
    #[error("correlation of story {0} has no partners")]
    EmptyPartners(StoryId),
    #[error("story {0} is listed as its own correlation partner")]
    SelfCorrelation(StoryId),
}

/// Raw planning input as supplied by a loader, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemInput {
    pub sprints: Vec<Sprint>,
    pub stories: Vec<Story>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub correlations: Vec<Correlation>,
}

/// A dependency resolved to story positions
#[derive(Debug, Clone)]
pub struct DependencyLink {
    pub dependent: usize,
    pub prerequisites: Vec<usize>,
    pub required: u32,
    pub mode: DependencyMode,
}

/// A correlation resolved to story positions
#[derive(Debug, Clone)]
pub struct CorrelationLink {
    pub story: usize,
    pub partners: Vec<usize>,
    pub affinity: f64,
    pub cap: u32,
}

impl CorrelationLink {
    pub fn bonus_divisor(&self) -> f64 {
        f64::from(self.cap.max(1))
    }
}

/// Validated, immutable planning problem.
///
/// Stories and sprints keep their input order; dependency and correlation
/// links are sorted by the position of the story they belong to.
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    sprints: Vec<Sprint>,
    stories: Vec<Story>,
    story_index: HashMap<StoryId, usize>,
    dependencies: Vec<DependencyLink>,
    correlations: Vec<CorrelationLink>,
}

impl TryFrom<ProblemInput> for PlanningProblem {
    type Error = ValidationError;

    fn try_from(input: ProblemInput) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

impl PlanningProblem {
    pub fn new(input: ProblemInput) -> Result<Self, ValidationError> {
        let ProblemInput {
            sprints,
            stories,
            dependencies,
            correlations,
        } = input;

        if sprints.is_empty() {
            return Err(ValidationError::NoSprints);
        }
        if stories.is_empty() {
            return Err(ValidationError::NoStories);
        }

        for (position, sprint) in sprints.iter().enumerate() {
            let expected = SprintId::from_position(position);
            if sprint.id != expected {
                return Err(ValidationError::SprintOrder {
                    position: position + 1,
                    found: sprint.id,
                    expected,
                });
            }
            check_fields(sprint, || format!("sprint {}", sprint.id))?;
        }

        let mut story_index = HashMap::with_capacity(stories.len());
        for (position, story) in stories.iter().enumerate() {
            if story_index.insert(story.id, position).is_some() {
                return Err(ValidationError::DuplicateStory(story.id));
            }
            check_fields(story, || format!("story {}", story.id))?;
            check_finite(story.utility, "utility", || format!("story {}", story.id))?;
            check_finite(story.risk, "risk", || format!("story {}", story.id))?;
        }

        let mut dependency_links = Vec::with_capacity(dependencies.len());
        let mut seen = HashSet::new();
        for dependency in &dependencies {
            let context = format!("dependency of story {}", dependency.story);
            let dependent = lookup(&story_index, dependency.story, &context)?;
            if !seen.insert(dependency.story) {
                return Err(ValidationError::DuplicateDependency(dependency.story));
            }
            if dependency.depends_on.is_empty() {
                return Err(ValidationError::EmptyPrerequisites(dependency.story));
            }
            let count = dependency.count;
            if count == 0 || count as usize > dependency.depends_on.len() {
                return Err(ValidationError::InvalidThreshold {
                    story: dependency.story,
                    count,
                    prerequisites: dependency.depends_on.len(),
                });
            }
            let prerequisites = resolve_all(&story_index, &dependency.depends_on, &context)?;
            dependency_links.push(DependencyLink {
                dependent,
                prerequisites,
                required: count,
                mode: dependency.mode(),
            });
        }
        dependency_links.sort_by_key(|link| link.dependent);

        let mut correlation_links = Vec::with_capacity(correlations.len());
        let mut seen = HashSet::new();
        for correlation in &correlations {
            let context = format!("correlation of story {}", correlation.story);
            let story = lookup(&story_index, correlation.story, &context)?;
            if !seen.insert(correlation.story) {
                return Err(ValidationError::DuplicateCorrelation(correlation.story));
            }
            check_fields(correlation, || context.clone())?;
            check_finite(correlation.affinity, "affinity", || context.clone())?;
            if correlation.correlated.is_empty() {
                return Err(ValidationError::EmptyPartners(correlation.story));
            }
            if correlation.correlated.contains(&correlation.story) {
                return Err(ValidationError::SelfCorrelation(correlation.story));
            }
            let partners = resolve_all(&story_index, &correlation.correlated, &context)?;
            correlation_links.push(CorrelationLink {
                story,
                partners,
                affinity: correlation.affinity,
                cap: correlation.count,
            });
        }
        correlation_links.sort_by_key(|link| link.story);

        Ok(Self {
            sprints,
            stories,
            story_index,
            dependencies: dependency_links,
            correlations: correlation_links,
        })
    }

    pub fn sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn story(&self, id: StoryId) -> Option<&Story> {
        self.story_index.get(&id).map(|&position| &self.stories[position])
    }

    pub fn story_position(&self, id: StoryId) -> Option<usize> {
        self.story_index.get(&id).copied()
    }

    pub fn dependencies(&self) -> &[DependencyLink] {
        &self.dependencies
    }

    pub fn correlations(&self) -> &[CorrelationLink] {
        &self.correlations
    }

    pub fn total_capacity(&self) -> u64 {
        self.sprints.iter().map(|s| u64::from(s.capacity)).sum()
    }

    pub fn total_story_points(&self) -> u64 {
        self.stories.iter().map(|s| u64::from(s.story_points)).sum()
    }
}

fn check_fields<T: Validate>(
    record: &T,
    describe: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    record
        .validate()
        .map_err(|source| ValidationError::InvalidField {
            record: describe(),
            source,
        })
}

fn check_finite(
    value: f64,
    field: &'static str,
    describe: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite {
            record: describe(),
            field,
            value,
        })
    }
}

fn lookup(
    index: &HashMap<StoryId, usize>,
    story: StoryId,
    context: &str,
) -> Result<usize, ValidationError> {
    index
        .get(&story)
        .copied()
        .ok_or_else(|| ValidationError::UnknownStory {
            context: context.to_string(),
            story,
        })
}

fn resolve_all(
    index: &HashMap<StoryId, usize>,
    ids: &[StoryId],
    context: &str,
) -> Result<Vec<usize>, ValidationError> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut positions = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateReference {
                context: context.to_string(),
                story: id,
            });
        }
        positions.push(lookup(index, id, context)?);
    }
    Ok(positions)
}
