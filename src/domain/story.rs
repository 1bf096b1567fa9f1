use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;
use validator::Validate;

/// Backlog story identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u32);

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R.{:02}", self.0)
    }
}

/// A schedulable work item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Story {
    pub id: StoryId,
    /// Cost consumed from sprint capacity
    #[validate(range(min = 1))]
    pub story_points: u32,
    /// Benefit score when the story is delivered
    #[validate(range(min = 0.0))]
    pub utility: f64,
    /// Multiplier applied to utility (risk-adjusted value)
    #[validate(range(exclusive_min = 0.0))]
    pub risk: f64,
}

impl Story {
    pub fn new(id: u32, story_points: u32, utility: f64, risk: f64) -> Self {
        Self {
            id: StoryId(id),
            story_points,
            utility,
            risk,
        }
    }

    /// Risk-adjusted value realized when the story is scheduled
    pub fn base_value(&self) -> f64 {
        self.utility * self.risk
    }
}

/// How a dependency is interpreted, derived from its prerequisite count and threshold.
///
/// A threshold of 1 over several prerequisites is an OR-group: any one of them
/// suffices. Requiring all of several prerequisites needs `count` equal to the
/// number of prerequisites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DependencyMode {
    /// Exactly one prerequisite, threshold 1
    SingleAnd,
    /// Several prerequisites, threshold 1
    OrGroup,
    /// Threshold greater than 1
    MultiAnd,
}

/// Precedence requirement of one dependent story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    /// The dependent story
    pub story: StoryId,
    /// Prerequisite stories
    pub depends_on: Vec<StoryId>,
    /// How many prerequisites must be scheduled in earlier sprints
    pub count: u32,
}

impl Dependency {
    pub fn new(story: u32, depends_on: &[u32], count: u32) -> Self {
        Self {
            story: StoryId(story),
            depends_on: depends_on.iter().copied().map(StoryId).collect(),
            count,
        }
    }

    pub fn mode(&self) -> DependencyMode {
        match (self.count, self.depends_on.len()) {
            (0 | 1, 0 | 1) => DependencyMode::SingleAnd,
            (0 | 1, _) => DependencyMode::OrGroup,
            _ => DependencyMode::MultiAnd,
        }
    }
}

/// Affinity bonus for co-scheduling a story with its partners.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Correlation {
    /// The story earning the bonus
    pub story: StoryId,
    /// Bonus factor applied to the story's utility
    #[validate(range(min = 0.0))]
    pub affinity: f64,
    /// Partner stories
    pub correlated: Vec<StoryId>,
    /// Maximum bonus units
    pub count: u32,
}

impl Correlation {
    pub fn new(story: u32, affinity: f64, correlated: &[u32], count: u32) -> Self {
        Self {
            story: StoryId(story),
            affinity,
            correlated: correlated.iter().copied().map(StoryId).collect(),
            count,
        }
    }

    /// Normalizer for the per-unit bonus, never zero
    pub fn bonus_divisor(&self) -> f64 {
        f64::from(self.count.max(1))
    }
}
