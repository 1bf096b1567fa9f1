use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Ordinal position of a sprint in the planning sequence (1-based).
///
/// The ordering is meaningful: a prerequisite must land in a sprint with a
/// strictly smaller ordinal than its dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SprintId(pub u32);

impl SprintId {
    /// Sprint id for a zero-based position in the sequence
    pub fn from_position(position: usize) -> Self {
        Self(position as u32 + 1)
    }

    /// Zero-based position in the sequence
    pub fn position(&self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for SprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A time-boxed capacity bucket.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Sprint {
    pub id: SprintId,
    /// Story points available in this sprint
    #[validate(range(min = 1))]
    pub capacity: u32,
}

impl Sprint {
    pub fn new(id: u32, capacity: u32) -> Self {
        Self {
            id: SprintId(id),
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_id_position_roundtrip() {
        assert_eq!(SprintId::from_position(0), SprintId(1));
        assert_eq!(SprintId(4).position(), 3);
        assert!(SprintId(1) < SprintId(2));
    }

    #[test]
    fn test_zero_capacity_fails_validation() {
        assert!(Sprint::new(1, 0).validate().is_err());
        assert!(Sprint::new(1, 10).validate().is_ok());
    }
}
