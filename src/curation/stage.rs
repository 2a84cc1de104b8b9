use serde::{Deserialize, Serialize};

use super::CurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    Rejected,
    Surplus,
    /// Signature already present in the accepted collection.
    AlreadyCollected,
}

/// States a candidate passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Received,
    Validated { passed: bool },
    Enriched,
    DuplicateChecked,
    DiversityChecked,
    Committed,
    Archived { reason: ArchiveReason },
}

impl Stage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated { .. } => "validated",
            Self::Enriched => "enriched",
            Self::DuplicateChecked => "duplicate_checked",
            Self::DiversityChecked => "diversity_checked",
            Self::Committed => "committed",
            Self::Archived { .. } => "archived",
        }
    }

    fn allows(self, next: Self) -> bool {
        use ArchiveReason::{AlreadyCollected, Rejected, Surplus};
        matches!(
            (self, next),
            (Self::Received, Self::Validated { .. })
                | (Self::Validated { passed: true }, Self::Enriched)
                | (
                    Self::Validated { passed: false },
                    Self::Archived { reason: Rejected }
                )
                | (Self::Enriched, Self::DuplicateChecked)
                | (
                    Self::DuplicateChecked,
                    Self::DiversityChecked | Self::Archived { reason: AlreadyCollected }
                )
                | (
                    Self::DiversityChecked,
                    Self::Committed | Self::Archived { reason: Surplus }
                )
        )
    }
}

/// Ordered record of the stages a candidate has visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrail {
    stages: Vec<Stage>,
}

impl Default for StageTrail {
    fn default() -> Self {
        Self {
            stages: vec![Stage::Received],
        }
    }
}

impl StageTrail {
    #[must_use]
    pub fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Received)
    }

    /// Moves to `next`.
    ///
    /// # Errors
    /// Returns [`CurationError::InvalidTransition`] when `next` does not follow
    /// the current stage.
    pub fn advance(&mut self, next: Stage) -> Result<(), CurationError> {
        let current = self.current();
        if !current.allows(next) {
            return Err(CurationError::InvalidTransition {
                from: current.name(),
                to: next.name(),
            });
        }
        tracing::trace!(from = current.name(), to = next.name(), "stage transition");
        self.stages.push(next);
        Ok(())
    }

    #[must_use]
    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}
