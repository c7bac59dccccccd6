/// Pipeline stage definitions for tracking per-site crawl progress
use std::fmt;
use thiserror::Error;

/// Represents the current stage of a site's fetch-extract-filter pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    // ===== Active States =====
    /// Dispatched, waiting for a worker slot
    Pending,

    /// Root page request in flight (including retries)
    Fetching,

    /// Parsing the fetched page into candidates
    Extracting,

    /// Scoring candidates against the site's topics
    Filtering,

    // ===== Terminal States =====
    /// Pipeline produced an article list
    Done,

    /// Pipeline stopped with an error
    Failed,
}

impl PipelineStage {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Position in the forward order; terminal stages share the last rank
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Fetching => 1,
            Self::Extracting => 2,
            Self::Filtering => 3,
            Self::Done | Self::Failed => 4,
        }
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// Stages only move forward one step at a time, except that `Failed` can be
    /// reached from any active stage. `Done` is only reachable from `Filtering`.
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            Self::Failed => true,
            Self::Done => *self == Self::Filtering,
            _ => next.rank() == self.rank() + 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Filtering => "filtering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible stages
    pub fn all_stages() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Extracting,
            Self::Filtering,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid stage transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

/// Tracks one site's pipeline through its stages
#[derive(Debug, Clone)]
pub struct StageTracker {
    site_id: String,
    stage: PipelineStage,
}

impl StageTracker {
    pub fn new(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            stage: PipelineStage::Pending,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Moves to `next`, rejecting any transition that revisits or skips a stage
    pub fn advance(&mut self, next: PipelineStage) -> Result<(), InvalidTransition> {
        if !self.stage.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.stage,
                to: next,
            });
        }

        tracing::debug!(site = %self.site_id, "{} -> {}", self.stage, next);
        self.stage = next;
        Ok(())
    }
}
