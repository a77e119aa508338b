use thiserror::Error;

/// Where a post-creation session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Empty,
    Selecting,
    Finalizing,
    /// Every selected asset is finalized; details entry may begin.
    Ready,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Select,
    Clear,
    Advance,
    Finalized,
    Back,
    Submit,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: Stage,
    pub event: StageEvent,
    pub to: Stage,
}

pub type StageResult<T> = std::result::Result<T, StageError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("invalid stage transition: from {from:?} using event {event:?}")]
    InvalidTransition { from: Stage, event: StageEvent },
}

#[derive(Debug)]
pub struct StageMachine {
    stage: Stage,
    history: Vec<StageTransition>,
}

impl StageMachine {
    pub fn new() -> Self {
        Self {
            stage: Stage::default(),
            history: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[StageTransition] {
        &self.history
    }

    pub fn can_transition(&self, event: StageEvent) -> bool {
        self.next_stage(event).is_some()
    }

    pub fn next_stage(&self, event: StageEvent) -> Option<Stage> {
        use StageEvent::*;
        match (self.stage, event) {
            (_, Reset) => Some(Stage::Empty),
            (Stage::Empty | Stage::Selecting, Select) => Some(Stage::Selecting),
            (Stage::Selecting, Clear) => Some(Stage::Empty),
            (Stage::Selecting, Advance) => Some(Stage::Finalizing),
            (Stage::Finalizing, Finalized) => Some(Stage::Ready),
            (Stage::Finalizing | Stage::Ready, Back) => Some(Stage::Selecting),
            (Stage::Ready, Submit) => Some(Stage::Submitted),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: StageEvent) -> StageResult<Stage> {
        tracing::debug!(from = ?self.stage, event = ?event, "request stage transition");
        let next = self.next_stage(event).ok_or_else(|| {
            let from = self.stage;
            tracing::warn!(from = ?from, event = ?event, "invalid stage transition requested");
            StageError::InvalidTransition { from, event }
        })?;

        self.history.push(StageTransition {
            from: self.stage,
            event,
            to: next,
        });
        self.stage = next;
        Ok(next)
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StageMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage::{:?}", self.stage)
    }
}
