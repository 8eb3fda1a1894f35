use serde::{Deserialize, Serialize};

use crate::domain::errors::CodecError;

/// Lifecycle of a nested stream (writer or reader).
///
/// `Unopened -> PartOpen -> PartClosed -> (PartOpen | Closed)`; `Closed`
/// is terminal. Transitions return the next state instead of mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamState {
    Unopened,
    PartOpen { index: u64 },
    PartClosed { last: u64 },
    Closed,
}

impl StreamState {
    pub fn can_transition_to(&self, target: StreamState) -> bool {
        match (self, target) {
            (StreamState::Closed, _) => false,
            (_, StreamState::Closed) => true,
            (StreamState::Unopened, StreamState::PartOpen { .. }) => true,
            (StreamState::PartClosed { .. }, StreamState::PartOpen { .. }) => true,
            (StreamState::PartOpen { index }, StreamState::PartClosed { last }) => *index == last,
            _ => false,
        }
    }

    pub fn open_part(&self, index: u64) -> Result<StreamState, CodecError> {
        match self {
            StreamState::Closed => Err(CodecError::StreamClosed),
            StreamState::PartOpen { .. } => Err(CodecError::EntryAlreadyOpen),
            _ => Ok(StreamState::PartOpen { index }),
        }
    }

    pub fn close_part(&self) -> Result<StreamState, CodecError> {
        match self {
            StreamState::Closed => Err(CodecError::StreamClosed),
            StreamState::PartOpen { index } => Ok(StreamState::PartClosed { last: *index }),
            _ => Err(CodecError::NoEntryOpen),
        }
    }

    pub fn ensure_not_closed(&self) -> Result<(), CodecError> {
        if *self == StreamState::Closed {
            return Err(CodecError::StreamClosed);
        }
        Ok(())
    }

    /// Index of the part currently open, if any.
    pub fn open_index(&self) -> Option<u64> {
        match self {
            StreamState::PartOpen { index } => Some(*index),
            _ => None,
        }
    }

    /// Index of the most recently opened part, open or closed.
    pub fn last_index(&self) -> Option<u64> {
        match self {
            StreamState::PartOpen { index } => Some(*index),
            StreamState::PartClosed { last } => Some(*last),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self == StreamState::Closed
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Unopened => write!(f, "UNOPENED"),
            StreamState::PartOpen { index } => write!(f, "PART_OPEN({})", index),
            StreamState::PartClosed { last } => write!(f, "PART_CLOSED({})", last),
            StreamState::Closed => write!(f, "CLOSED"),
        }
    }
}
