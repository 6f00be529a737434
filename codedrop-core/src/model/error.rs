use crate::model::code::Code;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type SignalResult<T> = Result<T, SignalError>;

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Missing {
    Session,
    Offer,
    Answer,
    Candidate,
    Role,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Session => "session",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Role => "bound role",
        };
        f.write_str(s)
    }
}

/// Wire projection of [`SignalError`], carried in failed replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidPayload,
    Timeout,
    TransportFailure,
    ChannelClosed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// No record for the code, or the requested data is not there yet.
    #[error("{missing} not found for code {code}")]
    NotFound { code: Code, missing: Missing },

    /// The offer or answer was already committed by another party.
    #[error("conflicting rendezvous for code {code}: {reason}")]
    Conflict { code: Code, reason: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("timed out waiting for {waiting_for}")]
    Timeout { waiting_for: String },

    /// The peer transport reported `failed` or `closed`.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("signaling channel closed")]
    ChannelClosed,

    #[error("cancelled")]
    Cancelled,
}

impl SignalError {
    pub fn not_found(code: &Code, missing: Missing) -> Self {
        Self::NotFound {
            code: code.clone(),
            missing,
        }
    }

    pub fn conflict(code: &Code, reason: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.clone(),
            reason: reason.into(),
        }
    }

    pub fn timeout(waiting_for: impl Into<String>) -> Self {
        Self::Timeout {
            waiting_for: waiting_for.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::TransportFailure(_) => ErrorKind::TransportFailure,
            Self::ChannelClosed => ErrorKind::ChannelClosed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Only `NotFound` is worth retrying inside a polling window.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
