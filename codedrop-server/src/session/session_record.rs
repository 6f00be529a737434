use codedrop_core::{Code, HandleId, Role};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Состояние рандеву для одного кода.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendezvousState {
    /// Record exists (a responder is waiting) but no offer yet.
    Empty,
    Offered,
    Answered,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCandidate {
    pub origin: Role,
    pub candidate: String,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    code: Code,
    pub(crate) offer: Option<String>,
    pub(crate) answer: Option<String>,
    pending_candidates: VecDeque<PendingCandidate>,
    pub(crate) initiator: Option<HandleId>,
    pub(crate) responder: Option<HandleId>,
    created_at: Instant,
    created_at_ms: u64,
}

impl SessionRecord {
    pub fn new(code: Code) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            code,
            offer: None,
            answer: None,
            pending_candidates: VecDeque::new(),
            initiator: None,
            responder: None,
            created_at: Instant::now(),
            created_at_ms,
        }
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn offer(&self) -> Option<&str> {
        self.offer.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn state(&self) -> RendezvousState {
        match (&self.offer, &self.answer) {
            (_, Some(_)) => RendezvousState::Answered,
            (Some(_), None) => RendezvousState::Offered,
            (None, None) => RendezvousState::Empty,
        }
    }

    pub fn handle(&self, role: Role) -> Option<HandleId> {
        match role {
            Role::Initiator => self.initiator,
            Role::Responder => self.responder,
        }
    }

    pub(crate) fn bind(&mut self, role: Role, handle: HandleId) {
        match role {
            Role::Initiator => self.initiator = Some(handle),
            Role::Responder => self.responder = Some(handle),
        }
    }

    /// Role the handle is bound to in this record, if any.
    pub fn role_of(&self, handle: HandleId) -> Option<Role> {
        if self.initiator == Some(handle) {
            Some(Role::Initiator)
        } else if self.responder == Some(handle) {
            Some(Role::Responder)
        } else {
            None
        }
    }

    /// Bound handles except `except`.
    pub fn bound_handles_except(&self, except: Option<HandleId>) -> Vec<HandleId> {
        [self.initiator, self.responder]
            .into_iter()
            .flatten()
            .filter(|h| Some(*h) != except)
            .collect()
    }

    pub fn is_unbound(&self) -> bool {
        self.initiator.is_none() && self.responder.is_none()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Unresolved (no answer) or abandoned (nobody bound) and older than `max_age`.
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age() > max_age && (self.answer.is_none() || self.is_unbound())
    }

    pub(crate) fn push_candidate(&mut self, origin: Role, candidate: String) {
        self.pending_candidates
            .push_back(PendingCandidate { origin, candidate });
    }

    /// Remove and return the oldest candidate from `origin`.
    pub(crate) fn pop_candidate(&mut self, origin: Role) -> Option<String> {
        let idx = self
            .pending_candidates
            .iter()
            .position(|c| c.origin == origin)?;
        self.pending_candidates.remove(idx).map(|c| c.candidate)
    }

    /// Remove all candidates from `origin`, oldest first.
    pub(crate) fn drain_candidates(&mut self, origin: Role) -> Vec<String> {
        let mut drained = Vec::new();
        self.pending_candidates.retain(|c| {
            if c.origin == origin {
                drained.push(c.candidate.clone());
                false
            } else {
                true
            }
        });
        drained
    }

    pub fn pending_count(&self, origin: Role) -> usize {
        self.pending_candidates
            .iter()
            .filter(|c| c.origin == origin)
            .count()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            code: self.code.clone(),
            state: self.state(),
            has_offer: self.offer.is_some(),
            has_answer: self.answer.is_some(),
            initiator: self.initiator,
            responder: self.responder,
            pending_candidates: self.pending_candidates.len(),
            created_at: self.created_at_ms,
            age_secs: self.age().as_secs(),
        }
    }
}

/// Диагностический снимок записи (для `/connections`).
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub code: Code,
    pub state: RendezvousState,
    pub has_offer: bool,
    pub has_answer: bool,
    pub initiator: Option<HandleId>,
    pub responder: Option<HandleId>,
    pub pending_candidates: usize,
    pub created_at: u64,
    pub age_secs: u64,
}
