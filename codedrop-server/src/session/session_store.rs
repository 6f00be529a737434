use crate::session::{SessionRecord, SessionSummary};
use codedrop_core::{Code, HandleId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// In-memory map `code -> SessionRecord`.
///
/// Every mutation of one code runs under that code's shard lock, so
/// operations on the same code are atomic and different codes do not
/// coordinate. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Code, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record if absent. Never clobbers an existing one.
    ///
    /// Returns `true` when a new record was inserted.
    pub fn create(&self, code: &Code) -> bool {
        self.upsert(code, |_, created| created)
    }

    /// Create-or-mutate atomically. `f` gets `created == true` for a fresh record.
    pub fn upsert<R>(&self, code: &Code, f: impl FnOnce(&mut SessionRecord, bool) -> R) -> R {
        let entry = self.sessions.entry(code.clone());
        let created = matches!(entry, Entry::Vacant(_));
        if created {
            info!("Creating session record for code {}", code);
        }
        let mut record = entry.or_insert_with(|| SessionRecord::new(code.clone()));
        f(&mut record, created)
    }

    /// Mutate an existing record atomically; `None` if the code is unknown.
    pub fn update<R>(&self, code: &Code, f: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        let mut record = self.sessions.get_mut(code)?;
        Some(f(&mut record))
    }

    pub fn get(&self, code: &Code) -> Option<SessionRecord> {
        self.sessions.get(code).map(|r| r.value().clone())
    }

    pub fn contains(&self, code: &Code) -> bool {
        self.sessions.contains_key(code)
    }

    pub fn delete(&self, code: &Code) -> Option<SessionRecord> {
        let removed = self.sessions.remove(code).map(|(_, record)| record);
        if removed.is_some() {
            info!("Deleted session record for code {}", code);
        }
        removed
    }

    /// Remove `code` only if it is expired at this moment.
    pub fn remove_if_expired(&self, code: &Code, max_age: Duration) -> Option<SessionRecord> {
        self.sessions
            .remove_if(code, |_, record| record.is_expired(max_age))
            .map(|(_, record)| record)
    }

    /// Drop every expired record and return what was removed.
    pub fn sweep_expired(&self, max_age: Duration) -> Vec<SessionRecord> {
        if self.is_empty() {
            return Vec::new();
        }
        let candidates: Vec<Code> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(max_age))
            .map(|entry| entry.key().clone())
            .collect();

        let removed: Vec<SessionRecord> = candidates
            .iter()
            .filter_map(|code| self.remove_if_expired(code, max_age))
            .collect();

        if !removed.is_empty() {
            info!("Swept {} expired session(s)", removed.len());
        }
        removed
    }

    /// Remove every record where `handle` is bound as initiator or responder.
    pub fn remove_bound_to(&self, handle: HandleId) -> Vec<SessionRecord> {
        let codes: Vec<Code> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().role_of(handle).is_some())
            .map(|entry| entry.key().clone())
            .collect();

        codes
            .iter()
            .filter_map(|code| {
                self.sessions
                    .remove_if(code, |_, record| record.role_of(handle).is_some())
                    .map(|(_, record)| {
                        debug!("Handle {} released code {}", handle, code);
                        record
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshot(&self) -> Vec<SessionSummary> {
        let mut list: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        list.sort_by(|a, b| a.code.cmp(&b.code));
        list
    }
}
