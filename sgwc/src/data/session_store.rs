use super::{SessionKey, SessionRecord};
use crate::SessionError;
use crate::protocols::ies::Teid;
use std::collections::{HashMap, HashSet};

/// The primary store of sessions.  Established sessions are keyed by their control TEID; sessions
/// whose create is still in progress sit in a separate index keyed by temporary procedure ID.
///
/// Every key touched mutably is remembered as dirty so that changes can be flushed to persistent
/// storage.
#[derive(Default)]
pub struct SessionContextStore {
    established: HashMap<Teid, SessionRecord>,
    pending: HashMap<u32, SessionRecord>,
    dirty: HashSet<Teid>,
}

impl SessionContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a default initialized record under `teid`.
    pub fn create(&mut self, teid: Teid) -> Result<&mut SessionRecord, SessionError> {
        if self.established.contains_key(&teid) {
            return Err(SessionError::DuplicateKey(SessionKey::Established(teid)));
        }
        self.dirty.insert(teid);
        Ok(self
            .established
            .entry(teid)
            .or_insert_with(|| SessionRecord::new(SessionKey::Established(teid))))
    }

    /// Inserts a default initialized record under a fresh, random, non-zero temporary procedure ID.
    pub fn create_pending(&mut self) -> (u32, &mut SessionRecord) {
        let mut id = rand::random::<u32>();
        while id == 0 || self.pending.contains_key(&id) {
            id = rand::random::<u32>();
        }
        let record = self
            .pending
            .entry(id)
            .or_insert_with(|| SessionRecord::new(SessionKey::Pending(id)));
        (id, record)
    }

    pub fn get(&self, teid: Teid) -> Option<&SessionRecord> {
        self.established.get(&teid)
    }

    pub fn get_mut(&mut self, teid: Teid) -> Option<&mut SessionRecord> {
        let record = self.established.get_mut(&teid)?;
        self.dirty.insert(teid);
        Some(record)
    }

    pub fn get_pending(&self, id: u32) -> Option<&SessionRecord> {
        self.pending.get(&id)
    }

    pub fn remove(&mut self, teid: Teid) -> Option<SessionRecord> {
        let record = self.established.remove(&teid)?;
        self.dirty.insert(teid);
        Some(record)
    }

    pub fn remove_pending(&mut self, id: u32) -> Option<SessionRecord> {
        self.pending.remove(&id)
    }

    /// Moves a pending record under its control TEID.  On failure the record stays where it was, so
    /// it is always found under exactly one of its keys.
    pub fn establish(&mut self, id: u32, teid: Teid) -> Result<&mut SessionRecord, SessionError> {
        if !self.pending.contains_key(&id) {
            return Err(SessionError::NotFound(SessionKey::Pending(id)));
        }
        if self.established.contains_key(&teid) {
            return Err(SessionError::DuplicateKey(SessionKey::Established(teid)));
        }
        let Some(mut record) = self.pending.remove(&id) else {
            return Err(SessionError::NotFound(SessionKey::Pending(id)));
        };
        record.key = SessionKey::Established(teid);
        self.dirty.insert(teid);
        Ok(self.established.entry(teid).or_insert(record))
    }

    /// Puts back a record previously persisted, without marking it dirty.
    pub fn restore(&mut self, record: SessionRecord) -> Result<(), SessionError> {
        let Some(teid) = record.teid() else {
            return Err(SessionError::InvariantViolation(format!(
                "persisted session {} was never established",
                record.key
            )));
        };
        if self.established.contains_key(&teid) {
            return Err(SessionError::DuplicateKey(record.key));
        }
        self.established.insert(teid, record);
        Ok(())
    }

    pub fn take_dirty(&mut self) -> Vec<Teid> {
        self.dirty.drain().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &SessionRecord> {
        self.established.values().chain(self.pending.values())
    }

    pub fn len(&self) -> usize {
        self.established.len()
    }

    pub fn is_empty(&self) -> bool {
        self.established.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn drain(&mut self) -> Vec<SessionRecord> {
        self.dirty.clear();
        self.established
            .drain()
            .map(|(_, r)| r)
            .chain(self.pending.drain().map(|(_, r)| r))
            .collect()
    }
}
