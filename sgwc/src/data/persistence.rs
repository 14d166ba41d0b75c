use super::SessionRecord;
use crate::protocols::ies::Teid;
use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// External store that sessions are persisted to and hydrated from.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<SessionRecord>>;
    async fn write(&self, record: &SessionRecord) -> Result<()>;
    async fn delete(&self, teid: Teid) -> Result<()>;
}

/// A state store that lives in process memory.  Clones share the same contents, so state survives a
/// restart of the gateway within one process.
#[derive(Clone, Default)]
pub struct MemoryStateStore(Arc<DashMap<Teid, SessionRecord>>);

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, teid: Teid) -> Option<SessionRecord> {
        self.0.get(&teid).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read_all(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.0.iter().map(|r| r.value().clone()).collect())
    }

    async fn write(&self, record: &SessionRecord) -> Result<()> {
        let Some(teid) = record.teid() else {
            bail!("Session {} has no TEID yet", record.key);
        };
        self.0.insert(teid, record.clone());
        Ok(())
    }

    async fn delete(&self, teid: Teid) -> Result<()> {
        self.0.remove(&teid);
        Ok(())
    }
}
