use super::{SessionContextStore, SessionRecord, StateStore, TeidAllocator, UeContextStore};
use crate::protocols::ies::Teid;
use anyhow::Result;
use slog::{Logger, info, warn};

/// All session state of the gateway.  It is owned by the control task, which is the only thing that
/// ever touches it.
pub struct SgwState {
    pub sessions: SessionContextStore,
    pub ues: UeContextStore,
    pub teids: TeidAllocator,
}

impl Default for SgwState {
    fn default() -> Self {
        Self::new()
    }
}

impl SgwState {
    pub fn new() -> Self {
        SgwState {
            sessions: SessionContextStore::new(),
            ues: UeContextStore::new(),
            teids: TeidAllocator::new(),
        }
    }

    /// Constructs the state, hydrating it from `persist` if given.  A store that cannot be read is
    /// logged and the gateway starts empty.
    pub async fn init(persist: Option<&dyn StateStore>, logger: &Logger) -> Self {
        let mut state = Self::new();
        if let Some(store) = persist {
            match state.restore(store, logger).await {
                Ok(n) => info!(logger, "Restored {n} sessions"),
                Err(e) => warn!(logger, "Failed to restore state - starting empty: {e}"),
            }
        }
        state
    }

    /// Releases all records, handing them back for any final cleanup.
    pub fn teardown(mut self) -> Vec<SessionRecord> {
        self.ues.clear();
        self.sessions.drain()
    }

    /// Writes sessions changed since the last snapshot to the store, and deletes removed ones.
    pub async fn snapshot(&mut self, store: &dyn StateStore, logger: &Logger) {
        for teid in self.sessions.take_dirty() {
            let result = match self.sessions.get(teid) {
                Some(record) => store.write(record).await,
                None => store.delete(teid).await,
            };
            if let Err(e) = result {
                warn!(logger, "Failed to persist session {teid}: {e}");
            }
        }
    }

    /// Loads every persisted session, rebuilds the subscriber index and moves the TEID counters
    /// past the values already in use.
    pub async fn restore(&mut self, store: &dyn StateStore, logger: &Logger) -> Result<usize> {
        let records = store.read_all().await?;
        let mut restored = 0;
        let mut max_access = Teid(0);
        let mut max_core = Teid(0);
        for record in records {
            for bearer in record.pdn.bearers() {
                max_access = max_access.max(bearer.sgw_s1u.teid);
                max_core = max_core.max(bearer.sgw_s5s8_up.teid);
            }
            for pending in record.pdn.pending_bearers() {
                max_access = max_access.max(pending.sgw_s1u.teid);
                max_core = max_core.max(pending.sgw_s5s8_up.teid);
            }
            let imsi = record.imsi.clone();
            let teid = record.teid();
            match self.sessions.restore(record) {
                Ok(()) => {
                    if let Some(teid) = teid {
                        self.ues.add_teid(&imsi, teid);
                    }
                    restored += 1;
                }
                Err(e) => warn!(logger, "Skipped persisted session: {e}"),
            }
        }
        self.teids.resume_after(max_access, max_core);
        Ok(restored)
    }
}

