//! teid - local TEID allocation for the two user plane segments

use crate::protocols::ies::Teid;
use atomic_counter::{AtomicCounter, ConsistentCounter};

// The access plane counter starts here, so the first S1-U TEID handed out is 0x80000000.
pub const INITIAL_ACCESS_TEID: u32 = 0x7FFF_FFFF;

/// Allocator of S1-U (access) and S5/S8-U (core) TEIDs.  Each plane is a counter advanced by atomic
/// increment, so an allocator can be shared between threads.  Wraparound is not prevented.
pub struct TeidAllocator {
    access: ConsistentCounter,
    core: ConsistentCounter,
}

impl Default for TeidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TeidAllocator {
    pub fn new() -> Self {
        TeidAllocator {
            access: ConsistentCounter::new(INITIAL_ACCESS_TEID as usize),
            core: ConsistentCounter::new(0),
        }
    }

    pub fn next_access_teid(&self) -> Teid {
        Teid((self.access.inc() + 1) as u32)
    }

    pub fn next_core_teid(&self) -> Teid {
        Teid((self.core.inc() + 1) as u32)
    }

    /// Move the counters past TEIDs that are already in use, e.g. after restoring state.  Counters
    /// never go backwards.
    pub fn resume_after(&self, access: Teid, core: Teid) {
        advance_to(&self.access, access.0 as usize);
        advance_to(&self.core, core.0 as usize);
    }
}

fn advance_to(counter: &ConsistentCounter, value: usize) {
    let current = counter.get();
    if value > current {
        counter.add(value - current);
    }
}
