use atomic_counter::{AtomicCounter, RelaxedCounter};
use derive_deref::Deref;
use slog::{Logger, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub mod counter_indices {
    pub const CREATE_SESSION_REQUESTS: usize = 0;
    pub const MODIFY_BEARER_REQUESTS: usize = 1;
    pub const DELETE_SESSION_REQUESTS: usize = 2;
    pub const RELEASE_ACCESS_BEARERS_REQUESTS: usize = 3;
    pub const CREATE_BEARER_REQUESTS: usize = 4;
    pub const DELETE_BEARER_REQUESTS: usize = 5;
    pub const SESSIONS_CREATED: usize = 6;
    pub const SESSIONS_DELETED: usize = 7;
    pub const BEARERS_CREATED: usize = 8;
    pub const BEARERS_DELETED: usize = 9;
    // Counters from here on are logged as warnings.
    pub const REJECTED: usize = 10;
    pub const NOT_FOUND: usize = 11;
    pub const INVARIANT_VIOLATIONS: usize = 12;
    pub const NUM_COUNTERS: usize = 13;
}
use counter_indices::*;

#[derive(Deref)]
pub struct SessionCounters([RelaxedCounter; NUM_COUNTERS]);

impl Default for SessionCounters {
    fn default() -> Self {
        SessionCounters(std::array::from_fn(|_| RelaxedCounter::new(0)))
    }
}

impl SessionCounters {
    pub fn snapshot(&self) -> [usize; NUM_COUNTERS] {
        std::array::from_fn(|idx| self.0[idx].get())
    }
}

pub async fn dump_stats(logger: Logger, counters: Arc<SessionCounters>, interval: Duration) {
    let mut last = [0usize; NUM_COUNTERS];
    loop {
        async_std::task::sleep(interval).await;
        let now = counters.snapshot();

        if now[..REJECTED] != last[..REJECTED] {
            info!(
                &logger,
                "CSReq={} MBReq={} DSReq={} RABReq={} CBReq={} DBReq={} sessions +{} -{} bearers +{} -{}",
                now[CREATE_SESSION_REQUESTS],
                now[MODIFY_BEARER_REQUESTS],
                now[DELETE_SESSION_REQUESTS],
                now[RELEASE_ACCESS_BEARERS_REQUESTS],
                now[CREATE_BEARER_REQUESTS],
                now[DELETE_BEARER_REQUESTS],
                now[SESSIONS_CREATED],
                now[SESSIONS_DELETED],
                now[BEARERS_CREATED],
                now[BEARERS_DELETED]
            );
        }

        if now[REJECTED..] != last[REJECTED..] {
            warn!(
                &logger,
                "FAILURES rejected={} not_found={} invariant_violations={}",
                now[REJECTED],
                now[NOT_FOUND],
                now[INVARIANT_VIOLATIONS]
            );
        }
        last = now;
    }
}
