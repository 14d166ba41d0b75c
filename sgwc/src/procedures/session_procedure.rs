use super::{HandlerApi, Procedure};
use crate::data::{
    BearerContext, SGW_C_TEID_FIELD, SGW_U_TEID_FIELD, SessionRecord, SgwState, join_teids,
};
use crate::protocols::ies::{Fteid, Imsi, InterfaceType, Teid};
use crate::stats::counter_indices::SESSIONS_DELETED;
use crate::Config;
use atomic_counter::AtomicCounter;
use slog::{Logger, warn};

/// Base of every procedure - the handler services plus the session state, borrowed for the duration
/// of one inbound message.
pub struct SessionProcedure<'a, A: HandlerApi> {
    base: Procedure<'a, A>,
    state: &'a mut SgwState,
}

impl<'a, A: HandlerApi> std::ops::Deref for SessionProcedure<'a, A> {
    type Target = Procedure<'a, A>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<'a, A: HandlerApi> SessionProcedure<'a, A> {
    pub fn new(api: &'a A, state: &'a mut SgwState, logger: &'a Logger) -> Self {
        SessionProcedure {
            base: Procedure::new(api, logger),
            state,
        }
    }

    /// Splits the procedure so that the stores can be borrowed independently of the services.
    pub fn parts(&mut self) -> (&'a A, &'a Logger, &mut SgwState) {
        (self.base.api, self.base.logger, &mut *self.state)
    }

    pub fn count(&self, idx: usize) {
        count(self.api, idx)
    }
}

pub fn count<A: HandlerApi>(api: &A, idx: usize) {
    api.counters()[idx].inc();
}

pub fn sgw_s11_fteid(config: &Config, teid: Teid) -> Fteid {
    Fteid::ipv4(InterfaceType::S11S4SgwGtpC, teid, config.s11_ip)
}

pub fn sgw_s1u_fteid(config: &Config, teid: Teid) -> Fteid {
    Fteid::ipv4(InterfaceType::S1uSgwGtpU, teid, config.s1u_ip)
}

pub fn sgw_s5s8_up_fteid(config: &Config, teid: Teid) -> Fteid {
    Fteid::ipv4(InterfaceType::S5S8SgwGtpU, teid, config.s5s8_ip)
}

/// Publishes the subscriber's control TEIDs and core side user plane TEIDs to the directory.
pub fn publish_teids<A: HandlerApi>(api: &A, state: &SgwState, imsi: &Imsi) {
    let teids = state.ues.teids(imsi.imsi64);
    let user_teids = teids
        .iter()
        .filter_map(|teid| state.sessions.get(*teid))
        .flat_map(|record| record.pdn.bearers().map(|b| b.sgw_s5s8_up.teid.0))
        .collect::<Vec<_>>();
    api.update_directory_field(
        imsi,
        SGW_C_TEID_FIELD,
        join_teids(teids.iter().map(|teid| teid.0)),
    );
    api.update_directory_field(imsi, SGW_U_TEID_FIELD, join_teids(user_teids));
}

/// Removes a session from both indices and releases everything it holds on the userplane and in the
/// address pool.  Returns None if the session is already gone, in which case nothing is released.
pub fn teardown_session<A: HandlerApi>(
    api: &A,
    state: &mut SgwState,
    teid: Teid,
    logger: &Logger,
) -> Option<SessionRecord> {
    let mut record = state.sessions.remove(teid)?;
    state.ues.remove_teid(record.imsi.imsi64, teid);
    release_userplane(api, &mut record, logger);
    count(api, SESSIONS_DELETED);
    publish_teids(api, state, &record.imsi);
    Some(record)
}

/// Tears down every tunnel, paging rule and pool address of a session.
pub fn release_userplane<A: HandlerApi>(api: &A, record: &mut SessionRecord, logger: &Logger) {
    for bearer in record.pdn.bearers() {
        remove_bearer_tunnel(api, bearer, logger);
    }
    if let Some(ue_ipv4) = record.pdn.paging_rule.take() {
        if let Err(e) = api.remove_paging_rule(ue_ipv4, logger) {
            warn!(logger, "Failed to remove paging rule for {ue_ipv4}: {e}");
        }
    }
    if let Some(addr) = record.pdn.allocated_ue_ipv4.take() {
        if let Err(e) = api.release_ue_address(&record.imsi, &record.pdn.apn_in_use, addr, logger) {
            warn!(logger, "Failed to release UE address {addr}: {e}");
        }
    }
}

pub fn add_bearer_tunnel<A: HandlerApi>(api: &A, bearer: &BearerContext, logger: &Logger) {
    let Some(tunnel) = bearer.tunnel() else {
        warn!(logger, "Bearer {} has no peer endpoints to program", bearer.ebi);
        return;
    };
    if let Err(e) = api.add_tunnel(&tunnel, logger) {
        warn!(logger, "Failed to program tunnel {tunnel}: {e}");
    }
}

// A tunnel is only programmed once the eNB's endpoint is known.
pub fn remove_bearer_tunnel<A: HandlerApi>(api: &A, bearer: &BearerContext, logger: &Logger) {
    if bearer.enb_s1u.is_none() {
        return;
    }
    if let Err(e) = api.remove_tunnel(bearer.sgw_s1u.teid, bearer.sgw_s5s8_up.teid, logger) {
        warn!(logger, "Failed to remove tunnel of bearer {}: {e}", bearer.ebi);
    }
}
