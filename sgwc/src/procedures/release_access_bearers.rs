use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::protocols::ies::*;
use crate::protocols::s11;
use crate::stats::counter_indices::*;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info, warn};

#[derive(Deref, DerefMut)]
pub struct ReleaseAccessBearersProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> ReleaseAccessBearersProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        ReleaseAccessBearersProcedure(session_procedure)
    }

    // 1.    S11 ReleaseAccessBearersRequest >>
    // 2. << S11 ReleaseAccessBearersResponse
    // 3.    Drop the S1-U side of every bearer of the subscriber and page on downlink instead
    pub fn run(
        &mut self,
        r: s11::ReleaseAccessBearersRequest,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 ReleaseAccessBearersRequest");
        self.count(RELEASE_ACCESS_BEARERS_REQUESTS);
        let (api, logger, state) = self.parts();

        let Some(record) = state.sessions.get_mut(r.teid) else {
            debug!(logger, "Release access bearers for unknown session {}", r.teid);
            count(api, NOT_FOUND);
            return Ok(HandlerOutput::untagged_to_mme(
                s11::build::release_access_bearers_response(
                    Teid(0),
                    r.trxn,
                    Cause::ContextNotFound,
                ),
            ));
        };
        record.trxn = r.trxn;
        let imsi64 = record.imsi.imsi64;
        let message = s11::build::release_access_bearers_response(
            record.mme_s11_teid(),
            r.trxn,
            Cause::RequestAccepted,
        );

        // The S1 connection is per subscriber, so every PDN connection loses its access side.
        let mut teids = state.ues.teids(imsi64);
        if teids.is_empty() {
            teids.push(r.teid);
        }
        for teid in teids {
            let Some(record) = state.sessions.get_mut(teid) else {
                warn!(logger, "Subscriber index names session {teid}, which does not exist");
                continue;
            };
            for bearer in record.pdn.bearers_mut() {
                remove_bearer_tunnel(api, bearer, logger);
                bearer.clear_access_side();
            }
            if record.pdn.paging_rule.is_none() {
                if let Some(ue_ipv4) = record.pdn.ue_ipv4() {
                    match api.add_paging_rule(ue_ipv4, logger) {
                        Ok(()) => record.pdn.paging_rule = Some(ue_ipv4),
                        Err(e) => warn!(logger, "Failed to add paging rule for {ue_ipv4}: {e}"),
                    }
                }
            }
            info!(logger, "Released access bearers of session {teid}");
        }

        self.log_message("<< S11 ReleaseAccessBearersResponse");
        Ok(HandlerOutput::to_mme(imsi64, message))
    }
}
