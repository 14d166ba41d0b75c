use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::data::SessionKey;
use crate::protocols::ies::*;
use crate::protocols::{s8, s11};
use crate::stats::counter_indices::*;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info, warn};

#[derive(Deref, DerefMut)]
pub struct DeleteSessionProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> DeleteSessionProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        DeleteSessionProcedure(session_procedure)
    }

    // 1.    S11 DeleteSessionRequest >>
    // 2. << S8 DeleteSessionRequest  (or << S11 DeleteSessionResponse if the request is no good)
    pub fn request(
        &mut self,
        r: s11::DeleteSessionRequest,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 DeleteSessionRequest");
        self.count(DELETE_SESSION_REQUESTS);
        let (api, logger, state) = self.parts();

        let Some(record) = state.sessions.get_mut(r.teid) else {
            debug!(logger, "Delete session for unknown session {}", r.teid);
            count(api, NOT_FOUND);
            return Ok(HandlerOutput::untagged_to_mme(
                s11::build::delete_session_response(
                    r.sender_teid,
                    r.trxn,
                    Cause::ContextNotFound,
                    r.lbi,
                ),
            ));
        };
        let imsi64 = record.imsi.imsi64;

        let failure = if r
            .sender_fteid_for_cp
            .is_some_and(|fteid| fteid.teid != record.mme_s11_teid())
        {
            warn!(
                logger,
                "Delete session {} from S11 TEID {} but the session belongs to {}",
                r.teid,
                r.sender_fteid_for_cp.map(|f| f.teid).unwrap_or_default(),
                record.mme_s11_teid()
            );
            Some(Cause::InvalidPeer)
        } else if r.lbi != record.pdn.default_bearer {
            warn!(
                logger,
                "Delete session {} names bearer {} but the default bearer is {}",
                r.teid,
                r.lbi,
                record.pdn.default_bearer
            );
            Some(Cause::MandatoryIeIncorrect)
        } else {
            None
        };
        if let Some(cause) = failure {
            count(api, REJECTED);
            self.log_message("<< S11 DeleteSessionResponse (failure)");
            return Ok(HandlerOutput::to_mme(
                imsi64,
                s11::build::delete_session_response(r.sender_teid, r.trxn, cause, r.lbi),
            ));
        }

        record.trxn = r.trxn;
        let message = s8::build::delete_session_request(record, r.teid);
        self.log_message("<< S8 DeleteSessionRequest");
        Ok(HandlerOutput::to_pgw(imsi64, message))
    }

    // 3.    S8 DeleteSessionResponse >>
    // 4.    Tear down the session
    // 5. << S11 DeleteSessionResponse
    pub fn response(
        &mut self,
        r: s8::DeleteSessionResponse,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S8 DeleteSessionResponse");
        let (api, logger, state) = self.parts();
        let teid = r.context_teid;

        let Some(record) = teardown_session(api, state, teid, logger) else {
            return Err(SessionError::NotFound(SessionKey::Established(teid)));
        };

        // The session goes regardless, but the MME hears about a response that named the wrong
        // bearer.
        let cause = match r.lbi {
            Some(lbi) if lbi != record.pdn.default_bearer => {
                warn!(
                    logger,
                    "PGW deleted session {teid} naming bearer {lbi}, default bearer is {}",
                    record.pdn.default_bearer
                );
                Cause::MandatoryIeIncorrect
            }
            _ => r.cause,
        };
        info!(logger, "Session {teid} of IMSI {} deleted", record.imsi);

        let message = s11::build::delete_session_response(
            record.mme_s11_teid(),
            record.trxn,
            cause,
            record.pdn.default_bearer,
        );
        self.log_message("<< S11 DeleteSessionResponse");
        Ok(HandlerOutput::to_mme(record.imsi.imsi64, message))
    }
}
