use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::data::{BearerContext, SessionKey, SgwState};
use crate::protocols::ies::*;
use crate::protocols::{s8, s11};
use crate::stats::counter_indices::*;
use derive_deref::{Deref, DerefMut};
use slog::{Logger, error, info, warn};

#[derive(Deref, DerefMut)]
pub struct CreateSessionProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> CreateSessionProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        CreateSessionProcedure(session_procedure)
    }

    // 1.    S11 CreateSessionRequest >>
    // 2. << S8 CreateSessionRequest
    pub fn request(
        &mut self,
        r: s11::CreateSessionRequest,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 CreateSessionRequest");
        self.count(CREATE_SESSION_REQUESTS);
        if let Err(e) = check_create_session_request(&r) {
            self.count(REJECTED);
            return Err(e);
        }
        let (api, logger, state) = self.parts();
        let config = api.config();
        let s11::BearerContextToBeCreated {
            ebi,
            bearer_level_qos,
            tft,
        } = r.bearer_contexts_to_be_created[0].clone();

        let sgw_s1u = sgw_s1u_fteid(config, state.teids.next_access_teid());
        let sgw_s5s8_up = sgw_s5s8_up_fteid(config, state.teids.next_core_teid());

        let (id, record) = state.sessions.create_pending();
        record.imsi = r.imsi;
        record.mme_s11 = Some(r.sender_fteid_for_cp);
        record.trxn = r.trxn;
        record.pdn.set_apn(&r.apn);
        record.pdn.default_bearer = ebi;
        let bearer = BearerContext::new(ebi, bearer_level_qos, tft, sgw_s1u, sgw_s5s8_up);
        let message = record
            .pdn
            .insert_bearer(bearer)
            .and_then(|_| {
                s8::build::create_session_request(id, record, r.rat_type, r.pdn_type, r.paa)
            });
        let imsi64 = record.imsi.imsi64;
        info!(
            logger,
            "Create session for IMSI {} APN {}, procedure {id:#x}, S1-U {sgw_s1u}",
            record.imsi,
            record.pdn.apn_in_use
        );
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                state.sessions.remove_pending(id);
                return Err(e);
            }
        };

        self.log_message("<< S8 CreateSessionRequest");
        Ok(HandlerOutput::to_pgw(imsi64, message))
    }

    // 3.    S8 CreateSessionResponse >>
    // 4. << S11 CreateSessionResponse
    //       (and S8 DeleteSessionRequest >> if the PGW's answer is unusable)
    pub fn response(
        &mut self,
        r: s8::CreateSessionResponse,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S8 CreateSessionResponse");
        let (api, logger, state) = self.parts();
        let id = r.temporary_procedure_id;
        let teid = r.context_teid;

        let record = match state.sessions.establish(id, teid) {
            Ok(record) => record,
            Err(SessionError::DuplicateKey(key)) => {
                // The PGW designated a key that another session already has.  That session is left
                // alone and this one fails.
                error!(logger, "Create session response designates {key}, which is in use");
                count(api, INVARIANT_VIOLATIONS);
                let record = state
                    .sessions
                    .remove_pending(id)
                    .ok_or(SessionError::NotFound(SessionKey::Pending(id)))?;
                let message = s11::build::create_session_failure(
                    record.mme_s11_teid(),
                    record.trxn,
                    Cause::SystemFailure,
                    record.pdn.default_bearer,
                );
                return Ok(HandlerOutput::to_mme(record.imsi.imsi64, message));
            }
            Err(e) => return Err(e),
        };
        let imsi = record.imsi.clone();
        record.pdn.sgw_s5s8_cp_teid = teid;
        record.pdn.pgw_s5s8_cp = r.pgw_s5s8_cp_fteid;
        state.ues.add_teid(&imsi, teid);

        let cause = if r.cause.is_accepted() {
            complete_default_bearer(api, state, teid, &r, logger)
        } else {
            info!(logger, "PGW rejected session {teid} with cause {:?}", r.cause);
            Err(r.cause)
        };

        match cause {
            Ok(()) => {
                let record = state
                    .sessions
                    .get(teid)
                    .ok_or(SessionError::NotFound(SessionKey::Established(teid)))?;
                let message = s11::build::create_session_response(
                    record,
                    sgw_s11_fteid(api.config(), teid),
                )?;
                info!(logger, "Session {teid} established for IMSI {imsi}");
                count(api, SESSIONS_CREATED);
                publish_teids(api, state, &imsi);
                self.log_message("<< S11 CreateSessionResponse");
                Ok(HandlerOutput::to_mme(imsi.imsi64, message))
            }
            Err(cause) => {
                // Whatever the PGW holds for this session must go too, unless it never accepted it.
                let pgw_cleanup = r
                    .cause
                    .is_accepted()
                    .then(|| state.sessions.get(teid))
                    .flatten()
                    .map(|record| s8::build::delete_session_request(record, teid));
                let Some(record) = teardown_session(api, state, teid, logger) else {
                    return Err(SessionError::NotFound(SessionKey::Established(teid)));
                };
                count(api, REJECTED);
                let message = s11::build::create_session_failure(
                    record.mme_s11_teid(),
                    record.trxn,
                    cause,
                    record.pdn.default_bearer,
                );
                self.log_message("<< S11 CreateSessionResponse (failure)");
                let output = HandlerOutput::to_mme(imsi.imsi64, message);
                Ok(match pgw_cleanup {
                    Some(delete) => {
                        self.log_message("<< S8 DeleteSessionRequest");
                        output.and_pgw(imsi.imsi64, delete)
                    }
                    None => output,
                })
            }
        }
    }
}

fn check_create_session_request(r: &s11::CreateSessionRequest) -> Result<(), SessionError> {
    if r.rat_type != RatType::Eutran {
        return Err(SessionError::Rejected(format!(
            "RAT type {:?} not supported",
            r.rat_type
        )));
    }
    // A zero TEID is only acceptable from an MME S11 interface, which may assign its TEID later.
    if r.sender_fteid_for_cp.teid == Teid(0)
        && r.sender_fteid_for_cp.interface_type != InterfaceType::S11MmeGtpC
    {
        return Err(SessionError::Rejected(format!(
            "zero sender TEID on interface {:?}",
            r.sender_fteid_for_cp.interface_type
        )));
    }
    let Some(bearer) = r.bearer_contexts_to_be_created.first() else {
        return Err(SessionError::Rejected(
            "no bearer context to be created".to_string(),
        ));
    };
    if !bearer.ebi.is_valid() {
        return Err(SessionError::Rejected(format!(
            "invalid default bearer ID {}",
            bearer.ebi
        )));
    }
    Ok(())
}

// Fills in the default bearer from an accepting PGW response.  Returns the cause to fail the
// session with if the response cannot be used.
fn complete_default_bearer<A: HandlerApi>(
    api: &A,
    state: &mut SgwState,
    teid: Teid,
    r: &s8::CreateSessionResponse,
    logger: &Logger,
) -> Result<(), Cause> {
    let Some(record) = state.sessions.get_mut(teid) else {
        return Err(Cause::ContextNotFound);
    };
    let default_bearer = record.pdn.default_bearer;
    let Some(created) = r
        .bearer_context
        .as_ref()
        .filter(|b| b.ebi == default_bearer && r.eps_bearer_id == default_bearer)
    else {
        warn!(
            logger,
            "PGW answered for bearer {} but the default bearer is {default_bearer}", r.eps_bearer_id
        );
        return Err(Cause::ContextNotFound);
    };

    let paa = match &r.paa {
        Some(paa) => paa.clone(),
        None => match api.allocate_ue_address(&record.imsi, &record.pdn.apn_in_use, logger) {
            Ok(addr) => {
                record.pdn.allocated_ue_ipv4 = Some(addr);
                Paa::ipv4(addr)
            }
            Err(e) => {
                warn!(logger, "No UE address for {}: {e}", record.imsi);
                return Err(Cause::NoResourcesAvailable);
            }
        },
    };

    let Some(bearer) = record.pdn.bearer_mut(default_bearer) else {
        return Err(Cause::ContextNotFound);
    };
    bearer.pgw_s5s8_up = Some(created.pgw_s5s8_up_fteid);
    bearer.qos = created.bearer_level_qos;
    bearer.paa = Some(paa);
    Ok(())
}
