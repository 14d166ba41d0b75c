use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::data::{PendingBearer, SessionKey};
use crate::protocols::ies::*;
use crate::protocols::{s8, s11};
use crate::stats::counter_indices::*;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info, warn};

#[derive(Deref, DerefMut)]
pub struct CreateBearerProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> CreateBearerProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        CreateBearerProcedure(session_procedure)
    }

    // 1.    S8 CreateBearerRequest >>
    // 2.    Allocate both SGW endpoints of each new bearer and hold it as pending
    // 3. << S11 CreateBearerRequest
    pub fn request(&mut self, r: s8::CreateBearerRequest) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S8 CreateBearerRequest");
        self.count(CREATE_BEARER_REQUESTS);
        let (api, logger, state) = self.parts();
        let config = api.config();
        let teid = r.context_teid;

        let Some(record) = state.sessions.get_mut(teid) else {
            debug!(logger, "Create bearer for unknown session {teid}");
            count(api, NOT_FOUND);
            return Ok(HandlerOutput::untagged_to_pgw(s8::build::create_bearer_response(
                Teid(0),
                r.sequence_number,
                r.pgw_cp_address,
                Cause::ContextNotFound,
                vec![],
            )));
        };
        let imsi64 = record.imsi.imsi64;

        if r.lbi != record.pdn.default_bearer || r.bearer_contexts.is_empty() {
            warn!(
                logger,
                "Create bearer on {teid} linked to {} with {} bearers, default bearer is {}",
                r.lbi,
                r.bearer_contexts.len(),
                record.pdn.default_bearer
            );
            count(api, REJECTED);
            return Ok(HandlerOutput::to_pgw(
                imsi64,
                s8::build::create_bearer_response(
                    record.pdn.pgw_s5s8_cp_teid(),
                    r.sequence_number,
                    r.pgw_cp_address,
                    Cause::RequestRejected,
                    vec![],
                ),
            ));
        }

        let paa = record
            .pdn
            .default_bearer_context()
            .map(|b| b.paa.clone())
            .unwrap_or_default();
        let mut to_be_setup = vec![];
        for b in r.bearer_contexts {
            let sgw_s1u = sgw_s1u_fteid(config, state.teids.next_access_teid());
            let sgw_s5s8_up = sgw_s5s8_up_fteid(config, state.teids.next_core_teid());
            to_be_setup.push(s11::BearerContextToBeSetup {
                s1u_sgw_fteid: sgw_s1u,
                bearer_level_qos: b.bearer_level_qos,
                tft: b.tft.clone(),
            });
            record.pdn.add_pending_bearer(
                r.sequence_number,
                r.pgw_cp_address,
                PendingBearer {
                    qos: b.bearer_level_qos,
                    tft: b.tft,
                    sgw_s1u,
                    sgw_s5s8_up,
                    pgw_s5s8_up: b.pgw_s5s8_up_fteid,
                    paa: paa.clone(),
                },
            );
        }
        info!(
            logger,
            "{} dedicated bearers pending on {teid}, sequence {}",
            to_be_setup.len(),
            r.sequence_number
        );

        let message = s11::build::create_bearer_request(record, r.sequence_number, to_be_setup);
        self.log_message("<< S11 CreateBearerRequest");
        Ok(HandlerOutput::to_mme(imsi64, message))
    }

    // 4.    S11 CreateBearerResponse >>
    // 5.    Promote each bearer the MME accepted and program its tunnel
    // 6. << S8 CreateBearerResponse
    pub fn response(
        &mut self,
        r: s11::CreateBearerResponse,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 CreateBearerResponse");
        let (api, logger, state) = self.parts();
        let teid = r.teid;

        let Some(record) = state.sessions.get_mut(teid) else {
            return Err(SessionError::NotFound(SessionKey::Established(teid)));
        };
        let imsi = record.imsi.clone();

        // The MME answers with the transaction we gave it, which carries the PGW's sequence number.
        let mut sequence = None;
        let mut results = vec![];
        for b in r.bearer_contexts {
            let Some((sequence_number, pgw_cp_address, pending)) =
                record.pdn.take_pending_bearer(b.s1u_sgw_fteid.teid)
            else {
                warn!(
                    logger,
                    "No pending bearer with S1-U TEID {}", b.s1u_sgw_fteid.teid
                );
                results.push(s8::BearerContextSetup {
                    ebi: Some(b.ebi),
                    cause: Cause::ContextNotFound,
                    sgw_s5s8_up_fteid: None,
                    pgw_s5s8_up_fteid: None,
                });
                continue;
            };
            sequence.get_or_insert((sequence_number, pgw_cp_address));

            let cause = if !r.cause.is_accepted() {
                r.cause
            } else if !b.cause.is_accepted() {
                b.cause
            } else if !b.ebi.is_valid() || record.pdn.bearer(b.ebi).is_some() {
                warn!(logger, "MME assigned unusable bearer ID {}", b.ebi);
                Cause::RequestRejected
            } else {
                Cause::RequestAccepted
            };

            let sgw_s5s8_up = pending.sgw_s5s8_up;
            let pgw_s5s8_up = pending.pgw_s5s8_up;
            if cause.is_accepted() {
                let bearer =
                    pending.into_bearer(b.ebi, b.s1u_enb_fteid, sequence_number, pgw_cp_address);
                record.pdn.insert_bearer(bearer)?;
                if let Some(bearer) = record.pdn.bearer(b.ebi) {
                    add_bearer_tunnel(api, bearer, logger);
                }
                count(api, BEARERS_CREATED);
                info!(logger, "Dedicated bearer {} created on {teid}", b.ebi);
            } else {
                info!(
                    logger,
                    "Dedicated bearer with S1-U TEID {} not created - {:?}",
                    b.s1u_sgw_fteid.teid,
                    cause
                );
            }
            results.push(s8::BearerContextSetup {
                ebi: Some(b.ebi),
                cause,
                sgw_s5s8_up_fteid: Some(sgw_s5s8_up),
                pgw_s5s8_up_fteid: Some(pgw_s5s8_up),
            });
        }

        let (sequence_number, pgw_cp_address) = sequence.unwrap_or((
            r.trxn.0,
            record.pdn.pgw_s5s8_cp.and_then(|fteid| fteid.ipv4),
        ));
        let cause = if r.cause.is_accepted() {
            s8::build::aggregate_cause(results.iter().map(|b| b.cause))
        } else {
            r.cause
        };
        let message = s8::build::create_bearer_response(
            record.pdn.pgw_s5s8_cp_teid(),
            sequence_number,
            pgw_cp_address,
            cause,
            results,
        );
        publish_teids(api, state, &imsi);
        self.log_message("<< S8 CreateBearerResponse");
        Ok(HandlerOutput::to_pgw(imsi.imsi64, message))
    }
}
