use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::data::{DeleteBearerProcedure as PendingDelete, SessionKey};
use crate::protocols::ies::*;
use crate::protocols::s11::BearerCause;
use crate::protocols::{s8, s11};
use crate::stats::counter_indices::*;
use atomic_counter::AtomicCounter;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info, warn};

#[derive(Deref, DerefMut)]
pub struct DeleteBearerProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> DeleteBearerProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        DeleteBearerProcedure(session_procedure)
    }

    // 1.    S8 DeleteBearerRequest >>
    // 2. << S11 DeleteBearerRequest  (or << S8 DeleteBearerResponse if none of the bearers exist)
    pub fn request(&mut self, r: s8::DeleteBearerRequest) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S8 DeleteBearerRequest");
        self.count(DELETE_BEARER_REQUESTS);
        let (api, logger, state) = self.parts();
        let teid = r.context_teid;

        let Some(record) = state.sessions.get_mut(teid) else {
            debug!(logger, "Delete bearer for unknown session {teid}");
            count(api, NOT_FOUND);
            return Ok(HandlerOutput::untagged_to_pgw(s8::build::delete_bearer_response(
                Teid(0),
                r.sequence_number,
                r.pgw_cp_address,
                Cause::ContextNotFound,
                vec![],
            )));
        };
        let imsi64 = record.imsi.imsi64;

        let (ebis, rejected): (Vec<Ebi>, Vec<Ebi>) = r
            .ebis
            .iter()
            .copied()
            .partition(|ebi| record.pdn.bearer(*ebi).is_some());
        if ebis.is_empty() {
            warn!(logger, "Delete bearer on {teid} names no known bearer: {:?}", r.ebis);
            count(api, REJECTED);
            return Ok(HandlerOutput::to_pgw(
                imsi64,
                s8::build::delete_bearer_response(
                    record.pdn.pgw_s5s8_cp_teid(),
                    r.sequence_number,
                    r.pgw_cp_address,
                    Cause::RequestRejected,
                    not_found(&rejected),
                ),
            ));
        }
        if !rejected.is_empty() {
            info!(logger, "Delete bearer on {teid} skips unknown bearers {rejected:?}");
        }

        for ebi in ebis.iter() {
            if let Some(bearer) = record.pdn.bearer_mut(*ebi) {
                bearer.sequence_number = r.sequence_number;
                bearer.pgw_cp_address = r.pgw_cp_address;
            }
        }
        let delete_default_bearer = ebis.contains(&record.pdn.default_bearer);
        let message = s11::build::delete_bearer_request(
            record,
            r.sequence_number,
            ebis.clone(),
            delete_default_bearer,
        );
        record.pdn.add_delete_bearer_procedure(PendingDelete {
            sequence_number: r.sequence_number,
            pgw_cp_address: r.pgw_cp_address,
            ebis,
            rejected,
            delete_default_bearer,
        });

        self.log_message("<< S11 DeleteBearerRequest");
        Ok(HandlerOutput::to_mme(imsi64, message))
    }

    // 3.    S11 DeleteBearerResponse >>
    // 4.    Remove the bearers, or the whole session if the default bearer went
    // 5. << S8 DeleteBearerResponse
    pub fn response(
        &mut self,
        r: s11::DeleteBearerResponse,
    ) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 DeleteBearerResponse");
        let (api, logger, state) = self.parts();
        let teid = r.teid;

        let Some(record) = state.sessions.get_mut(teid) else {
            return Err(SessionError::NotFound(SessionKey::Established(teid)));
        };
        let imsi = record.imsi.clone();
        let pgw_teid = record.pdn.pgw_s5s8_cp_teid();

        let mut named = r.bearer_contexts.iter().map(|b| b.ebi).collect::<Vec<_>>();
        named.extend(r.lbi);
        let procedure = match record.pdn.take_delete_bearer_procedure(&named) {
            Some(procedure) => procedure,
            None => {
                // Nothing outstanding matches, so recover the PGW's transaction from the bearer.
                let first = named.first().and_then(|ebi| record.pdn.bearer(*ebi));
                warn!(logger, "No delete bearer procedure outstanding for {named:?}");
                PendingDelete {
                    sequence_number: first.map(|b| b.sequence_number).unwrap_or_default(),
                    pgw_cp_address: first.and_then(|b| b.pgw_cp_address),
                    ebis: named
                        .iter()
                        .copied()
                        .filter(|ebi| record.pdn.bearer(*ebi).is_some())
                        .collect(),
                    rejected: vec![],
                    delete_default_bearer: r.lbi.is_some(),
                }
            }
        };

        if !r.cause.is_accepted() {
            info!(logger, "MME refused to delete bearers {:?} - {:?}", procedure.ebis, r.cause);
            let mut results = procedure
                .ebis
                .iter()
                .map(|ebi| BearerCause {
                    ebi: *ebi,
                    cause: r.cause,
                })
                .collect::<Vec<_>>();
            results.extend(not_found(&procedure.rejected));
            let message = s8::build::delete_bearer_response(
                pgw_teid,
                procedure.sequence_number,
                procedure.pgw_cp_address,
                r.cause,
                results,
            );
            self.log_message("<< S8 DeleteBearerResponse");
            return Ok(HandlerOutput::to_pgw(imsi.imsi64, message));
        }

        let mut results = vec![];
        if procedure.delete_default_bearer || r.lbi.is_some() {
            let default_bearer = record.pdn.default_bearer;
            let ebis = record.pdn.bearers().map(|b| b.ebi).collect::<Vec<_>>();
            if teardown_session(api, state, teid, logger).is_some() {
                api.counters()[BEARERS_DELETED].add(ebis.len());
                info!(logger, "Session {teid} deleted with its default bearer {default_bearer}");
            }
            results.extend(ebis.into_iter().map(|ebi| BearerCause {
                ebi,
                cause: Cause::RequestAccepted,
            }));
        } else {
            for ebi in procedure.ebis.iter() {
                let cause = r
                    .bearer_contexts
                    .iter()
                    .find(|b| b.ebi == *ebi)
                    .map(|b| b.cause)
                    .unwrap_or(Cause::RequestAccepted);
                if cause.is_accepted() {
                    match record.pdn.remove_dedicated_bearer(*ebi) {
                        Some(bearer) => {
                            remove_bearer_tunnel(api, &bearer, logger);
                            count(api, BEARERS_DELETED);
                            info!(logger, "Dedicated bearer {ebi} deleted from {teid}");
                        }
                        None => {
                            warn!(logger, "Bearer {ebi} of {teid} already gone");
                        }
                    }
                }
                results.push(BearerCause { ebi: *ebi, cause });
            }
            publish_teids(api, state, &imsi);
        }
        results.extend(not_found(&procedure.rejected));

        let cause = s8::build::aggregate_cause(results.iter().map(|b| b.cause));
        let message = s8::build::delete_bearer_response(
            pgw_teid,
            procedure.sequence_number,
            procedure.pgw_cp_address,
            cause,
            results,
        );
        self.log_message("<< S8 DeleteBearerResponse");
        Ok(HandlerOutput::to_pgw(imsi.imsi64, message))
    }
}

fn not_found(ebis: &[Ebi]) -> Vec<BearerCause> {
    ebis.iter()
        .map(|ebi| BearerCause {
            ebi: *ebi,
            cause: Cause::ContextNotFound,
        })
        .collect()
}
