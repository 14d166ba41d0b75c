use super::session_procedure::*;
use super::{HandlerApi, HandlerOutput};
use crate::SessionError;
use crate::protocols::ies::*;
use crate::protocols::s11::{self, BearerCause, BearerContextModified};
use crate::stats::counter_indices::*;
use derive_deref::{Deref, DerefMut};
use slog::{debug, info, warn};

#[derive(Deref, DerefMut)]
pub struct ModifyBearerProcedure<'a, A: HandlerApi>(SessionProcedure<'a, A>);

impl<'a, A: HandlerApi> ModifyBearerProcedure<'a, A> {
    pub fn new(session_procedure: SessionProcedure<'a, A>) -> Self {
        ModifyBearerProcedure(session_procedure)
    }

    // 1.    S11 ModifyBearerRequest >>
    // 2.    Move each bearer's access side to the eNB endpoint given
    // 3.    Remove the bearers listed for removal
    // 4. << S11 ModifyBearerResponse
    pub fn run(&mut self, r: s11::ModifyBearerRequest) -> Result<HandlerOutput, SessionError> {
        self.log_message(">> S11 ModifyBearerRequest");
        self.count(MODIFY_BEARER_REQUESTS);
        let (api, logger, state) = self.parts();

        let Some(record) = state.sessions.get_mut(r.teid) else {
            debug!(logger, "Modify bearer for unknown session {}", r.teid);
            count(api, NOT_FOUND);
            return Ok(HandlerOutput::untagged_to_mme(
                s11::build::modify_bearer_failure(r.sender_teid, r.trxn, Cause::ContextNotFound),
            ));
        };
        record.trxn = r.trxn;

        let mut modified = vec![];
        let mut not_found = vec![];
        for b in r.bearer_contexts_to_be_modified {
            let Some(bearer) = record.pdn.bearer_mut(b.ebi) else {
                not_found.push(b.ebi);
                continue;
            };
            if let Some(old) = bearer.enb_s1u {
                // Downlink must stop on the old path before it starts on the new one.
                if old.has_address() && !old.same_address(&b.s1u_enb_fteid) {
                    if let Err(e) = api.send_end_marker(&old, logger) {
                        warn!(logger, "Failed to send end marker to {old}: {e}");
                    }
                }
                remove_bearer_tunnel(api, bearer, logger);
            }
            bearer.enb_s1u = Some(b.s1u_enb_fteid);
            add_bearer_tunnel(api, bearer, logger);
            modified.push(BearerContextModified {
                ebi: b.ebi,
                cause: Cause::RequestAccepted,
                s1u_sgw_fteid: bearer.sgw_s1u,
            });
        }

        // Paging stays on until some bearer has an access side again.
        if !modified.is_empty() {
            if let Some(ue_ipv4) = record.pdn.paging_rule.take() {
                if let Err(e) = api.remove_paging_rule(ue_ipv4, logger) {
                    warn!(logger, "Failed to remove paging rule for {ue_ipv4}: {e}");
                }
            }
        }

        let mut marked_for_removal = vec![];
        for ebi in r.bearer_contexts_to_be_removed {
            if ebi == record.pdn.default_bearer {
                warn!(logger, "MME asked to remove default bearer {ebi}");
                marked_for_removal.push(BearerCause {
                    ebi,
                    cause: Cause::RequestRejected,
                });
                continue;
            }
            let Some(bearer) = record.pdn.remove_dedicated_bearer(ebi) else {
                warn!(logger, "MME asked to remove unknown bearer {ebi}");
                continue;
            };
            remove_bearer_tunnel(api, &bearer, logger);
            count(api, BEARERS_DELETED);
            info!(logger, "Removed bearer {ebi} of session {}", r.teid);
            marked_for_removal.push(BearerCause {
                ebi,
                cause: Cause::RequestAccepted,
            });
        }

        let removed_any = marked_for_removal.iter().any(|b| b.cause.is_accepted());
        let imsi = record.imsi.clone();
        let message = s11::S11Message::ModifyBearerResponse(s11::ModifyBearerResponse {
            teid: record.mme_s11_teid(),
            trxn: r.trxn,
            cause: Cause::RequestAccepted,
            bearer_contexts_modified: modified,
            bearer_contexts_marked_for_removal: marked_for_removal,
            bearer_contexts_not_found: not_found,
        });
        if removed_any {
            publish_teids(api, state, &imsi);
        }
        self.log_message("<< S11 ModifyBearerResponse");
        Ok(HandlerOutput::to_mme(imsi.imsi64, message))
    }
}
