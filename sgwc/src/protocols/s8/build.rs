//! build - construction of S5/S8 messages sent to the PGW

use super::*;
use crate::SessionError;
use crate::data::SessionRecord;

pub fn create_session_request(
    temporary_procedure_id: u32,
    record: &SessionRecord,
    rat_type: RatType,
    pdn_type: PdnType,
    paa: Option<Paa>,
) -> Result<S8Message, SessionError> {
    let bearer = record.pdn.default_bearer_context()?;
    Ok(S8Message::CreateSessionRequest(CreateSessionRequest {
        temporary_procedure_id,
        imsi: record.imsi.clone(),
        apn: record.pdn.apn_in_use.clone(),
        rat_type,
        pdn_type,
        paa,
        bearer_context: BearerContextToBeCreated {
            ebi: bearer.ebi,
            bearer_level_qos: bearer.qos,
            sgw_s5s8_up_fteid: bearer.sgw_s5s8_up,
        },
    }))
}

pub fn delete_session_request(record: &SessionRecord, context_teid: Teid) -> S8Message {
    S8Message::DeleteSessionRequest(DeleteSessionRequest {
        teid: record.pdn.pgw_s5s8_cp_teid(),
        context_teid,
        imsi: record.imsi.clone(),
        lbi: record.pdn.default_bearer,
    })
}

pub fn create_bearer_response(
    teid: Teid,
    sequence_number: u32,
    pgw_cp_address: Option<Ipv4Addr>,
    cause: Cause,
    bearer_contexts: Vec<BearerContextSetup>,
) -> S8Message {
    S8Message::CreateBearerResponse(CreateBearerResponse {
        teid,
        sequence_number,
        pgw_cp_address,
        cause,
        bearer_contexts,
    })
}

pub fn delete_bearer_response(
    teid: Teid,
    sequence_number: u32,
    pgw_cp_address: Option<Ipv4Addr>,
    cause: Cause,
    bearer_contexts: Vec<BearerCause>,
) -> S8Message {
    S8Message::DeleteBearerResponse(DeleteBearerResponse {
        teid,
        sequence_number,
        pgw_cp_address,
        cause,
        bearer_contexts,
    })
}

/// The overall cause of a response about several bearers, given the cause for each.
pub fn aggregate_cause(causes: impl IntoIterator<Item = Cause>) -> Cause {
    let (mut accepted, mut rejected) = (0, 0);
    for cause in causes {
        if cause.is_accepted() {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }
    match (accepted, rejected) {
        (_, 0) => Cause::RequestAccepted,
        (0, _) => Cause::RequestRejected,
        _ => Cause::RequestAcceptedPartially,
    }
}
