//! build - construction of S11 messages sent to the MME

use super::*;
use crate::SessionError;
use crate::data::SessionRecord;

pub fn create_session_response(
    record: &SessionRecord,
    sgw_s11_fteid: Fteid,
) -> Result<S11Message, SessionError> {
    let bearer = record.pdn.default_bearer_context()?;
    Ok(S11Message::CreateSessionResponse(CreateSessionResponse {
        teid: record.mme_s11_teid(),
        trxn: record.trxn,
        cause: Cause::RequestAccepted,
        s11_sgw_fteid: Some(sgw_s11_fteid),
        paa: bearer.paa.clone(),
        bearer_contexts_created: vec![BearerContextCreated {
            ebi: bearer.ebi,
            cause: Cause::RequestAccepted,
            s1u_sgw_fteid: bearer.sgw_s1u,
            bearer_level_qos: bearer.qos,
        }],
        bearer_contexts_marked_for_removal: vec![],
    }))
}

pub fn create_session_failure(
    teid: Teid,
    trxn: TransactionId,
    cause: Cause,
    ebi: Ebi,
) -> S11Message {
    S11Message::CreateSessionResponse(CreateSessionResponse {
        teid,
        trxn,
        cause,
        s11_sgw_fteid: None,
        paa: None,
        bearer_contexts_created: vec![],
        bearer_contexts_marked_for_removal: vec![BearerCause { ebi, cause }],
    })
}

pub fn modify_bearer_failure(teid: Teid, trxn: TransactionId, cause: Cause) -> S11Message {
    S11Message::ModifyBearerResponse(ModifyBearerResponse {
        teid,
        trxn,
        cause,
        bearer_contexts_modified: vec![],
        bearer_contexts_marked_for_removal: vec![],
        bearer_contexts_not_found: vec![],
    })
}

pub fn delete_session_response(
    teid: Teid,
    trxn: TransactionId,
    cause: Cause,
    lbi: Ebi,
) -> S11Message {
    S11Message::DeleteSessionResponse(DeleteSessionResponse {
        teid,
        trxn,
        cause,
        lbi,
    })
}

pub fn release_access_bearers_response(
    teid: Teid,
    trxn: TransactionId,
    cause: Cause,
) -> S11Message {
    S11Message::ReleaseAccessBearersResponse(ReleaseAccessBearersResponse { teid, trxn, cause })
}

pub fn create_bearer_request(
    record: &SessionRecord,
    sequence_number: u32,
    bearer_contexts: Vec<BearerContextToBeSetup>,
) -> S11Message {
    S11Message::CreateBearerRequest(CreateBearerRequest {
        teid: record.mme_s11_teid(),
        trxn: TransactionId(sequence_number),
        lbi: record.pdn.default_bearer,
        bearer_contexts,
    })
}

pub fn delete_bearer_request(
    record: &SessionRecord,
    sequence_number: u32,
    ebis: Vec<Ebi>,
    delete_default_bearer: bool,
) -> S11Message {
    S11Message::DeleteBearerRequest(DeleteBearerRequest {
        teid: record.mme_s11_teid(),
        trxn: TransactionId(sequence_number),
        lbi: delete_default_bearer.then_some(record.pdn.default_bearer),
        ebis,
        delete_default_bearer,
    })
}
