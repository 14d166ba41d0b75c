//! s11 - messages exchanged with the MME over S11 (TS29.274, section 7)
//!
//! The header TEID of each message (`teid`) is the TEID assigned by the receiver.  Requests from
//! the MME also carry `sender_teid` - the MME's own S11 TEID as known to the transport - so that a
//! failure response can be addressed even when no session is found.

pub mod build;

use crate::protocols::ies::*;

#[derive(Debug, Clone)]
pub enum S11Message {
    CreateSessionRequest(CreateSessionRequest),
    CreateSessionResponse(CreateSessionResponse),
    ModifyBearerRequest(ModifyBearerRequest),
    ModifyBearerResponse(ModifyBearerResponse),
    DeleteSessionRequest(DeleteSessionRequest),
    DeleteSessionResponse(DeleteSessionResponse),
    ReleaseAccessBearersRequest(ReleaseAccessBearersRequest),
    ReleaseAccessBearersResponse(ReleaseAccessBearersResponse),
    CreateBearerRequest(CreateBearerRequest),
    CreateBearerResponse(CreateBearerResponse),
    DeleteBearerRequest(DeleteBearerRequest),
    DeleteBearerResponse(DeleteBearerResponse),
}

impl S11Message {
    pub fn name(&self) -> &'static str {
        match self {
            S11Message::CreateSessionRequest(_) => "CreateSessionRequest",
            S11Message::CreateSessionResponse(_) => "CreateSessionResponse",
            S11Message::ModifyBearerRequest(_) => "ModifyBearerRequest",
            S11Message::ModifyBearerResponse(_) => "ModifyBearerResponse",
            S11Message::DeleteSessionRequest(_) => "DeleteSessionRequest",
            S11Message::DeleteSessionResponse(_) => "DeleteSessionResponse",
            S11Message::ReleaseAccessBearersRequest(_) => "ReleaseAccessBearersRequest",
            S11Message::ReleaseAccessBearersResponse(_) => "ReleaseAccessBearersResponse",
            S11Message::CreateBearerRequest(_) => "CreateBearerRequest",
            S11Message::CreateBearerResponse(_) => "CreateBearerResponse",
            S11Message::DeleteBearerRequest(_) => "DeleteBearerRequest",
            S11Message::DeleteBearerResponse(_) => "DeleteBearerResponse",
        }
    }
}

/// A bearer ID with the outcome of an operation on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerCause {
    pub ebi: Ebi,
    pub cause: Cause,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub imsi: Imsi,
    pub rat_type: RatType,
    pub sender_fteid_for_cp: Fteid,
    pub apn: String,
    pub pdn_type: PdnType,
    pub paa: Option<Paa>,
    pub bearer_contexts_to_be_created: Vec<BearerContextToBeCreated>,
}

#[derive(Debug, Clone)]
pub struct BearerContextToBeCreated {
    pub ebi: Ebi,
    pub bearer_level_qos: BearerQos,
    pub tft: Tft,
}

#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
    pub s11_sgw_fteid: Option<Fteid>,
    pub paa: Option<Paa>,
    pub bearer_contexts_created: Vec<BearerContextCreated>,
    pub bearer_contexts_marked_for_removal: Vec<BearerCause>,
}

#[derive(Debug, Clone)]
pub struct BearerContextCreated {
    pub ebi: Ebi,
    pub cause: Cause,
    pub s1u_sgw_fteid: Fteid,
    pub bearer_level_qos: BearerQos,
}

#[derive(Debug, Clone)]
pub struct ModifyBearerRequest {
    pub teid: Teid,
    pub sender_teid: Teid,
    pub trxn: TransactionId,
    pub bearer_contexts_to_be_modified: Vec<BearerContextToBeModified>,
    pub bearer_contexts_to_be_removed: Vec<Ebi>,
}

#[derive(Debug, Clone)]
pub struct BearerContextToBeModified {
    pub ebi: Ebi,
    pub s1u_enb_fteid: Fteid,
}

#[derive(Debug, Clone)]
pub struct ModifyBearerResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
    pub bearer_contexts_modified: Vec<BearerContextModified>,
    pub bearer_contexts_marked_for_removal: Vec<BearerCause>,
    pub bearer_contexts_not_found: Vec<Ebi>,
}

#[derive(Debug, Clone)]
pub struct BearerContextModified {
    pub ebi: Ebi,
    pub cause: Cause,
    pub s1u_sgw_fteid: Fteid,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionRequest {
    pub teid: Teid,
    pub sender_teid: Teid,
    pub trxn: TransactionId,
    pub lbi: Ebi,
    pub sender_fteid_for_cp: Option<Fteid>,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
    pub lbi: Ebi,
}

#[derive(Debug, Clone)]
pub struct ReleaseAccessBearersRequest {
    pub teid: Teid,
    pub trxn: TransactionId,
}

#[derive(Debug, Clone)]
pub struct ReleaseAccessBearersResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
}

#[derive(Debug, Clone)]
pub struct CreateBearerRequest {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub lbi: Ebi,
    pub bearer_contexts: Vec<BearerContextToBeSetup>,
}

#[derive(Debug, Clone)]
pub struct BearerContextToBeSetup {
    pub s1u_sgw_fteid: Fteid,
    pub bearer_level_qos: BearerQos,
    pub tft: Tft,
}

#[derive(Debug, Clone)]
pub struct CreateBearerResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
    pub bearer_contexts: Vec<BearerContextSetup>,
}

#[derive(Debug, Clone)]
pub struct BearerContextSetup {
    pub ebi: Ebi,
    pub cause: Cause,
    // Echo of the SGW F-TEID sent in the request, which identifies the pending bearer.
    pub s1u_sgw_fteid: Fteid,
    pub s1u_enb_fteid: Option<Fteid>,
}

#[derive(Debug, Clone)]
pub struct DeleteBearerRequest {
    pub teid: Teid,
    pub trxn: TransactionId,
    // Present, and equal to the default bearer, when the whole PDN connection goes.
    pub lbi: Option<Ebi>,
    pub ebis: Vec<Ebi>,
    pub delete_default_bearer: bool,
}

#[derive(Debug, Clone)]
pub struct DeleteBearerResponse {
    pub teid: Teid,
    pub trxn: TransactionId,
    pub cause: Cause,
    pub lbi: Option<Ebi>,
    pub bearer_contexts: Vec<BearerCause>,
}
