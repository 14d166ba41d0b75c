//! s8 - messages exchanged with the PGW over S5/S8 (TS29.274, section 7)
//!
//! `context_teid` on messages from the PGW is the SGW's S5/S8 control TEID, which is also the key
//! of the session on S11.  On create-session the key is not yet known, so the exchange is
//! correlated by a temporary procedure ID instead.

pub mod build;

use crate::protocols::ies::*;
use crate::protocols::s11::BearerCause;
use std::net::Ipv4Addr;

#[derive(Debug, Clone)]
pub enum S8Message {
    CreateSessionRequest(CreateSessionRequest),
    CreateSessionResponse(CreateSessionResponse),
    DeleteSessionRequest(DeleteSessionRequest),
    DeleteSessionResponse(DeleteSessionResponse),
    CreateBearerRequest(CreateBearerRequest),
    CreateBearerResponse(CreateBearerResponse),
    DeleteBearerRequest(DeleteBearerRequest),
    DeleteBearerResponse(DeleteBearerResponse),
}

impl S8Message {
    pub fn name(&self) -> &'static str {
        match self {
            S8Message::CreateSessionRequest(_) => "CreateSessionRequest",
            S8Message::CreateSessionResponse(_) => "CreateSessionResponse",
            S8Message::DeleteSessionRequest(_) => "DeleteSessionRequest",
            S8Message::DeleteSessionResponse(_) => "DeleteSessionResponse",
            S8Message::CreateBearerRequest(_) => "CreateBearerRequest",
            S8Message::CreateBearerResponse(_) => "CreateBearerResponse",
            S8Message::DeleteBearerRequest(_) => "DeleteBearerRequest",
            S8Message::DeleteBearerResponse(_) => "DeleteBearerResponse",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub temporary_procedure_id: u32,
    pub imsi: Imsi,
    pub apn: String,
    pub rat_type: RatType,
    pub pdn_type: PdnType,
    pub paa: Option<Paa>,
    pub bearer_context: BearerContextToBeCreated,
}

#[derive(Debug, Clone)]
pub struct BearerContextToBeCreated {
    pub ebi: Ebi,
    pub bearer_level_qos: BearerQos,
    pub sgw_s5s8_up_fteid: Fteid,
}

#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    pub temporary_procedure_id: u32,
    pub context_teid: Teid,
    pub cause: Cause,
    pub pgw_s5s8_cp_fteid: Option<Fteid>,
    pub paa: Option<Paa>,
    pub eps_bearer_id: Ebi,
    pub bearer_context: Option<BearerContextCreated>,
}

#[derive(Debug, Clone)]
pub struct BearerContextCreated {
    pub ebi: Ebi,
    pub cause: Cause,
    pub pgw_s5s8_up_fteid: Fteid,
    pub bearer_level_qos: BearerQos,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionRequest {
    pub teid: Teid,
    pub context_teid: Teid,
    pub imsi: Imsi,
    pub lbi: Ebi,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionResponse {
    pub context_teid: Teid,
    pub cause: Cause,
    pub lbi: Option<Ebi>,
}

#[derive(Debug, Clone)]
pub struct CreateBearerRequest {
    pub context_teid: Teid,
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    pub lbi: Ebi,
    pub bearer_contexts: Vec<BearerContextToBeSetup>,
}

#[derive(Debug, Clone)]
pub struct BearerContextToBeSetup {
    pub bearer_level_qos: BearerQos,
    pub tft: Tft,
    pub pgw_s5s8_up_fteid: Fteid,
}

#[derive(Debug, Clone)]
pub struct CreateBearerResponse {
    pub teid: Teid,
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    pub cause: Cause,
    pub bearer_contexts: Vec<BearerContextSetup>,
}

#[derive(Debug, Clone)]
pub struct BearerContextSetup {
    pub ebi: Option<Ebi>,
    pub cause: Cause,
    pub sgw_s5s8_up_fteid: Option<Fteid>,
    pub pgw_s5s8_up_fteid: Option<Fteid>,
}

#[derive(Debug, Clone)]
pub struct DeleteBearerRequest {
    pub context_teid: Teid,
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    pub ebis: Vec<Ebi>,
}

#[derive(Debug, Clone)]
pub struct DeleteBearerResponse {
    pub teid: Teid,
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    pub cause: Cause,
    pub bearer_contexts: Vec<BearerCause>,
}
