//! mock_pgw - enables a test script to assume the role of the PGW on the S5/S8 reference point

use crate::mock::Mock;
use anyhow::{Result, bail};
use async_channel::Receiver;
use sgwc::SgwC;
use sgwc::protocols::ies::*;
use sgwc::protocols::s8::*;
use sgwc::protocols::{Envelope, Inbound};
use slog::{Logger, info, o};
use std::net::Ipv4Addr;
use std::ops::{Deref, DerefMut};

pub const PGW_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 4);

pub struct MockPgw {
    mock: Mock<S8Message>,
    next_teid: u32,
    next_sequence_number: u32,
}

/// What the PGW knows of one PDN connection.
#[derive(Debug, Clone)]
pub struct PgwSession {
    pub imsi: Imsi,
    pub default_ebi: Ebi,
    // The SGW's key for the session, designated by the PGW.
    pub context_teid: Teid,
    pub pgw_s5s8_cp_fteid: Fteid,
    pub pgw_s5s8_up_fteid: Fteid,
    pub sgw_s5s8_up_fteid: Fteid,
}

impl Deref for MockPgw {
    type Target = Mock<S8Message>;

    fn deref(&self) -> &Self::Target {
        &self.mock
    }
}

impl DerefMut for MockPgw {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.mock
    }
}

impl MockPgw {
    pub fn new(sgwc: SgwC, receiver: Receiver<Envelope<S8Message>>, logger: &Logger) -> Self {
        MockPgw {
            mock: Mock::new(sgwc, receiver, logger.new(o!("pgw" => 1))),
            next_teid: 0x1000,
            next_sequence_number: 100,
        }
    }

    pub fn ue_ipv4(context_teid: Teid) -> Ipv4Addr {
        Ipv4Addr::new(10, 45, 0, (context_teid.0 & 0xff) as u8)
    }

    fn next_teid(&mut self) -> Teid {
        self.next_teid += 1;
        Teid(self.next_teid)
    }

    fn next_sequence_number(&mut self) -> u32 {
        self.next_sequence_number += 1;
        self.next_sequence_number
    }

    pub async fn send_s8(&self, message: S8Message) -> Result<()> {
        self.send(Inbound::s8(None, message)).await
    }

    pub async fn receive_create_session_request(&self) -> Result<CreateSessionRequest> {
        let envelope = self.receive().await?;
        let S8Message::CreateSessionRequest(r) = envelope.message else {
            bail!("Expected CreateSessionRequest, got {:?}", envelope.message)
        };
        info!(self.logger, "CreateSessionRequest <<");
        Ok(r)
    }

    /// Answers a create session request with a fresh session key and, if `with_paa`, a UE address.
    pub async fn send_create_session_response(
        &mut self,
        r: &CreateSessionRequest,
        cause: Cause,
        with_paa: bool,
    ) -> Result<PgwSession> {
        let context_teid = self.next_teid();
        self.send_create_session_response_for(r, context_teid, cause, with_paa)
            .await
    }

    /// Answers a create session request designating `context_teid` as the session key.
    pub async fn send_create_session_response_for(
        &mut self,
        r: &CreateSessionRequest,
        context_teid: Teid,
        cause: Cause,
        with_paa: bool,
    ) -> Result<PgwSession> {
        let session = PgwSession {
            imsi: r.imsi.clone(),
            default_ebi: r.bearer_context.ebi,
            context_teid,
            pgw_s5s8_cp_fteid: Fteid::ipv4(
                InterfaceType::S5S8PgwGtpC,
                Teid(0x5000 + context_teid.0),
                PGW_IP,
            ),
            pgw_s5s8_up_fteid: Fteid::ipv4(
                InterfaceType::S5S8PgwGtpU,
                Teid(0x6000 + context_teid.0),
                PGW_IP,
            ),
            sgw_s5s8_up_fteid: r.bearer_context.sgw_s5s8_up_fteid,
        };
        let paa = with_paa.then(|| Paa::ipv4(Self::ue_ipv4(context_teid)));
        info!(self.logger, "CreateSessionResponse >>");
        self.send_s8(build_s8::create_session_response(
            r,
            context_teid,
            session.pgw_s5s8_cp_fteid,
            session.pgw_s5s8_up_fteid,
            paa,
            cause,
        ))
        .await?;
        Ok(session)
    }

    pub async fn receive_delete_session_request(&self) -> Result<DeleteSessionRequest> {
        let envelope = self.receive().await?;
        let S8Message::DeleteSessionRequest(r) = envelope.message else {
            bail!("Expected DeleteSessionRequest, got {:?}", envelope.message)
        };
        info!(self.logger, "DeleteSessionRequest <<");
        Ok(r)
    }

    pub async fn send_delete_session_response(
        &self,
        r: &DeleteSessionRequest,
        cause: Cause,
    ) -> Result<()> {
        info!(self.logger, "DeleteSessionResponse >>");
        self.send_s8(build_s8::delete_session_response(r, cause))
            .await
    }

    /// Asks for `n` dedicated bearers, returning the sequence number of the request.
    pub async fn send_create_bearer_request(
        &mut self,
        session: &PgwSession,
        n: u8,
    ) -> Result<u32> {
        let sequence_number = self.next_sequence_number();
        let mut bearer_contexts = vec![];
        for ii in 0..n {
            let teid = self.next_teid();
            bearer_contexts.push(BearerContextToBeSetup {
                bearer_level_qos: build_s8::dedicated_bearer_qos(),
                tft: build_s8::voice_tft(ii + 1),
                pgw_s5s8_up_fteid: Fteid::ipv4(
                    InterfaceType::S5S8PgwGtpU,
                    Teid(0x6000 + teid.0),
                    PGW_IP,
                ),
            });
        }
        info!(self.logger, "CreateBearerRequest >>");
        self.send_s8(build_s8::create_bearer_request(
            session,
            sequence_number,
            PGW_IP,
            bearer_contexts,
        ))
        .await?;
        Ok(sequence_number)
    }

    pub async fn receive_create_bearer_response(&self) -> Result<CreateBearerResponse> {
        let envelope = self.receive().await?;
        let S8Message::CreateBearerResponse(r) = envelope.message else {
            bail!("Expected CreateBearerResponse, got {:?}", envelope.message)
        };
        info!(self.logger, "CreateBearerResponse <<");
        Ok(r)
    }

    pub async fn send_delete_bearer_request(
        &mut self,
        session: &PgwSession,
        ebis: Vec<Ebi>,
    ) -> Result<u32> {
        let sequence_number = self.next_sequence_number();
        info!(self.logger, "DeleteBearerRequest >>");
        self.send_s8(build_s8::delete_bearer_request(
            session,
            sequence_number,
            PGW_IP,
            ebis,
        ))
        .await?;
        Ok(sequence_number)
    }

    pub async fn receive_delete_bearer_response(&self) -> Result<DeleteBearerResponse> {
        let envelope = self.receive().await?;
        let S8Message::DeleteBearerResponse(r) = envelope.message else {
            bail!("Expected DeleteBearerResponse, got {:?}", envelope.message)
        };
        info!(self.logger, "DeleteBearerResponse <<");
        Ok(r)
    }
}
