//! mock_mme - enables a test script to assume the role of the MME on the S11 reference point

use crate::mock::Mock;
use anyhow::{Result, bail, ensure};
use async_channel::Receiver;
use sgwc::SgwC;
use sgwc::protocols::ies::*;
use sgwc::protocols::s11::*;
use sgwc::protocols::{Envelope, Inbound};
use slog::{Logger, info, o};
use std::net::Ipv4Addr;
use std::ops::{Deref, DerefMut};

pub const MME_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);

pub struct MockMme {
    mock: Mock<S11Message>,
    next_teid: u32,
    next_trxn: u32,
}

/// What the MME knows of one PDN connection.
#[derive(Debug, Clone)]
pub struct MmeSession {
    pub imsi: Imsi,
    pub default_ebi: Ebi,
    pub mme_s11_teid: Teid,
    pub sgw_s11_teid: Teid,
    pub s1u_sgw_fteid: Option<Fteid>,
    pub ue_ipv4: Option<Ipv4Addr>,
}

impl Deref for MockMme {
    type Target = Mock<S11Message>;

    fn deref(&self) -> &Self::Target {
        &self.mock
    }
}

impl DerefMut for MockMme {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.mock
    }
}

impl MockMme {
    pub fn new(sgwc: SgwC, receiver: Receiver<Envelope<S11Message>>, logger: &Logger) -> Self {
        MockMme {
            mock: Mock::new(sgwc, receiver, logger.new(o!("mme" => 1))),
            next_teid: 0x100,
            next_trxn: 1,
        }
    }

    pub fn new_session(&mut self, imsi: &str, default_ebi: u8) -> Result<MmeSession> {
        self.next_teid += 1;
        Ok(MmeSession {
            imsi: Imsi::from_digits(imsi)?,
            default_ebi: Ebi(default_ebi),
            mme_s11_teid: Teid(self.next_teid),
            sgw_s11_teid: Teid(0),
            s1u_sgw_fteid: None,
            ue_ipv4: None,
        })
    }

    pub fn mme_s11_fteid(session: &MmeSession) -> Fteid {
        Fteid::ipv4(InterfaceType::S11MmeGtpC, session.mme_s11_teid, MME_IP)
    }

    /// An eNB S1-U endpoint for bearer `ebi`, at eNB number `enb`.
    pub fn enb_fteid(enb: u8, ebi: Ebi) -> Fteid {
        Fteid::ipv4(
            InterfaceType::S1uEnbGtpU,
            Teid(0xe000 + ebi.0 as u32),
            Ipv4Addr::new(127, 0, 1, enb),
        )
    }

    fn trxn(&mut self) -> TransactionId {
        self.next_trxn += 1;
        TransactionId(self.next_trxn)
    }

    pub async fn send_s11(&self, imsi64: Option<u64>, message: S11Message) -> Result<()> {
        self.send(Inbound::s11(imsi64, message)).await
    }

    pub async fn send_create_session_request(
        &mut self,
        session: &MmeSession,
        apn: &str,
    ) -> Result<()> {
        let trxn = self.trxn();
        let r = build_s11::create_session_request(
            session,
            Self::mme_s11_fteid(session),
            trxn,
            apn,
        );
        info!(self.logger, "CreateSessionRequest >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            S11Message::CreateSessionRequest(r),
        )
        .await
    }

    pub async fn send_create_session_request_with(
        &mut self,
        session: &MmeSession,
        apn: &str,
        f: impl FnOnce(&mut CreateSessionRequest),
    ) -> Result<()> {
        let trxn = self.trxn();
        let mut r = build_s11::create_session_request(
            session,
            Self::mme_s11_fteid(session),
            trxn,
            apn,
        );
        f(&mut r);
        info!(self.logger, "CreateSessionRequest >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            S11Message::CreateSessionRequest(r),
        )
        .await
    }

    /// Receives the create session response, and if it is successful records the SGW's endpoints in
    /// the session.
    pub async fn receive_create_session_response(
        &self,
        session: &mut MmeSession,
    ) -> Result<CreateSessionResponse> {
        let envelope = self.receive().await?;
        let S11Message::CreateSessionResponse(r) = envelope.message else {
            bail!("Expected CreateSessionResponse, got {:?}", envelope.message)
        };
        info!(self.logger, "CreateSessionResponse <<");
        ensure!(
            r.teid == session.mme_s11_teid,
            "Response sent to TEID {} rather than {}",
            r.teid,
            session.mme_s11_teid
        );
        if r.cause.is_accepted() {
            let Some(sgw_s11) = r.s11_sgw_fteid else {
                bail!("No SGW S11 F-TEID in accepted CreateSessionResponse")
            };
            let Some(bearer) = r.bearer_contexts_created.first() else {
                bail!("No bearer context in accepted CreateSessionResponse")
            };
            session.sgw_s11_teid = sgw_s11.teid;
            session.s1u_sgw_fteid = Some(bearer.s1u_sgw_fteid);
            session.ue_ipv4 = r.paa.as_ref().and_then(|paa| paa.ipv4);
        }
        Ok(r)
    }

    pub async fn send_modify_bearer_request(
        &mut self,
        session: &MmeSession,
        modify: Vec<(Ebi, Fteid)>,
        remove: Vec<Ebi>,
    ) -> Result<()> {
        let trxn = self.trxn();
        info!(self.logger, "ModifyBearerRequest >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            build_s11::modify_bearer_request(session, trxn, modify, remove),
        )
        .await
    }

    pub async fn receive_modify_bearer_response(&self) -> Result<ModifyBearerResponse> {
        let envelope = self.receive().await?;
        let S11Message::ModifyBearerResponse(r) = envelope.message else {
            bail!("Expected ModifyBearerResponse, got {:?}", envelope.message)
        };
        info!(self.logger, "ModifyBearerResponse <<");
        Ok(r)
    }

    pub async fn send_delete_session_request(
        &mut self,
        session: &MmeSession,
        lbi: Ebi,
        sender_fteid_for_cp: Option<Fteid>,
    ) -> Result<()> {
        let trxn = self.trxn();
        info!(self.logger, "DeleteSessionRequest >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            build_s11::delete_session_request(session, trxn, lbi, sender_fteid_for_cp),
        )
        .await
    }

    pub async fn receive_delete_session_response(&self) -> Result<DeleteSessionResponse> {
        let envelope = self.receive().await?;
        let S11Message::DeleteSessionResponse(r) = envelope.message else {
            bail!("Expected DeleteSessionResponse, got {:?}", envelope.message)
        };
        info!(self.logger, "DeleteSessionResponse <<");
        Ok(r)
    }

    pub async fn send_release_access_bearers_request(
        &mut self,
        imsi64: Option<u64>,
        teid: Teid,
    ) -> Result<()> {
        let trxn = self.trxn();
        info!(self.logger, "ReleaseAccessBearersRequest >>");
        self.send_s11(imsi64, build_s11::release_access_bearers_request(teid, trxn))
            .await
    }

    pub async fn receive_release_access_bearers_response(
        &self,
    ) -> Result<ReleaseAccessBearersResponse> {
        let envelope = self.receive().await?;
        let S11Message::ReleaseAccessBearersResponse(r) = envelope.message else {
            bail!(
                "Expected ReleaseAccessBearersResponse, got {:?}",
                envelope.message
            )
        };
        info!(self.logger, "ReleaseAccessBearersResponse <<");
        Ok(r)
    }

    pub async fn receive_create_bearer_request(&self) -> Result<CreateBearerRequest> {
        let envelope = self.receive().await?;
        let S11Message::CreateBearerRequest(r) = envelope.message else {
            bail!("Expected CreateBearerRequest, got {:?}", envelope.message)
        };
        info!(self.logger, "CreateBearerRequest <<");
        Ok(r)
    }

    /// Answers a create bearer request, assigning `ebis` with their causes to the requested bearers
    /// in order.
    pub async fn send_create_bearer_response(
        &self,
        session: &MmeSession,
        r: &CreateBearerRequest,
        cause: Cause,
        ebis: &[(u8, Cause)],
    ) -> Result<()> {
        let bearer_contexts = r
            .bearer_contexts
            .iter()
            .zip(ebis)
            .map(|(b, (ebi, cause))| BearerContextSetup {
                ebi: Ebi(*ebi),
                cause: *cause,
                s1u_sgw_fteid: b.s1u_sgw_fteid,
                s1u_enb_fteid: cause
                    .is_accepted()
                    .then(|| Self::enb_fteid(1, Ebi(*ebi))),
            })
            .collect();
        info!(self.logger, "CreateBearerResponse >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            build_s11::create_bearer_response(session, r, cause, bearer_contexts),
        )
        .await
    }

    pub async fn receive_delete_bearer_request(&self) -> Result<DeleteBearerRequest> {
        let envelope = self.receive().await?;
        let S11Message::DeleteBearerRequest(r) = envelope.message else {
            bail!("Expected DeleteBearerRequest, got {:?}", envelope.message)
        };
        info!(self.logger, "DeleteBearerRequest <<");
        Ok(r)
    }

    pub async fn send_delete_bearer_response(
        &self,
        session: &MmeSession,
        r: &DeleteBearerRequest,
        cause: Cause,
    ) -> Result<()> {
        info!(self.logger, "DeleteBearerResponse >>");
        self.send_s11(
            Some(session.imsi.imsi64),
            build_s11::delete_bearer_response(session, r, cause),
        )
        .await
    }

    /// Waits until the SGW has dealt with everything sent to it so far, by sending a request it
    /// cannot match and waiting for the rejection.
    pub async fn sync(&mut self) -> Result<()> {
        self.send_release_access_bearers_request(None, Teid(0xdead_beef))
            .await?;
        let r = self.receive_release_access_bearers_response().await?;
        ensure!(r.cause == Cause::ContextNotFound, "Unexpected cause {:?}", r.cause);
        Ok(())
    }
}
