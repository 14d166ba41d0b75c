use crate::protocols::ies::*;
use std::net::Ipv4Addr;

/// One EPS bearer of a PDN connection.
#[derive(Debug, Clone)]
pub struct BearerContext {
    pub ebi: Ebi,
    pub qos: BearerQos,
    pub tft: Tft,

    // Access side (S1-U).  Our endpoint, and the eNB's once the MME has told us it.
    pub sgw_s1u: Fteid,
    pub enb_s1u: Option<Fteid>,

    // Core side (S5/S8-U).  Our endpoint, and the PGW's once it has answered.
    pub sgw_s5s8_up: Fteid,
    pub pgw_s5s8_up: Option<Fteid>,

    // UE address, shared by all bearers of the PDN connection.
    pub paa: Option<Paa>,

    // Sequence number of the last network initiated procedure on this bearer.
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
}

impl BearerContext {
    pub fn new(ebi: Ebi, qos: BearerQos, tft: Tft, sgw_s1u: Fteid, sgw_s5s8_up: Fteid) -> Self {
        BearerContext {
            ebi,
            qos,
            tft,
            sgw_s1u,
            enb_s1u: None,
            sgw_s5s8_up,
            pgw_s5s8_up: None,
            paa: None,
            sequence_number: 0,
            pgw_cp_address: None,
        }
    }

    pub fn ue_ipv4(&self) -> Option<Ipv4Addr> {
        self.paa.as_ref().and_then(|paa| paa.ipv4)
    }

    /// The userplane tunnel through this bearer, if both peers are known.
    pub fn tunnel(&self) -> Option<UserplaneTunnel> {
        Some(UserplaneTunnel {
            ue_ipv4: self.ue_ipv4(),
            sgw_s1u_teid: self.sgw_s1u.teid,
            enb: self.enb_s1u?,
            sgw_s5s8_teid: self.sgw_s5s8_up.teid,
            pgw: self.pgw_s5s8_up?,
        })
    }

    /// Forget the access side, keeping everything on S5/S8.
    pub fn clear_access_side(&mut self) {
        self.enb_s1u = None;
    }
}

/// A dedicated bearer requested by the PGW and not yet confirmed by the MME.  It has no EBI until
/// the MME assigns one.
#[derive(Debug, Clone)]
pub struct PendingBearer {
    pub qos: BearerQos,
    pub tft: Tft,
    pub sgw_s1u: Fteid,
    pub sgw_s5s8_up: Fteid,
    pub pgw_s5s8_up: Fteid,
    pub paa: Option<Paa>,
}

impl PendingBearer {
    pub fn into_bearer(
        self,
        ebi: Ebi,
        enb_s1u: Option<Fteid>,
        sequence_number: u32,
        pgw_cp_address: Option<Ipv4Addr>,
    ) -> BearerContext {
        BearerContext {
            ebi,
            qos: self.qos,
            tft: self.tft,
            sgw_s1u: self.sgw_s1u,
            enb_s1u,
            sgw_s5s8_up: self.sgw_s5s8_up,
            pgw_s5s8_up: Some(self.pgw_s5s8_up),
            paa: self.paa,
            sequence_number,
            pgw_cp_address,
        }
    }
}

/// The forwarding state a bearer needs on the userplane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserplaneTunnel {
    pub ue_ipv4: Option<Ipv4Addr>,
    pub sgw_s1u_teid: Teid,
    pub enb: Fteid,
    pub sgw_s5s8_teid: Teid,
    pub pgw: Fteid,
}

impl std::fmt::Display for UserplaneTunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ue_ipv4 {
            Some(ue) => write!(f, "({ue}, "),
            None => write!(f, "(-, "),
        }?;
        write!(
            f,
            "{}<->{}, {}<->{})",
            self.enb, self.sgw_s1u_teid, self.sgw_s5s8_teid, self.pgw
        )
    }
}
