use super::PdnConnection;
use crate::protocols::ies::*;

/// How a session is keyed.  A session is `Pending` under a temporary procedure ID from the MME's
/// create session request until the PGW's response designates its control TEID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Pending(u32),
    Established(Teid),
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Pending(id) => write!(f, "pending-{id:#x}"),
            SessionKey::Established(teid) => write!(f, "{teid}"),
        }
    }
}

/// Everything held about one PDN connection of one subscriber.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub key: SessionKey,
    pub imsi: Imsi,
    pub mme_s11: Option<Fteid>,
    // Transaction of the MME request currently being served.
    pub trxn: TransactionId,
    pub pdn: PdnConnection,
}

impl SessionRecord {
    pub fn new(key: SessionKey) -> Self {
        SessionRecord {
            key,
            imsi: Imsi::default(),
            mme_s11: None,
            trxn: TransactionId::default(),
            pdn: PdnConnection::default(),
        }
    }

    pub fn mme_s11_teid(&self) -> Teid {
        self.mme_s11.map(|fteid| fteid.teid).unwrap_or_default()
    }

    pub fn teid(&self) -> Option<Teid> {
        match self.key {
            SessionKey::Established(teid) => Some(teid),
            SessionKey::Pending(_) => None,
        }
    }
}
