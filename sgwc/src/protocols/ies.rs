//! ies - decoded GTPv2-C information elements used on S11 and S5/S8 (TS29.274, section 8)

use anyhow::{Result, ensure};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Tunnel endpoint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Teid(pub u32);

impl std::fmt::Display for Teid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

pub const MAX_EPS_BEARERS: usize = 15;

/// EPS bearer ID.  Values 1-15 identify a bearer; 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ebi(pub u8);

impl Ebi {
    pub fn is_valid(&self) -> bool {
        self.0 >= 1 && self.0 as usize <= MAX_EPS_BEARERS
    }

    // Position of this bearer in a PDN connection's bearer array.
    pub fn index(&self) -> Option<usize> {
        self.is_valid().then(|| self.0 as usize - 1)
    }
}

impl std::fmt::Display for Ebi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GTP sequence number of a request, echoed in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionId(pub u32);

/// Subscriber identity, held both as its digits and as the packed 64-bit form used for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Imsi {
    pub digits: String,
    pub imsi64: u64,
}

impl Imsi {
    pub fn from_digits(digits: &str) -> Result<Self> {
        ensure!(
            (5..=15).contains(&digits.len()),
            "IMSI {digits} must have 5-15 digits"
        );
        ensure!(
            digits.chars().all(|c| c.is_ascii_digit()),
            "IMSI {digits} contains a non digit"
        );
        let imsi64 = digits.parse::<u64>()?;
        Ok(Imsi {
            digits: digits.to_string(),
            imsi64,
        })
    }
}

impl std::fmt::Display for Imsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digits)
    }
}

/// Cause values, TS29.274 table 8.4-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    RequestAccepted = 16,
    RequestAcceptedPartially = 17,
    ContextNotFound = 64,
    InvalidMessageFormat = 65,
    MandatoryIeIncorrect = 69,
    MandatoryIeMissing = 70,
    SystemFailure = 72,
    NoResourcesAvailable = 73,
    UeNotResponding = 87,
    UeRefuses = 88,
    RequestRejected = 94,
    InvalidPeer = 109,
}

impl Cause {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Cause::RequestAccepted | Cause::RequestAcceptedPartially)
    }
}

/// F-TEID interface type, TS29.274 section 8.22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    S1uEnbGtpU = 0,
    S1uSgwGtpU = 1,
    S5S8SgwGtpU = 4,
    S5S8PgwGtpU = 5,
    S5S8SgwGtpC = 6,
    S5S8PgwGtpC = 7,
    S11MmeGtpC = 10,
    S11S4SgwGtpC = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fteid {
    pub interface_type: InterfaceType,
    pub teid: Teid,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl Fteid {
    pub fn ipv4(interface_type: InterfaceType, teid: Teid, addr: Ipv4Addr) -> Self {
        Fteid {
            interface_type,
            teid,
            ipv4: Some(addr),
            ipv6: None,
        }
    }

    pub fn has_address(&self) -> bool {
        self.ipv4.is_some() || self.ipv6.is_some()
    }

    // Two F-TEIDs lead to the same transport endpoint.
    pub fn same_address(&self, other: &Fteid) -> bool {
        self.ipv4 == other.ipv4 && self.ipv6 == other.ipv6
    }
}

impl std::fmt::Display for Fteid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.ipv4, self.ipv6) {
            (Some(v4), _) => write!(f, "{}-{}", v4, self.teid),
            (None, Some(v6)) => write!(f, "{}-{}", v6, self.teid),
            (None, None) => write!(f, "-{}", self.teid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatType {
    Utran = 1,
    Geran = 2,
    Wlan = 3,
    Gan = 4,
    HspaEvolution = 5,
    Eutran = 6,
    Virtual = 7,
    EutranNbIot = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdnType {
    Ipv4 = 1,
    Ipv6 = 2,
    Ipv4v6 = 3,
}

/// PDN address allocation - the UE's address(es) on the PDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paa {
    pub pdn_type: PdnType,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<(Ipv6Addr, u8)>,
}

impl Paa {
    pub fn ipv4(addr: Ipv4Addr) -> Self {
        Paa {
            pdn_type: PdnType::Ipv4,
            ipv4: Some(addr),
            ipv6: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arp {
    pub priority_level: u8,
    pub preemption_capability: bool,
    pub preemption_vulnerability: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BearerQos {
    pub qci: u8,
    pub arp: Arp,
    pub mbr_ul: u64,
    pub mbr_dl: u64,
    pub gbr_ul: u64,
    pub gbr_dl: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDirection {
    Downlink = 1,
    Uplink = 2,
    Bidirectional = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFilter {
    pub identifier: u8,
    pub direction: FilterDirection,
    pub precedence: u8,
    // Packet filter components in the textual form used by the policy layer,
    // e.g. "permit out ip from 10.0.0.0/8 to assigned".
    pub contents: String,
}

/// Traffic flow template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tft {
    pub packet_filters: Vec<PacketFilter>,
}
