use super::{BearerContext, PendingBearer};
use crate::SessionError;
use crate::protocols::ies::*;
use std::net::Ipv4Addr;

// Stands in for the APN when the MME did not supply one.
pub const NO_APN: &str = "NO APN";

/// A create-bearer procedure started by the PGW, waiting for the MME to confirm its bearers.
#[derive(Debug, Clone)]
pub struct CreateBearerProcedure {
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    pub pending: Vec<PendingBearer>,
}

/// A delete-bearer procedure started by the PGW, waiting for the MME's response.
#[derive(Debug, Clone)]
pub struct DeleteBearerProcedure {
    pub sequence_number: u32,
    pub pgw_cp_address: Option<Ipv4Addr>,
    // Bearers the MME was asked to delete.
    pub ebis: Vec<Ebi>,
    // Bearers the PGW named that we do not have.
    pub rejected: Vec<Ebi>,
    pub delete_default_bearer: bool,
}

#[derive(Debug, Clone)]
pub enum NetworkProcedure {
    CreateBearer(CreateBearerProcedure),
    DeleteBearer(DeleteBearerProcedure),
}

/// One subscriber's connection to one APN.
///
/// Bearers live in a fixed array indexed by EBI.  While the connection exists, the slot of
/// `default_bearer` is populated.  Outstanding network initiated procedures are kept in arrival
/// order, and a procedure is dropped as soon as it has nothing left outstanding.
#[derive(Debug, Clone, Default)]
pub struct PdnConnection {
    pub apn_in_use: String,
    pub default_bearer: Ebi,
    pub sgw_s5s8_cp_teid: Teid,
    pub pgw_s5s8_cp: Option<Fteid>,

    // UE address taken from the local pool, returned when the connection goes.
    pub allocated_ue_ipv4: Option<Ipv4Addr>,

    // UE address with a paging rule installed while the access side is released.
    pub paging_rule: Option<Ipv4Addr>,

    bearers: [Option<BearerContext>; MAX_EPS_BEARERS],
    procedures: Vec<NetworkProcedure>,
}

impl PdnConnection {
    pub fn set_apn(&mut self, apn: &str) {
        self.apn_in_use = if apn.is_empty() {
            NO_APN.to_string()
        } else {
            apn.to_string()
        };
    }

    pub fn pgw_s5s8_cp_teid(&self) -> Teid {
        self.pgw_s5s8_cp.map(|fteid| fteid.teid).unwrap_or_default()
    }

    pub fn bearer(&self, ebi: Ebi) -> Option<&BearerContext> {
        self.bearers.get(ebi.index()?)?.as_ref()
    }

    pub fn bearer_mut(&mut self, ebi: Ebi) -> Option<&mut BearerContext> {
        self.bearers.get_mut(ebi.index()?)?.as_mut()
    }

    pub fn default_bearer_context(&self) -> Result<&BearerContext, SessionError> {
        self.bearer(self.default_bearer).ok_or_else(|| {
            SessionError::InvariantViolation(format!(
                "default bearer {} missing from PDN connection to {}",
                self.default_bearer, self.apn_in_use
            ))
        })
    }

    pub fn insert_bearer(&mut self, bearer: BearerContext) -> Result<(), SessionError> {
        let Some(idx) = bearer.ebi.index() else {
            return Err(SessionError::InvariantViolation(format!(
                "bearer ID {} out of range",
                bearer.ebi
            )));
        };
        if self.bearers[idx].is_some() {
            return Err(SessionError::InvariantViolation(format!(
                "bearer {} already in use",
                bearer.ebi
            )));
        }
        self.bearers[idx] = Some(bearer);
        Ok(())
    }

    /// Removes a dedicated bearer.  The default bearer only goes with the whole connection, so
    /// asking for it returns None.
    pub fn remove_dedicated_bearer(&mut self, ebi: Ebi) -> Option<BearerContext> {
        if ebi == self.default_bearer {
            return None;
        }
        self.bearers.get_mut(ebi.index()?)?.take()
    }

    pub fn bearers(&self) -> impl Iterator<Item = &BearerContext> {
        self.bearers.iter().flatten()
    }

    pub fn bearers_mut(&mut self) -> impl Iterator<Item = &mut BearerContext> {
        self.bearers.iter_mut().flatten()
    }

    pub fn take_bearers(&mut self) -> Vec<BearerContext> {
        self.bearers.iter_mut().filter_map(Option::take).collect()
    }

    pub fn ue_ipv4(&self) -> Option<Ipv4Addr> {
        self.bearer(self.default_bearer)
            .and_then(BearerContext::ue_ipv4)
    }

    pub fn procedures(&self) -> &[NetworkProcedure] {
        &self.procedures
    }

    pub fn pending_bearers(&self) -> impl Iterator<Item = &PendingBearer> {
        self.procedures.iter().flat_map(|p| match p {
            NetworkProcedure::CreateBearer(c) => c.pending.as_slice(),
            NetworkProcedure::DeleteBearer(_) => &[],
        })
    }

    /// Records a bearer waiting for MME confirmation under the create-bearer procedure with this
    /// sequence number, starting the procedure if it is new.
    pub fn add_pending_bearer(
        &mut self,
        sequence_number: u32,
        pgw_cp_address: Option<Ipv4Addr>,
        bearer: PendingBearer,
    ) {
        for procedure in self.procedures.iter_mut() {
            if let NetworkProcedure::CreateBearer(c) = procedure {
                if c.sequence_number == sequence_number {
                    c.pending.push(bearer);
                    return;
                }
            }
        }
        self.procedures
            .push(NetworkProcedure::CreateBearer(CreateBearerProcedure {
                sequence_number,
                pgw_cp_address,
                pending: vec![bearer],
            }));
    }

    /// Takes the pending bearer whose S1-U TEID matches, returning it with the sequence number and
    /// PGW address of its procedure.  Procedures are searched in arrival order and the first match
    /// wins.
    pub fn take_pending_bearer(
        &mut self,
        sgw_s1u_teid: Teid,
    ) -> Option<(u32, Option<Ipv4Addr>, PendingBearer)> {
        let (procedure_idx, bearer_idx) =
            self.procedures
                .iter()
                .enumerate()
                .find_map(|(procedure_idx, p)| match p {
                    NetworkProcedure::CreateBearer(c) => c
                        .pending
                        .iter()
                        .position(|b| b.sgw_s1u.teid == sgw_s1u_teid)
                        .map(|bearer_idx| (procedure_idx, bearer_idx)),
                    NetworkProcedure::DeleteBearer(_) => None,
                })?;
        let NetworkProcedure::CreateBearer(c) = &mut self.procedures[procedure_idx] else {
            return None;
        };
        let bearer = c.pending.remove(bearer_idx);
        let taken = (c.sequence_number, c.pgw_cp_address, bearer);
        if c.pending.is_empty() {
            self.procedures.remove(procedure_idx);
        }
        Some(taken)
    }

    pub fn add_delete_bearer_procedure(&mut self, procedure: DeleteBearerProcedure) {
        self.procedures
            .push(NetworkProcedure::DeleteBearer(procedure));
    }

    /// Takes the first delete-bearer procedure, in arrival order, that covers any of these bearers.
    ///  With no bearers given, the first delete-bearer procedure is taken.
    pub fn take_delete_bearer_procedure(&mut self, ebis: &[Ebi]) -> Option<DeleteBearerProcedure> {
        let idx = self.procedures.iter().position(|p| match p {
            NetworkProcedure::DeleteBearer(d) => {
                ebis.is_empty() || d.ebis.iter().any(|ebi| ebis.contains(ebi))
            }
            NetworkProcedure::CreateBearer(_) => false,
        })?;
        match self.procedures.remove(idx) {
            NetworkProcedure::DeleteBearer(d) => Some(d),
            NetworkProcedure::CreateBearer(_) => None,
        }
    }
}
