use crate::data::UserplaneTunnel;
use crate::protocols::ies::{Fteid, Teid};
use anyhow::{Result, bail, ensure};
use atomic_counter::{AtomicCounter, RelaxedCounter};
use dashmap::{DashMap, DashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// The forwarding rules programmed into the userplane: one tunnel per bearer, keyed by its S1-U
/// TEID, and paging rules for idle UEs.
#[derive(Clone, Default)]
pub struct ForwardingTable {
    tunnels: Arc<DashMap<Teid, UserplaneTunnel>>,
    paging_rules: Arc<DashSet<Ipv4Addr>>,
    end_markers: Arc<RelaxedCounter>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces the tunnel for the bearer with this S1-U TEID.
    pub fn add_tunnel(&self, tunnel: &UserplaneTunnel) -> Result<()> {
        ensure!(
            tunnel.enb.has_address() && tunnel.pgw.has_address(),
            "Tunnel {tunnel} has no transport address"
        );
        self.tunnels.insert(tunnel.sgw_s1u_teid, tunnel.clone());
        Ok(())
    }

    pub fn remove_tunnel(&self, sgw_s1u_teid: Teid, sgw_s5s8_teid: Teid) -> Result<()> {
        let Some((_, tunnel)) = self.tunnels.remove(&sgw_s1u_teid) else {
            bail!("No tunnel with S1-U TEID {sgw_s1u_teid}");
        };
        ensure!(
            tunnel.sgw_s5s8_teid == sgw_s5s8_teid,
            "Tunnel {tunnel} removed, but expected S5/S8 TEID {sgw_s5s8_teid}"
        );
        Ok(())
    }

    pub fn send_end_marker(&self, enb: &Fteid) -> Result<()> {
        ensure!(enb.has_address(), "No address to send end marker to");
        self.end_markers.inc();
        Ok(())
    }

    pub fn add_paging_rule(&self, ue_ipv4: Ipv4Addr) -> Result<()> {
        ensure!(
            self.paging_rules.insert(ue_ipv4),
            "Paging rule for {ue_ipv4} already present"
        );
        Ok(())
    }

    pub fn remove_paging_rule(&self, ue_ipv4: Ipv4Addr) -> Result<()> {
        ensure!(
            self.paging_rules.remove(&ue_ipv4).is_some(),
            "No paging rule for {ue_ipv4}"
        );
        Ok(())
    }

    pub fn tunnel(&self, sgw_s1u_teid: Teid) -> Option<UserplaneTunnel> {
        self.tunnels.get(&sgw_s1u_teid).map(|t| t.clone())
    }

    pub fn num_tunnels(&self) -> usize {
        self.tunnels.len()
    }

    pub fn has_paging_rule(&self, ue_ipv4: Ipv4Addr) -> bool {
        self.paging_rules.contains(&ue_ipv4)
    }

    pub fn num_end_markers(&self) -> usize {
        self.end_markers.get()
    }
}
