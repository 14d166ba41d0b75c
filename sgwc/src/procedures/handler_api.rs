use crate::data::UserplaneTunnel;
use crate::protocols::ies::{Fteid, Imsi, Teid};
use crate::{Config, SessionCounters};
use anyhow::Result;
use slog::Logger;
use std::net::Ipv4Addr;

/// Trait representing the collection of services needed by SGW handlers.
///
/// Userplane programming, address allocation and the directory are best effort - handlers log a
/// failure and carry on with the protocol.
pub trait HandlerApi: Send + Sync + Clone + 'static {
    fn config(&self) -> &Config;
    fn counters(&self) -> &SessionCounters;

    fn add_tunnel(&self, tunnel: &UserplaneTunnel, logger: &Logger) -> Result<()>;
    fn remove_tunnel(
        &self,
        sgw_s1u_teid: Teid,
        sgw_s5s8_teid: Teid,
        logger: &Logger,
    ) -> Result<()>;
    fn send_end_marker(&self, enb: &Fteid, logger: &Logger) -> Result<()>;
    fn add_paging_rule(&self, ue_ipv4: Ipv4Addr, logger: &Logger) -> Result<()>;
    fn remove_paging_rule(&self, ue_ipv4: Ipv4Addr, logger: &Logger) -> Result<()>;

    fn allocate_ue_address(&self, imsi: &Imsi, apn: &str, logger: &Logger) -> Result<Ipv4Addr>;
    fn release_ue_address(
        &self,
        imsi: &Imsi,
        apn: &str,
        addr: Ipv4Addr,
        logger: &Logger,
    ) -> Result<()>;

    fn update_directory_field(&self, imsi: &Imsi, field: &str, value: String);
}
