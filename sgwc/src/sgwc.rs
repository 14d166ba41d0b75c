use crate::data::{Directory, SgwState, StateStore, UserplaneTunnel};
use crate::procedures::SessionMessageHandler;
use crate::protocols::ies::{Fteid, Imsi, Teid};
use crate::protocols::s8::S8Message;
use crate::protocols::s11::S11Message;
use crate::protocols::{Envelope, Inbound};
use crate::stats::{SessionCounters, dump_stats};
use crate::userplane::{ForwardingTable, UeAddressPool};
use crate::{Config, HandlerApi};
use anyhow::Result;
use async_channel::{Receiver, Sender};
use async_std::sync::Mutex;
use async_std::task::JoinHandle;
use slog::{Logger, debug, info, o, warn};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// The queues on which the gateway emits messages to its two peers.
pub struct PeerQueues {
    pub to_mme: Receiver<Envelope<S11Message>>,
    pub to_pgw: Receiver<Envelope<S8Message>>,
}

#[derive(Clone)]
pub struct SgwC {
    config: Config,
    logger: Logger,
    forwarding_table: ForwardingTable,
    address_pool: UeAddressPool,
    directory: Directory,
    counters: Arc<SessionCounters>,
    inbound: Sender<Inbound>,
    control_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SgwC {
    pub async fn start(
        config: Config,
        store: Option<Arc<dyn StateStore>>,
        logger: Logger,
    ) -> Result<(Self, PeerQueues)> {
        let store = store.filter(|_| config.persist_state);
        let state = SgwState::init(store.as_deref(), &logger).await;
        info!(
            &logger,
            "S11 on {}, S5/S8 on {}, S1-U on {}, UE subnet {}",
            config.s11_ip,
            config.s5s8_ip,
            config.s1u_ip,
            config.ue_subnet
        );

        let (inbound, receiver) = async_channel::unbounded();
        let (to_mme_sender, to_mme) = async_channel::unbounded();
        let (to_pgw_sender, to_pgw) = async_channel::unbounded();
        let sgwc = SgwC {
            address_pool: UeAddressPool::new(config.ue_subnet),
            config,
            forwarding_table: ForwardingTable::new(),
            directory: Directory::new(),
            counters: Arc::new(SessionCounters::default()),
            inbound,
            control_task: Arc::new(Mutex::new(None)),
            logger,
        };
        sgwc.reinstall_userplane(&state);

        let handle = SessionMessageHandler::spawn(
            receiver,
            sgwc.clone(),
            state,
            to_mme_sender,
            to_pgw_sender,
            store,
            sgwc.logger.new(o!("task" => "control")),
        );
        *sgwc.control_task.lock().await = Some(handle);

        if sgwc.config.stats_interval_secs > 0 {
            async_std::task::spawn(dump_stats(
                sgwc.logger.new(o!("task" => "stats")),
                sgwc.counters.clone(),
                Duration::from_secs(sgwc.config.stats_interval_secs),
            ));
        }

        Ok((sgwc, PeerQueues { to_mme, to_pgw }))
    }

    // Brings the address pool and forwarding table back in line with restored sessions.
    fn reinstall_userplane(&self, state: &SgwState) {
        let logger = &self.logger;
        for record in state.sessions.records() {
            let pdn = &record.pdn;
            if let Some(addr) = pdn.allocated_ue_ipv4 {
                let imsi64 = record.imsi.imsi64;
                if let Err(e) = self.address_pool.reserve(imsi64, &pdn.apn_in_use, addr) {
                    warn!(logger, "Failed to reserve restored UE address {addr}: {e}");
                }
            }
            if let Some(ue_ipv4) = pdn.paging_rule {
                if let Err(e) = self.forwarding_table.add_paging_rule(ue_ipv4) {
                    warn!(logger, "Failed to reinstall paging rule for {ue_ipv4}: {e}");
                }
            }
            for tunnel in pdn.bearers().filter_map(|b| b.tunnel()) {
                if let Err(e) = self.forwarding_table.add_tunnel(&tunnel) {
                    warn!(logger, "Failed to reinstall tunnel {tunnel}: {e}");
                }
            }
        }
        debug!(
            logger,
            "Userplane restored with {} tunnels and {} pool addresses",
            self.forwarding_table.num_tunnels(),
            self.address_pool.num_allocated()
        );
    }

    /// Queues a decoded message from either peer for the control task.
    pub async fn dispatch(&self, inbound: Inbound) -> Result<()> {
        self.inbound.send(inbound).await?;
        Ok(())
    }

    /// Stops taking messages, and waits for the control task to finish those already queued.
    pub async fn graceful_shutdown(self) {
        info!(&self.logger, "Shutting down");
        self.inbound.close();
        if let Some(h) = self.control_task.lock().await.take() {
            h.await;
        }
    }

    pub fn forwarding_table(&self) -> &ForwardingTable {
        &self.forwarding_table
    }

    pub fn address_pool(&self) -> &UeAddressPool {
        &self.address_pool
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }
}

impl HandlerApi for SgwC {
    fn config(&self) -> &Config {
        &self.config
    }

    fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    fn add_tunnel(&self, tunnel: &UserplaneTunnel, logger: &Logger) -> Result<()> {
        debug!(logger, "Add tunnel {tunnel}");
        self.forwarding_table.add_tunnel(tunnel)
    }

    fn remove_tunnel(
        &self,
        sgw_s1u_teid: Teid,
        sgw_s5s8_teid: Teid,
        logger: &Logger,
    ) -> Result<()> {
        debug!(logger, "Remove tunnel {sgw_s1u_teid}/{sgw_s5s8_teid}");
        self.forwarding_table.remove_tunnel(sgw_s1u_teid, sgw_s5s8_teid)
    }

    fn send_end_marker(&self, enb: &Fteid, logger: &Logger) -> Result<()> {
        debug!(logger, "End marker to {enb}");
        self.forwarding_table.send_end_marker(enb)
    }

    fn add_paging_rule(&self, ue_ipv4: Ipv4Addr, logger: &Logger) -> Result<()> {
        debug!(logger, "Page on downlink to {ue_ipv4}");
        self.forwarding_table.add_paging_rule(ue_ipv4)
    }

    fn remove_paging_rule(&self, ue_ipv4: Ipv4Addr, logger: &Logger) -> Result<()> {
        debug!(logger, "Stop paging for {ue_ipv4}");
        self.forwarding_table.remove_paging_rule(ue_ipv4)
    }

    fn allocate_ue_address(&self, imsi: &Imsi, apn: &str, logger: &Logger) -> Result<Ipv4Addr> {
        let addr = self.address_pool.allocate(imsi.imsi64, apn)?;
        info!(logger, "Allocated UE address {addr} on {apn}");
        Ok(addr)
    }

    fn release_ue_address(
        &self,
        imsi: &Imsi,
        apn: &str,
        addr: Ipv4Addr,
        logger: &Logger,
    ) -> Result<()> {
        self.address_pool.release(imsi.imsi64, apn, addr)?;
        info!(logger, "Released UE address {addr}");
        Ok(())
    }

    fn update_directory_field(&self, imsi: &Imsi, field: &str, value: String) {
        self.directory.update_field(imsi.imsi64, field, value)
    }
}
