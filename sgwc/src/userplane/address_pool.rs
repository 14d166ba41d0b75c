use anyhow::{Result, anyhow, ensure};
use dashmap::DashMap;
use index_pool::IndexPool;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

// Host numbers 1-254 of the /24.
const MAX_UE_ADDRESSES: usize = 255;

/// Pool of UE IPv4 addresses in a /24 subnet.
#[derive(Clone)]
pub struct UeAddressPool {
    index_pool: Arc<Mutex<IndexPool>>,
    owners: Arc<DashMap<Ipv4Addr, (u64, String)>>,
    ue_subnet: Ipv4Addr,
}

impl UeAddressPool {
    pub fn new(ue_subnet: Ipv4Addr) -> Self {
        let mut index_pool = IndexPool::new();
        // Take the 0 slot, so that the first UE gets an IP address ending in .1.
        let _ = index_pool.request_id(0);
        UeAddressPool {
            index_pool: Arc::new(Mutex::new(index_pool)),
            owners: Arc::new(DashMap::new()),
            ue_subnet,
        }
    }

    pub fn allocate(&self, imsi64: u64, apn: &str) -> Result<Ipv4Addr> {
        let mut pool = self
            .index_pool
            .lock()
            .map_err(|_| anyhow!("Address pool lock poisoned"))?;
        let idx = pool.new_id();
        if idx >= MAX_UE_ADDRESSES {
            let _ = pool.return_id(idx);
            return Err(anyhow!("No UE addresses left in {}/24", self.ue_subnet));
        }
        let mut octets = self.ue_subnet.octets();
        octets[3] = idx as u8;
        let addr = Ipv4Addr::from(octets);
        self.owners.insert(addr, (imsi64, apn.to_string()));
        Ok(addr)
    }

    /// Marks an address that a restored session already holds as taken.
    /// Addresses outside the UE subnet were assigned by the PGW and are ignored.
    pub fn reserve(&self, imsi64: u64, apn: &str, addr: Ipv4Addr) -> Result<bool> {
        let subnet = self.ue_subnet.octets();
        let octets = addr.octets();
        if octets[0..3] != subnet[0..3] {
            return Ok(false);
        }
        let idx = octets[3] as usize;
        ensure!(idx != 0 && idx < MAX_UE_ADDRESSES, "{addr} is not a UE address");
        self.index_pool
            .lock()
            .map_err(|_| anyhow!("Address pool lock poisoned"))?
            .request_id(idx)
            .map_err(|_| anyhow!("{addr} is already allocated"))?;
        self.owners.insert(addr, (imsi64, apn.to_string()));
        Ok(true)
    }

    pub fn release(&self, imsi64: u64, apn: &str, addr: Ipv4Addr) -> Result<()> {
        let subnet = self.ue_subnet.octets();
        let octets = addr.octets();
        ensure!(
            octets[0..3] == subnet[0..3],
            "{addr} is not in UE subnet {}/24",
            self.ue_subnet
        );
        let Some((owner, owner_apn)) = self.owners.get(&addr).map(|e| e.value().clone()) else {
            return Err(anyhow!("{addr} is not allocated"));
        };
        ensure!(
            owner == imsi64 && owner_apn == apn,
            "{addr} belongs to {owner}/{owner_apn}, not {imsi64}/{apn}"
        );
        self.owners.remove(&addr);
        self.index_pool
            .lock()
            .map_err(|_| anyhow!("Address pool lock poisoned"))?
            .return_id(octets[3] as usize)
            .map_err(|_| anyhow!("{addr} returned twice"))?;
        Ok(())
    }

    pub fn num_allocated(&self) -> usize {
        self.owners.len()
    }
}
