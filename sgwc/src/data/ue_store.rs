use crate::protocols::ies::{Imsi, Teid};
use std::collections::{BTreeSet, HashMap};

/// The control TEIDs of one subscriber - one per PDN connection.
#[derive(Debug, Clone, Default)]
pub struct UeAggregate {
    pub imsi: Imsi,
    pub teids: BTreeSet<Teid>,
}

/// Secondary index from subscriber to the sessions it owns.  It only refers to sessions by TEID.
#[derive(Default)]
pub struct UeContextStore(HashMap<u64, UeAggregate>);

impl UeContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, imsi: &Imsi) -> &mut UeAggregate {
        self.0.entry(imsi.imsi64).or_insert_with(|| UeAggregate {
            imsi: imsi.clone(),
            teids: BTreeSet::new(),
        })
    }

    pub fn get(&self, imsi64: u64) -> Option<&UeAggregate> {
        self.0.get(&imsi64)
    }

    pub fn add_teid(&mut self, imsi: &Imsi, teid: Teid) {
        self.get_or_create(imsi).teids.insert(teid);
    }

    /// Removes a TEID, and the subscriber too once it owns no more.
    pub fn remove_teid(&mut self, imsi64: u64, teid: Teid) {
        let Some(ue) = self.0.get_mut(&imsi64) else {
            return;
        };
        ue.teids.remove(&teid);
        if ue.teids.is_empty() {
            self.0.remove(&imsi64);
        }
    }

    pub fn teids(&self, imsi64: u64) -> Vec<Teid> {
        self.0
            .get(&imsi64)
            .map(|ue| ue.teids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}
