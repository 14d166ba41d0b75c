use dashmap::DashMap;
use std::sync::Arc;

// Field holding a subscriber's control plane TEIDs.
pub const SGW_C_TEID_FIELD: &str = "sgw_c_teid";

// Field holding the core side user plane TEIDs of all the subscriber's bearers.
pub const SGW_U_TEID_FIELD: &str = "sgw_u_teid";

/// Subscriber directory - per subscriber fields published for observability.
#[derive(Clone, Default)]
pub struct Directory(Arc<DashMap<(u64, String), String>>);

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_field(&self, imsi64: u64, field: &str, value: String) {
        self.0.insert((imsi64, field.to_string()), value);
    }

    pub fn field(&self, imsi64: u64, field: &str) -> Option<String> {
        self.0
            .get(&(imsi64, field.to_string()))
            .map(|v| v.clone())
    }
}

/// Comma separated decimal list, the form in which TEIDs are published.
pub fn join_teids(teids: impl IntoIterator<Item = u32>) -> String {
    teids
        .into_iter()
        .map(|teid| teid.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
