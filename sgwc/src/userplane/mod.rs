mod address_pool;
mod forwarding_table;

pub use address_pool::UeAddressPool;
pub use forwarding_table::ForwardingTable;
