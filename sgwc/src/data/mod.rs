mod bearer_context;
mod config;
mod directory;
mod pdn_connection;
mod persistence;
mod session_record;
mod session_store;
mod state;
mod teid;
mod ue_store;

pub use bearer_context::*;
pub use config::*;
pub use directory::*;
pub use pdn_connection::*;
pub use persistence::*;
pub use session_record::*;
pub use session_store::*;
pub use state::*;
pub use teid::*;
pub use ue_store::*;
