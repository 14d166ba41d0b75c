pub mod data;
mod error;
pub mod procedures;
pub mod protocols;
mod sgwc;
pub mod stats;
pub mod userplane;

pub use data::{Config, load_config_file};
pub use error::SessionError;
pub use procedures::{HandlerApi, HandlerOutput, handle_message};
pub use sgwc::{PeerQueues, SgwC};
pub use stats::SessionCounters;
