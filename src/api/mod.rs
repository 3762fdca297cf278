mod handler;
pub mod rpc;
mod sessions;

pub use rpc::{ApiClient, ApiServer, NetworkLsp, SessionSummary};
