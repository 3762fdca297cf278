use std::net::IpAddr;

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Router, SrLsp};
use crate::session::LspReport;
use crate::topology::{LsPath, Path, TopologySnapshot};

#[rpc(client, server)]
pub trait Api {
    #[method(name = "show_sessions")]
    async fn show_sessions(&self) -> RpcResult<Vec<SessionSummary>>;
    /// LSPs as the routers report them
    #[method(name = "show_network_lsps")]
    async fn show_network_lsps(&self) -> RpcResult<Vec<NetworkLsp>>;
    /// LSPs the controller intends to exist
    #[method(name = "show_controller_lsps")]
    async fn show_controller_lsps(&self) -> RpcResult<Vec<SrLsp>>;
    #[method(name = "show_routers")]
    async fn show_routers(&self) -> RpcResult<Vec<Router>>;
    #[method(name = "create_router")]
    async fn create_router(&self, router: Router) -> RpcResult<Router>;
    #[method(name = "update_router")]
    async fn update_router(&self, router: Router) -> RpcResult<Router>;
    #[method(name = "delete_router")]
    async fn delete_router(&self, id: Uuid) -> RpcResult<()>;
    #[method(name = "create_lsp")]
    async fn create_lsp(&self, lsp: SrLsp) -> RpcResult<SrLsp>;
    #[method(name = "update_lsp")]
    async fn update_lsp(&self, lsp: SrLsp) -> RpcResult<SrLsp>;
    #[method(name = "delete_lsp")]
    async fn delete_lsp(&self, name: String) -> RpcResult<()>;
    #[method(name = "show_topology")]
    async fn show_topology(&self) -> RpcResult<TopologySnapshot>;
    /// Every path from the last computation
    #[method(name = "show_paths")]
    async fn show_paths(&self) -> RpcResult<Vec<Path>>;
    /// Feed BGP-LS paths learned elsewhere into the topology
    #[method(name = "learn_ls_paths")]
    async fn learn_ls_paths(&self, paths: Vec<LsPath>) -> RpcResult<usize>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSummary {
    pub addr: IpAddr,
    /// Name of the router owning this session
    pub router: Option<String>,
    pub state: String,
    pub connect_time: i64,
    pub uptime: String,
    pub msg_received: u64,
    pub msg_sent: u64,
    pub last_received: Option<String>,
    pub last_sent: Option<String>,
    // Peer OPEN values, once received
    pub keepalive: Option<u8>,
    pub dead_timer: Option<u8>,
    pub lsps: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkLsp {
    /// Session the report came in on
    pub session: IpAddr,
    pub lsp: LspReport,
}
