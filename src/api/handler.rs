use std::io;
use std::net::SocketAddr;

use jsonrpsee::core::{Error as RpcError, RpcResult};
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use log::info;
use uuid::Uuid;

use super::rpc::{ApiServer, NetworkLsp, SessionSummary};
use super::sessions::session_to_summary;
use crate::handler::Server;
use crate::models::{Router, SrLsp};
use crate::topology::{LsPath, Path, TopologySnapshot};

fn rpc_error<E: ToString>(err: E) -> RpcError {
    RpcError::Custom(err.to_string())
}

#[async_trait::async_trait]
impl ApiServer for Server {
    async fn show_sessions(&self) -> RpcResult<Vec<SessionSummary>> {
        let mut output: Vec<SessionSummary> = vec![];
        for session in self.controller.sessions().await {
            let router = self.controller.router_for_session(session.addr()).await;
            output.push(session_to_summary(&session, router).await);
        }
        output.sort_by_key(|s| s.addr);
        Ok(output)
    }

    async fn show_network_lsps(&self) -> RpcResult<Vec<NetworkLsp>> {
        let mut lsps: Vec<NetworkLsp> = self
            .controller
            .network_lsps()
            .await
            .into_iter()
            .map(|(session, lsp)| NetworkLsp { session, lsp })
            .collect();
        lsps.sort_by(|a, b| (a.session, &a.lsp.name).cmp(&(b.session, &b.lsp.name)));
        Ok(lsps)
    }

    async fn show_controller_lsps(&self) -> RpcResult<Vec<SrLsp>> {
        Ok(self.controller.controller_lsps().await)
    }

    async fn show_routers(&self) -> RpcResult<Vec<Router>> {
        Ok(self.controller.routers().await)
    }

    async fn create_router(&self, router: Router) -> RpcResult<Router> {
        self.controller.create_router(router).await.map_err(rpc_error)
    }

    async fn update_router(&self, router: Router) -> RpcResult<Router> {
        self.controller.update_router(router).await.map_err(rpc_error)
    }

    async fn delete_router(&self, id: Uuid) -> RpcResult<()> {
        self.controller.delete_router(&id).await.map_err(rpc_error)
    }

    async fn create_lsp(&self, lsp: SrLsp) -> RpcResult<SrLsp> {
        self.controller
            .create_lsp(lsp.clone())
            .await
            .map_err(rpc_error)?;
        Ok(lsp)
    }

    async fn update_lsp(&self, lsp: SrLsp) -> RpcResult<SrLsp> {
        self.controller
            .update_lsp(lsp.clone())
            .await
            .map_err(rpc_error)?;
        Ok(lsp)
    }

    async fn delete_lsp(&self, name: String) -> RpcResult<()> {
        self.controller.delete_lsp(&name).await.map_err(rpc_error)
    }

    async fn show_topology(&self) -> RpcResult<TopologySnapshot> {
        Ok(self.controller.topology().snapshot().await)
    }

    async fn show_paths(&self) -> RpcResult<Vec<Path>> {
        Ok(self.controller.topology().paths().await)
    }

    async fn learn_ls_paths(&self, paths: Vec<LsPath>) -> RpcResult<usize> {
        self.controller
            .learn_ls_paths(&paths)
            .await
            .map_err(rpc_error)
    }
}

impl Server {
    /// Start the JSON-RPC API and return the bound address, the server runs
    /// until the returned handle is stopped
    pub async fn serve_rpc_api(
        &self,
        socket: SocketAddr,
    ) -> io::Result<(SocketAddr, ServerHandle)> {
        let server = self.clone();
        let rpc = ServerBuilder::default()
            .build(socket)
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        let local_addr = rpc
            .local_addr()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        info!("Starting JSON-RPC server on {}...", local_addr);
        let handle = rpc
            .start(server.into_rpc())
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        Ok((local_addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};

    use super::*;
    use crate::api::rpc::ApiClient;
    use crate::controller::tests::{controller, line_topology, router};

    async fn api() -> (Server, ServerHandle, HttpClient) {
        let server = Server::new(controller().await);
        let (addr, handle) = server
            .serve_rpc_api("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let client = HttpClientBuilder::default()
            .build(format!("http://{}", addr))
            .unwrap();
        (server, handle, client)
    }

    #[tokio::test]
    async fn test_router_calls() {
        let (_server, handle, client) = api().await;
        let r1 = client.create_router(router("r1", 1, true)).await.unwrap();
        assert!(r1.id.is_some());
        assert_eq!(client.show_routers().await.unwrap(), vec![r1.clone()]);

        // Missing ID on update is reported back as an error
        assert!(client.update_router(router("r1", 1, true)).await.is_err());

        client.delete_router(r1.id.unwrap()).await.unwrap();
        assert!(client.show_routers().await.unwrap().is_empty());
        assert!(client.delete_router(r1.id.unwrap()).await.is_err());
        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_lsp_calls() {
        let (_server, handle, client) = api().await;
        let lsp: SrLsp = serde_json::from_str(
            r#"{"name": "LSP-A", "src": "1.1.1.1", "dst": "3.3.3.3", "delegate": true, "admin": true}"#,
        )
        .unwrap();
        assert_eq!(client.create_lsp(lsp.clone()).await.unwrap(), lsp);
        assert!(client.create_lsp(lsp.clone()).await.is_err());
        assert_eq!(client.show_controller_lsps().await.unwrap(), vec![lsp]);
        assert!(client.show_network_lsps().await.unwrap().is_empty());
        client.delete_lsp("LSP-A".to_string()).await.unwrap();
        assert!(client.show_controller_lsps().await.unwrap().is_empty());
        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_topology_calls() {
        let (server, handle, client) = api().await;
        let learned = client.learn_ls_paths(line_topology()).await.unwrap();
        assert_eq!(learned, line_topology().len());
        let topology = client.show_topology().await.unwrap();
        assert_eq!(topology.nodes.len(), 3);
        assert_eq!(topology.links.len(), 4);
        assert_eq!(topology.prefixes.len(), 3);

        server.controller().topology().compute_paths().await;
        let paths = client.show_paths().await.unwrap();
        assert!(paths
            .iter()
            .any(|p| p.src == "0000.0000.0001" && p.dst == "0000.0000.0003"));
        assert!(client.show_sessions().await.unwrap().is_empty());
        handle.stop().unwrap();
    }
}
