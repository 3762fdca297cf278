mod file;

use std::io::Result;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::models::Router;
use crate::session::SessionTimers;

/// Parse a TOML config file and return a ServerConfig
pub fn from_file(path: &str) -> Result<ServerConfig> {
    let spec = file::ServerConfigSpec::from_file(path)?;
    Ok(ServerConfig::from_spec(spec))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: IpAddr,
    pub listen_port: u16,
    pub api_socket: SocketAddr,
    pub timers: SessionTimers,
    pub store_path: PathBuf,
    pub full_mesh_bandwidth: u32,
    pub routers: Vec<Router>,
}

impl ServerConfig {
    fn from_spec(spec: file::ServerConfigSpec) -> Self {
        Self {
            listen_address: spec.listen_address,
            listen_port: spec.listen_port,
            api_socket: spec.api_socket,
            timers: SessionTimers {
                keepalive: spec.keepalive,
                dead_timer: spec.dead_timer,
                write_timeout: spec.write_timeout,
            },
            store_path: spec.store_path,
            full_mesh_bandwidth: spec.full_mesh_bandwidth,
            routers: spec.routers,
        }
    }

    pub fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.listen_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: file::Defaults::listen_address(),
            listen_port: file::Defaults::listen_port(),
            api_socket: file::Defaults::api_socket(),
            timers: SessionTimers::default(),
            store_path: file::Defaults::store_path(),
            full_mesh_bandwidth: file::Defaults::full_mesh_bandwidth(),
            routers: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let config = from_file("./demos/config.toml").unwrap();
        assert_eq!(config.listen_socket(), "0.0.0.0:4189".parse().unwrap());
        assert_eq!(config.timers, SessionTimers::default());
        assert_eq!(config.store_path, PathBuf::from("/tmp/pced.sqlite3"));
        assert!(from_file("./demos/missing.toml").is_err());
    }
}
