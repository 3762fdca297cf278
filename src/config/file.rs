use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::models::Router;

pub(super) struct Defaults {}

impl Defaults {
    pub(super) fn listen_address() -> IpAddr {
        IpAddr::from(Ipv4Addr::UNSPECIFIED)
    }

    // IANA assigned PCEP port
    pub(super) fn listen_port() -> u16 {
        4189
    }

    pub(super) fn api_socket() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
    }

    pub(super) fn keepalive() -> u8 {
        30
    }

    pub(super) fn dead_timer() -> u8 {
        120
    }

    pub(super) fn write_timeout() -> u8 {
        10
    }

    pub(super) fn store_path() -> PathBuf {
        PathBuf::from("pced.sqlite3")
    }

    pub(super) fn full_mesh_bandwidth() -> u32 {
        100
    }
}

/// Config (toml) representation of the controller
#[derive(Debug, Deserialize)]
pub(super) struct ServerConfigSpec {
    // Where PCCs connect to
    #[serde(default = "Defaults::listen_address")]
    pub(super) listen_address: IpAddr,
    #[serde(default = "Defaults::listen_port")]
    pub(super) listen_port: u16,

    // JSON-RPC management API
    #[serde(default = "Defaults::api_socket")]
    pub(super) api_socket: SocketAddr,

    // Advertised in our OPEN, keepalives are sent at this interval
    #[serde(default = "Defaults::keepalive")]
    pub(super) keepalive: u8,
    // Used when the peer OPEN carries a zero dead timer
    #[serde(default = "Defaults::dead_timer")]
    pub(super) dead_timer: u8,
    // A peer that blocks a write this long has its session closed
    #[serde(default = "Defaults::write_timeout")]
    pub(super) write_timeout: u8,

    // Routers and LSPs created through the API live here
    #[serde(default = "Defaults::store_path")]
    pub(super) store_path: PathBuf,

    // Bandwidth requested by full mesh LSPs
    #[serde(default = "Defaults::full_mesh_bandwidth")]
    pub(super) full_mesh_bandwidth: u32,

    // Routers registered at startup in addition to stored ones
    #[serde(default = "Vec::new")]
    pub(super) routers: Vec<Router>,
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_str(&contents)
    }

    pub(super) fn from_str(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
