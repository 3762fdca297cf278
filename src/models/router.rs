use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// BGP-LS peering details for a router that feeds topology
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BgpLsPeer {
    pub neighbor_address: IpAddr,
    pub peer_as: u32,
    #[serde(default)]
    pub ebgp_multihop_enabled: bool,
    #[serde(default)]
    pub ebgp_multihop_ttl: u8,
}

/// Operator provided router record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Router {
    /// Assigned on create
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub mgmt_ip: IpAddr,
    /// IGP router ID as seen in BGP-LS, used as the topology key
    pub iso_addr: String,
    pub loopback: Ipv4Addr,
    #[serde(default)]
    pub bgpls_peer: Option<BgpLsPeer>,
    #[serde(default)]
    pub full_mesh: bool,
    /// Source address of this router's PCEP connection
    pub pcep_session_addr: IpAddr,
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Router {} loopback={} pcep={}>",
            self.name, self.loopback, self.pcep_session_addr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_json() {
        let router: Router = serde_json::from_str(
            r#"{
                "name": "r1",
                "mgmt_ip": "192.168.0.1",
                "iso_addr": "0000.0000.0001",
                "loopback": "1.1.1.1",
                "bgpls_peer": {"neighbor_address": "10.0.0.10", "peer_as": 65000},
                "pcep_session_addr": "10.0.0.1"
            }"#,
        )
        .unwrap();
        assert_eq!(router.id, None);
        assert!(!router.full_mesh);
        let peer = router.bgpls_peer.unwrap();
        assert_eq!(peer.peer_as, 65000);
        assert!(!peer.ebgp_multihop_enabled);
    }
}
