use std::net::Ipv4Addr;

use super::{Graph, Path, TopologyError};
use crate::models::SrLsp;
use crate::pcep::SrEroSubobject;
use crate::utils::strip_prefix_len;

impl Graph {
    /// Node SID: the node's SRGB start plus its prefix SID, both must be known
    pub fn get_sid_by_igp_router_id(&self, igp_router_id: &str) -> Result<u32, TopologyError> {
        let node = self
            .nodes
            .get(igp_router_id)
            .ok_or_else(|| TopologyError::NodeNotFound(igp_router_id.to_string()))?;
        let prefix = self
            .prefixes
            .get(igp_router_id)
            .ok_or_else(|| TopologyError::PrefixNotFound(igp_router_id.to_string()))?;
        Ok(node.sr_range_start + prefix.sr_prefix_sid)
    }

    fn prefix_address(&self, igp_router_id: &str) -> Result<Ipv4Addr, TopologyError> {
        let prefix = self
            .prefixes
            .get(igp_router_id)
            .ok_or_else(|| TopologyError::PrefixNotFound(igp_router_id.to_string()))?;
        strip_prefix_len(&prefix.prefix).map_err(|err| {
            TopologyError::InvalidNlri(format!("prefix {}: {}", prefix.prefix, err))
        })
    }

    /// Build the SR-LSP for `path`
    ///
    /// The first hop is an adjacency (local and neighbour interface), every
    /// later hop is the node SID of that link's local end.
    pub fn create_sr_lsp(&self, bandwidth: u32, path: &Path) -> Result<SrLsp, TopologyError> {
        if path.links.is_empty() {
            return Err(TopologyError::EmptyPath);
        }
        let src = self.prefix_address(&path.src)?;
        let dst = self.prefix_address(&path.dst)?;
        let mut ero = Vec::with_capacity(path.links.len());
        for (i, link) in path.links.iter().enumerate() {
            let sid = self.get_sid_by_igp_router_id(&link.local_node)?;
            if i == 0 {
                let (local, remote) = match (link.int_ip, link.neighbour_ip) {
                    (Some(local), Some(remote)) => (local, remote),
                    _ => {
                        return Err(TopologyError::MissingAddress(format!(
                            "{} -> {}",
                            link.local_node, link.remote_node
                        )))
                    }
                };
                ero.push(SrEroSubobject::ipv4_adjacency(sid, local, remote));
                continue;
            }
            let node = self.prefix_address(&link.local_node)?;
            ero.push(SrEroSubobject::ipv4_node(sid, node));
        }
        Ok(SrLsp {
            name: format!("LSP-{}-{}", src, dst),
            src,
            dst,
            delegate: true,
            sync: false,
            remove: false,
            admin: true,
            ero,
            setup_priority: 7,
            hold_priority: 7,
            local_protection: false,
            bandwidth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcep::{Nai, NodeType};
    use crate::topology::{Link, Node, Prefix};

    fn node(id: &str, sr_range_start: u32) -> Node {
        Node {
            igp_router_id: id.to_string(),
            sr_range_start,
            sr_range_end: sr_range_start + 7999,
            ..Default::default()
        }
    }

    fn prefix(id: &str, prefix: &str, sid: u32) -> Prefix {
        Prefix {
            prefix: prefix.to_string(),
            sr_prefix_sid: sid,
            local_node: id.to_string(),
        }
    }

    fn link(local: &str, remote: &str, int_ip: [u8; 4], neighbour_ip: [u8; 4]) -> Link {
        Link {
            local_node: local.to_string(),
            remote_node: remote.to_string(),
            int_ip: Some(Ipv4Addr::from(int_ip)),
            neighbour_ip: Some(Ipv4Addr::from(neighbour_ip)),
            igp_metric: 10,
            unreserved_bw: 1000.0,
            ..Default::default()
        }
    }

    fn line() -> Graph {
        let mut graph = Graph::new();
        graph.upsert_node(node("A", 16000));
        graph.upsert_node(node("B", 16000));
        graph.upsert_node(node("C", 16000));
        graph.upsert_prefix(prefix("A", "1.1.1.1/32", 1));
        graph.upsert_prefix(prefix("B", "2.2.2.2/32", 2));
        graph.upsert_prefix(prefix("C", "3.3.3.3/32", 3));
        graph.upsert_link(link("A", "B", [10, 0, 0, 1], [10, 0, 0, 2]));
        graph.upsert_link(link("B", "C", [10, 0, 1, 1], [10, 0, 1, 2]));
        graph
    }

    #[test]
    fn test_get_sid() {
        let mut graph = Graph::new();
        graph.upsert_node(node("X", 16000));
        assert_eq!(
            graph.get_sid_by_igp_router_id("X"),
            Err(TopologyError::PrefixNotFound("X".to_string()))
        );
        graph.upsert_prefix(prefix("X", "9.9.9.9/32", 5));
        assert_eq!(graph.get_sid_by_igp_router_id("X"), Ok(16005));

        let mut graph = Graph::new();
        graph.upsert_prefix(prefix("Y", "9.9.9.9/32", 5));
        assert_eq!(
            graph.get_sid_by_igp_router_id("Y"),
            Err(TopologyError::NodeNotFound("Y".to_string()))
        );
    }

    #[test]
    fn test_create_sr_lsp() {
        let graph = line();
        let path = &graph.find_all_paths("A", "C")[0];
        let lsp = graph.create_sr_lsp(100, path).unwrap();
        assert_eq!(lsp.name, "LSP-1.1.1.1-3.3.3.3");
        assert_eq!(lsp.src, Ipv4Addr::new(1, 1, 1, 1));
        assert_eq!(lsp.dst, Ipv4Addr::new(3, 3, 3, 3));
        assert!(lsp.delegate && lsp.admin);
        assert_eq!((lsp.setup_priority, lsp.hold_priority), (7, 7));
        assert_eq!(lsp.bandwidth, 100);

        assert_eq!(lsp.ero.len(), 2);
        assert_eq!(lsp.ero[0].node_type, NodeType::Ipv4Adjacency);
        assert_eq!(lsp.ero[0].sid, 16001);
        assert_eq!(
            lsp.ero[0].nai,
            Nai::Ipv4Adjacency {
                local: Ipv4Addr::new(10, 0, 0, 1),
                remote: Ipv4Addr::new(10, 0, 0, 2),
            }
        );
        assert_eq!(lsp.ero[1].node_type, NodeType::Ipv4Node);
        assert_eq!(lsp.ero[1].sid, 16002);
        assert_eq!(lsp.ero[1].nai, Nai::Ipv4Node(Ipv4Addr::new(2, 2, 2, 2)));
        assert!(lsp.validate().is_ok());
    }

    #[test]
    fn test_missing_lookups_abort() {
        let mut graph = line();
        let path = graph.find_all_paths("A", "C")[0].clone();
        graph.prefixes.remove("B");
        assert_eq!(
            graph.create_sr_lsp(100, &path),
            Err(TopologyError::PrefixNotFound("B".to_string()))
        );

        let mut graph = line();
        graph.links[0].int_ip = None;
        let path = graph.find_all_paths("A", "C")[0].clone();
        assert!(matches!(
            graph.create_sr_lsp(100, &path),
            Err(TopologyError::MissingAddress(_))
        ));

        let empty = Path {
            src: "A".to_string(),
            dst: "C".to_string(),
            cost: 0,
            links: vec![],
        };
        assert_eq!(graph.create_sr_lsp(100, &empty), Err(TopologyError::EmptyPath));
    }
}
