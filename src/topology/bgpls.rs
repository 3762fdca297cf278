use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use log::trace;
use serde::{Deserialize, Serialize};

use super::{Graph, Link, Node, Prefix, TopologyError};

/// One BGP-LS path as handed over by the BGP speaker
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LsPath {
    pub nlri: LsNlri,
    #[serde(default)]
    pub attributes: Vec<PathAttribute>,
    #[serde(default)]
    pub withdrawal: bool,
}

impl LsPath {
    /// The BGP-LS attribute, if the path carries one
    pub fn ls_attribute(&self) -> Option<&LsAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            PathAttribute::LinkState(ls) => Some(ls),
            _ => None,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PathAttribute {
    Origin(u8),
    NextHop(IpAddr),
    AsPath(Vec<u32>),
    LocalPref(u32),
    LinkState(LsAttribute),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LsNodeDescriptor {
    #[serde(default)]
    pub asn: u32,
    pub igp_router_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LsLinkDescriptor {
    #[serde(default)]
    pub interface_addr_ipv4: Option<Ipv4Addr>,
    #[serde(default)]
    pub neighbor_addr_ipv4: Option<Ipv4Addr>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LsPrefixDescriptor {
    pub ip_reachability: Vec<String>,
}

/// NLRI types 1 (node), 2 (link) and 3 (IPv4 prefix)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LsNlri {
    Node {
        local_node: LsNodeDescriptor,
    },
    Link {
        local_node: LsNodeDescriptor,
        remote_node: LsNodeDescriptor,
        #[serde(default)]
        link_descriptor: LsLinkDescriptor,
    },
    PrefixV4 {
        local_node: LsNodeDescriptor,
        prefix_descriptor: LsPrefixDescriptor,
    },
}

impl fmt::Display for LsNlri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LsNlri::Node { local_node } => write!(f, "node NLRI {}", local_node.igp_router_id),
            LsNlri::Link {
                local_node,
                remote_node,
                ..
            } => write!(
                f,
                "link NLRI {} -> {}",
                local_node.igp_router_id, remote_node.igp_router_id
            ),
            LsNlri::PrefixV4 {
                local_node,
                prefix_descriptor,
            } => write!(
                f,
                "prefix NLRI {} {}",
                local_node.igp_router_id,
                prefix_descriptor.ip_reachability.join(",")
            ),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LsSrRange {
    pub begin: u32,
    pub end: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LsNodeAttribute {
    #[serde(default)]
    pub local_router_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sr_ranges: Vec<LsSrRange>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LsLinkAttribute {
    pub bandwidth: f32,
    pub default_te_metric: u32,
    pub igp_metric: u32,
    pub reservable_bandwidth: f32,
    /// Per priority, 0 first
    pub unreserved_bandwidth: Vec<f32>,
    pub sr_adjacency_sid: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LsPrefixAttribute {
    pub sr_prefix_sid: u32,
}

/// BGP-LS attribute (path attribute 29)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LsAttribute {
    pub node: Option<LsNodeAttribute>,
    pub link: Option<LsLinkAttribute>,
    pub prefix: Option<LsPrefixAttribute>,
}

impl Graph {
    /// Mutate the graph for one learned (or withdrawn) path
    pub fn apply(&mut self, path: &LsPath) -> Result<(), TopologyError> {
        let attribute = path.ls_attribute();
        match &path.nlri {
            LsNlri::Node { local_node } => {
                if path.withdrawal {
                    self.nodes.remove(&local_node.igp_router_id);
                    return Ok(());
                }
                let mut node = Node {
                    asn: local_node.asn,
                    igp_router_id: local_node.igp_router_id.clone(),
                    ..Default::default()
                };
                if let Some(attr) = attribute.and_then(|a| a.node.as_ref()) {
                    node.router_id = attr.local_router_id.clone().unwrap_or_default();
                    node.name = attr.name.clone().unwrap_or_default();
                    if let Some(range) = attr.sr_ranges.first() {
                        node.sr_range_start = range.begin;
                        node.sr_range_end = range.end;
                    }
                }
                trace!("Node {} [{}]", node.igp_router_id, node.name);
                self.upsert_node(node);
            }
            LsNlri::Link {
                local_node,
                remote_node,
                link_descriptor,
            } => {
                let mut link = Link {
                    local_node: local_node.igp_router_id.clone(),
                    remote_node: remote_node.igp_router_id.clone(),
                    int_ip: link_descriptor.interface_addr_ipv4,
                    neighbour_ip: link_descriptor.neighbor_addr_ipv4,
                    ..Default::default()
                };
                if path.withdrawal {
                    self.links.retain(|l| {
                        !(l.local_node == link.local_node
                            && l.remote_node == link.remote_node
                            && l.int_ip == link.int_ip)
                    });
                    return Ok(());
                }
                if let Some(attr) = attribute.and_then(|a| a.link.as_ref()) {
                    link.bandwidth = attr.bandwidth;
                    link.default_te_metric = attr.default_te_metric;
                    link.igp_metric = attr.igp_metric;
                    link.reservable_bw = attr.reservable_bandwidth;
                    link.unreserved_bw = attr.unreserved_bandwidth.first().copied().unwrap_or(0.0);
                    link.sr_adjacency_sid = attr.sr_adjacency_sid;
                }
                self.upsert_link(link);
            }
            LsNlri::PrefixV4 {
                local_node,
                prefix_descriptor,
            } => {
                if path.withdrawal {
                    self.prefixes.remove(&local_node.igp_router_id);
                    return Ok(());
                }
                let reachability = prefix_descriptor.ip_reachability.first().ok_or_else(|| {
                    TopologyError::InvalidNlri(format!(
                        "prefix NLRI from {} has no IP reachability",
                        local_node.igp_router_id
                    ))
                })?;
                let mut prefix = Prefix {
                    prefix: reachability.clone(),
                    local_node: local_node.igp_router_id.clone(),
                    ..Default::default()
                };
                if let Some(attr) = attribute.and_then(|a| a.prefix.as_ref()) {
                    prefix.sr_prefix_sid = attr.sr_prefix_sid;
                }
                self.upsert_prefix(prefix);
            }
        }
        Ok(())
    }
}
