//! Learned link-state topology and the path engine built on it
//!
//! Nodes and prefixes are keyed by IGP router ID. Links are directional and
//! kept in the order they were first learned, which fixes the order paths are
//! enumerated in.

mod bgpls;
mod paths;
mod srlsp;

use std::collections::{BTreeMap, HashMap};
use std::error;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, RwLock};

pub use bgpls::{
    LsAttribute, LsLinkAttribute, LsLinkDescriptor, LsNlri, LsNodeAttribute, LsNodeDescriptor,
    LsPath, LsPrefixAttribute, LsPrefixDescriptor, LsSrRange, PathAttribute,
};
pub use paths::path_key;

use crate::models::SrLsp;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub asn: u32,
    pub router_id: String,
    pub igp_router_id: String,
    pub name: String,
    pub sr_range_start: u32,
    pub sr_range_end: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub local_node: String,
    pub remote_node: String,
    pub int_ip: Option<Ipv4Addr>,
    pub neighbour_ip: Option<Ipv4Addr>,
    pub default_te_metric: u32,
    pub igp_metric: u32,
    pub bandwidth: f32,
    pub reservable_bw: f32,
    pub unreserved_bw: f32,
    pub sr_adjacency_sid: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Prefix {
    /// CIDR as learned, e.g. "10.0.0.1/32"
    pub prefix: String,
    pub sr_prefix_sid: u32,
    pub local_node: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Path {
    pub src: String,
    pub dst: String,
    /// Sum of the IGP metric of every link
    pub cost: u64,
    pub links: Vec<Link>,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.src)?;
        for link in &self.links {
            write!(f, " -> {}", link.remote_node)?;
        }
        write!(f, " (cost {})", self.cost)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    NodeNotFound(String),
    PrefixNotFound(String),
    /// Link is missing an interface address needed for an adjacency hop
    MissingAddress(String),
    EmptyPath,
    /// NLRI could not be applied. [reason]
    InvalidNlri(String),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Topology Error: ")?;
        use TopologyError::*;
        match self {
            NodeNotFound(id) => write!(f, "No node found for IGP router ID {}", id),
            PrefixNotFound(id) => write!(f, "No prefix found for IGP router ID {}", id),
            MissingAddress(link) => write!(f, "Link {} has no interface addresses", link),
            EmptyPath => write!(f, "Path has no links"),
            InvalidNlri(reason) => write!(f, "Invalid NLRI: {}", reason),
        }
    }
}

impl error::Error for TopologyError {}

/// Read-only copy of the graph for display
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub prefixes: Vec<Prefix>,
}

/// The graph itself, no locking
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    links: Vec<Link>,
    prefixes: BTreeMap<String, Prefix>,
    // "src:dst" -> every enumerated path, refreshed by find_paths_for_all_pairs
    paths: HashMap<String, Vec<Path>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_node(&mut self, node: Node) {
        self.nodes.insert(node.igp_router_id.clone(), node);
    }

    /// Links are unique by (local node, remote node, local interface)
    pub fn upsert_link(&mut self, link: Link) {
        let existing = self.links.iter_mut().find(|l| {
            l.local_node == link.local_node
                && l.remote_node == link.remote_node
                && l.int_ip == link.int_ip
        });
        match existing {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
    }

    pub fn upsert_prefix(&mut self, prefix: Prefix) {
        self.prefixes.insert(prefix.local_node.clone(), prefix);
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.clone(),
            prefixes: self.prefixes.values().cloned().collect(),
        }
    }
}

/// Shared topology plus the coalescing "topology changed" signal
#[derive(Debug, Default)]
pub struct TopologyView {
    graph: RwLock<Graph>,
    update: Arc<Notify>,
}

impl TopologyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// BGP-LS callback: apply one path, then signal the update
    ///
    /// The lock is released before signalling. A burst of updates with no
    /// waiting consumer collapses into a single pending wakeup.
    pub async fn apply(&self, path: &LsPath) -> Result<(), TopologyError> {
        {
            let mut graph = self.graph.write().await;
            graph.apply(path)?;
        }
        debug!("Applied {}", path.nlri);
        self.update.notify_one();
        Ok(())
    }

    /// Wait for the next topology change
    pub async fn updated(&self) {
        self.update.notified().await
    }

    /// Enumerate paths between every pair of known nodes
    pub async fn compute_paths(&self) {
        self.graph.write().await.find_paths_for_all_pairs();
    }

    pub async fn find_all_paths(&self, src: &str, dst: &str) -> Vec<Path> {
        self.graph.read().await.find_all_paths(src, dst)
    }

    /// Best path from the last computation
    pub async fn best_path(&self, bandwidth_needed: f32, src: &str, dst: &str) -> Option<Path> {
        self.graph
            .read()
            .await
            .find_best_path(bandwidth_needed, src, dst)
            .cloned()
    }

    /// Pick the best path for src -> dst and turn it into an SR-LSP
    ///
    /// `Ok(None)` when no path is feasible, which is a normal outcome.
    pub async fn best_sr_lsp(
        &self,
        bandwidth_needed: f32,
        bandwidth: u32,
        src: &str,
        dst: &str,
    ) -> Result<Option<SrLsp>, TopologyError> {
        let graph = self.graph.read().await;
        match graph.find_best_path(bandwidth_needed, src, dst) {
            Some(path) => graph.create_sr_lsp(bandwidth, path).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_sid_by_igp_router_id(&self, igp_router_id: &str) -> Result<u32, TopologyError> {
        self.graph.read().await.get_sid_by_igp_router_id(igp_router_id)
    }

    pub async fn snapshot(&self) -> TopologySnapshot {
        self.graph.read().await.snapshot()
    }

    /// Every path from the last computation, sorted by key
    pub async fn paths(&self) -> Vec<Path> {
        let graph = self.graph.read().await;
        let mut keys: Vec<_> = graph.paths.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|key| graph.paths[key].iter().cloned())
            .collect()
    }
}
