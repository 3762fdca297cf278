use prettytable::{cell, row, Row};

use super::table::ToRow;
use crate::api::rpc::{NetworkLsp, SessionSummary};
use crate::models::{Router, SrLsp};
use crate::pcep::SrEroSubobject;
use crate::topology::{Link, Node, Path, Prefix};
use crate::utils::{maybe_string, EMPTY_VALUE};

/// Label stack as "16002:2.2.2.2 16003:3.3.3.3"
fn format_ero(ero: &[SrEroSubobject]) -> String {
    ero.iter()
        .map(|hop| {
            if hop.no_nai {
                hop.sid.to_string()
            } else {
                format!("{}:{}", hop.sid, hop.nai)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn flag(set: bool, letter: &'static str) -> &'static str {
    if set {
        letter
    } else {
        "-"
    }
}

pub struct SessionRow(pub SessionSummary);

impl ToRow for SessionRow {
    fn columns() -> Row {
        row![
            "Peer",
            "Router",
            "State",
            "Uptime",
            "MsgRcvd",
            "MsgSent",
            "Last Read",
            "Last Write",
            "Keepalive",
            "DeadTimer",
            "LSPs"
        ]
    }

    fn to_row(&self) -> Row {
        let session = &self.0;
        row![
            session.addr,
            maybe_string(session.router.as_ref()),
            session.state,
            session.uptime,
            session.msg_received,
            session.msg_sent,
            maybe_string(session.last_received.as_ref()),
            maybe_string(session.last_sent.as_ref()),
            maybe_string(session.keepalive.as_ref()),
            maybe_string(session.dead_timer.as_ref()),
            session.lsps,
        ]
    }
}

pub struct NetworkLspRow(pub NetworkLsp);

impl ToRow for NetworkLspRow {
    fn columns() -> Row {
        row!["Session", "Name", "PLSP-ID", "Oper", "Flags", "Source", "Endpoint", "ERO"]
    }

    fn to_row(&self) -> Row {
        let lsp = &self.0.lsp;
        let flags = [
            flag(lsp.delegate, "D"),
            flag(lsp.sync, "S"),
            flag(lsp.remove, "R"),
            flag(lsp.admin, "A"),
        ]
        .concat();
        let (source, endpoint) = match &lsp.ipv4_identifiers {
            Some(ids) => (ids.sender.to_string(), ids.endpoint.to_string()),
            None => (EMPTY_VALUE.to_string(), EMPTY_VALUE.to_string()),
        };
        row![
            self.0.session,
            lsp.name,
            lsp.plsp_id,
            lsp.oper,
            flags,
            source,
            endpoint,
            format_ero(&lsp.ero),
        ]
    }
}

pub struct ControllerLspRow(pub SrLsp);

impl ToRow for ControllerLspRow {
    fn columns() -> Row {
        row!["Name", "Source", "Destination", "Priority", "Bandwidth", "ERO"]
    }

    fn to_row(&self) -> Row {
        let lsp = &self.0;
        row![
            lsp.name,
            lsp.src,
            lsp.dst,
            format!("{}/{}", lsp.setup_priority, lsp.hold_priority),
            lsp.bandwidth,
            format_ero(&lsp.ero),
        ]
    }
}

pub struct RouterRow(pub Router);

impl ToRow for RouterRow {
    fn columns() -> Row {
        row!["ID", "Name", "Mgmt IP", "ISO Address", "Loopback", "PCEP Source", "BGP-LS Peer", "Mesh"]
    }

    fn to_row(&self) -> Row {
        let router = &self.0;
        let bgpls_peer = router
            .bgpls_peer
            .as_ref()
            .map(|peer| format!("{} (AS {})", peer.neighbor_address, peer.peer_as));
        row![
            maybe_string(router.id.as_ref()),
            router.name,
            router.mgmt_ip,
            router.iso_addr,
            router.loopback,
            router.pcep_session_addr,
            maybe_string(bgpls_peer.as_ref()),
            if router.full_mesh { "yes" } else { "no" },
        ]
    }
}

pub struct NodeRow(pub Node);

impl ToRow for NodeRow {
    fn columns() -> Row {
        row!["IGP Router ID", "Name", "Router ID", "AS", "SRGB"]
    }

    fn to_row(&self) -> Row {
        let node = &self.0;
        row![
            node.igp_router_id,
            node.name,
            node.router_id,
            node.asn,
            format!("{}-{}", node.sr_range_start, node.sr_range_end),
        ]
    }
}

pub struct LinkRow(pub Link);

impl ToRow for LinkRow {
    fn columns() -> Row {
        row!["Local", "Remote", "Interface", "Neighbor", "IGP Metric", "TE Metric", "Unreserved", "Adj SID"]
    }

    fn to_row(&self) -> Row {
        let link = &self.0;
        row![
            link.local_node,
            link.remote_node,
            maybe_string(link.int_ip.as_ref()),
            maybe_string(link.neighbour_ip.as_ref()),
            link.igp_metric,
            link.default_te_metric,
            link.unreserved_bw,
            link.sr_adjacency_sid,
        ]
    }
}

pub struct PrefixRow(pub Prefix);

impl ToRow for PrefixRow {
    fn columns() -> Row {
        row!["Node", "Prefix", "Prefix SID"]
    }

    fn to_row(&self) -> Row {
        let prefix = &self.0;
        row![prefix.local_node, prefix.prefix, prefix.sr_prefix_sid]
    }
}

pub struct PathRow(pub Path);

impl ToRow for PathRow {
    fn columns() -> Row {
        row!["Source", "Destination", "Cost", "Hops"]
    }

    fn to_row(&self) -> Row {
        let path = &self.0;
        let hops = std::iter::once(path.src.as_str())
            .chain(path.links.iter().map(|link| link.remote_node.as_str()))
            .collect::<Vec<_>>()
            .join(" > ");
        row![path.src, path.dst, path.cost, hops]
    }
}
