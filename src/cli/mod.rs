//! # PCEd CLI
//!
//! The CLI runs the controller daemon and also talks to a running instance over
//! its JSON-RPC API. It uses the default API endpoint (localhost:8080),
//! use `--host` and `--port` to point at a controller running elsewhere.
//!
//! ## Sessions
//! ```sh
//! $ pced show sessions
//!  Peer      Router  State  Uptime    MsgRcvd  MsgSent  Last Read  Last Write  Keepalive  DeadTimer  LSPs
//! -----------------------------------------------------------------------------------------------------------
//!  10.0.0.1  r1      Up     00:11:27  76       70       00:00:12   00:00:11    30         120        2
//! ```
//!
//! ## LSPs
//! What the routers report:
//! ```sh
//! $ pced show lsps network
//!  Session   Name                 PLSP-ID  Oper    Flags  Source   Endpoint  ERO
//! -----------------------------------------------------------------------------------------------------------
//!  10.0.0.1  LSP-1.1.1.1-3.3.3.3  4        Active  D--A   1.1.1.1  3.3.3.3   16001:10.1.2.1->10.1.2.2 16002:2.2.2.2
//! ```
//!
//! What the controller intends:
//! ```sh
//! $ pced show lsps controller
//! ```
//!
//! ## Topology
//! ```sh
//! $ pced topology load bgpls.json
//! Learned 13 BGP-LS paths
//! $ pced show paths
//! ```

use std::error::Error;
use std::fs;

use clap::Parser;
use colored::*;
use itertools::Itertools;
use jsonrpsee::http_client::HttpClientBuilder;
use uuid::Uuid;

use crate::api::rpc::ApiClient;
use crate::models::{Router, SrLsp};
use crate::topology::LsPath;

mod display;
mod table;

use display::{
    ControllerLspRow, LinkRow, NetworkLspRow, NodeRow, PathRow, PrefixRow, RouterRow, SessionRow,
};
use table::{OutputTable, ToRow};

#[derive(Parser, Debug)]
#[clap(name = "pced", rename_all = "kebab-case")]
/// Segment routing PCEP controller
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    #[clap(long, default_value = "127.0.0.1", global = true)]
    pub host: String,
    #[clap(short, long, default_value_t = 8080, global = true)]
    pub port: u16,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Run the PCEd daemon
    Run(RunOptions),
    /// View controller state
    #[clap(alias = "s", subcommand)]
    Show(Show),
    /// Manage routers
    #[clap(subcommand)]
    Router(RouterCommand),
    /// Manage controller LSPs
    #[clap(subcommand)]
    Lsp(LspCommand),
    /// Feed BGP-LS paths to the controller
    #[clap(subcommand)]
    Topology(TopologyCommand),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to the controller config.toml
    pub config_path: String,
    /// Keep routers and LSPs in memory only
    #[clap(long)]
    pub ephemeral: bool,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Show {
    /// PCEP sessions with routers
    #[clap(alias = "sess")]
    Sessions,
    /// LSPs, as reported by routers (default) or intended by the controller
    Lsps {
        #[clap(subcommand)]
        source: Option<LspSource>,
    },
    Routers,
    /// Nodes, links and prefixes learned over BGP-LS
    #[clap(alias = "topo")]
    Topology,
    /// Paths from the last computation
    Paths,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum LspSource {
    Network,
    Controller,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum RouterCommand {
    Add(RouterOptions),
    /// Update the router with this ID
    Update {
        id: Uuid,
        #[clap(flatten)]
        options: RouterOptions,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RouterOptions {
    name: String,
    /// IGP router ID as advertised in BGP-LS (E.g. 0000.0000.0001)
    #[clap(long)]
    iso_addr: String,
    #[clap(long)]
    loopback: std::net::Ipv4Addr,
    /// Source address of the router's PCEP session
    #[clap(long)]
    pcep_addr: std::net::IpAddr,
    #[clap(long)]
    mgmt_ip: std::net::IpAddr,
    /// Include in the LSP full mesh
    #[clap(long)]
    full_mesh: bool,
}

impl RouterOptions {
    fn to_router(&self, id: Option<Uuid>) -> Router {
        Router {
            id,
            name: self.name.clone(),
            mgmt_ip: self.mgmt_ip,
            iso_addr: self.iso_addr.clone(),
            loopback: self.loopback,
            bgpls_peer: None,
            full_mesh: self.full_mesh,
            pcep_session_addr: self.pcep_addr,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum LspCommand {
    /// Create an LSP from a JSON file
    Add { path: String },
    /// Update an LSP from a JSON file
    Update { path: String },
    Delete { name: String },
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum TopologyCommand {
    /// Load a JSON list of BGP-LS paths
    Load { path: String },
}

fn print_table<T: ToRow>(rows: impl IntoIterator<Item = T>) {
    OutputTable::from_rows(rows).print();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

async fn run_cmd(args: &Args) -> Result<(), Box<dyn Error>> {
    let client = {
        let base = format!("http://{}:{}", args.host, args.port);
        HttpClientBuilder::default().build(base)?
    };
    match &args.cmd {
        Command::Show(show) => match show {
            Show::Sessions => {
                print_table(client.show_sessions().await?.into_iter().map(SessionRow));
            }
            Show::Lsps { source } => match source {
                Some(LspSource::Controller) => {
                    print_table(
                        client
                            .show_controller_lsps()
                            .await?
                            .into_iter()
                            .map(ControllerLspRow),
                    );
                }
                _ => {
                    let lsps = client.show_network_lsps().await?;
                    if lsps.is_empty() {
                        print_table(Vec::<NetworkLspRow>::new());
                    }
                    // Sorted by session already
                    for (session, lsps) in &lsps.into_iter().group_by(|lsp| lsp.session) {
                        println!("Reported by {}", session);
                        print_table(lsps.map(NetworkLspRow));
                        println!();
                    }
                }
            },
            Show::Routers => {
                print_table(client.show_routers().await?.into_iter().map(RouterRow));
            }
            Show::Topology => {
                let topology = client.show_topology().await?;
                println!("Nodes");
                print_table(topology.nodes.into_iter().map(NodeRow));
                println!("\nLinks");
                print_table(topology.links.into_iter().map(LinkRow));
                println!("\nPrefixes");
                print_table(topology.prefixes.into_iter().map(PrefixRow));
            }
            Show::Paths => {
                print_table(client.show_paths().await?.into_iter().map(PathRow));
            }
        },
        Command::Router(command) => match command {
            RouterCommand::Add(options) => {
                let router = client.create_router(options.to_router(None)).await?;
                println!("Added router:");
                print_table(vec![RouterRow(router)]);
            }
            RouterCommand::Update { id, options } => {
                let router = client.update_router(options.to_router(Some(*id))).await?;
                println!("Updated router:");
                print_table(vec![RouterRow(router)]);
            }
            RouterCommand::Delete { id } => {
                client.delete_router(*id).await?;
                println!("Deleted router {}", id);
            }
        },
        Command::Lsp(command) => match command {
            LspCommand::Add { path } => {
                let lsp: SrLsp = read_json(path)?;
                let lsp = client.create_lsp(lsp).await?;
                println!("Added LSP:");
                print_table(vec![ControllerLspRow(lsp)]);
            }
            LspCommand::Update { path } => {
                let lsp: SrLsp = read_json(path)?;
                let lsp = client.update_lsp(lsp).await?;
                println!("Updated LSP:");
                print_table(vec![ControllerLspRow(lsp)]);
            }
            LspCommand::Delete { name } => {
                client.delete_lsp(name.clone()).await?;
                println!("Deleted LSP {}", name);
            }
        },
        Command::Topology(TopologyCommand::Load { path }) => {
            let paths: Vec<LsPath> = read_json(path)?;
            let learned = client.learn_ls_paths(paths).await?;
            println!("Learned {} BGP-LS paths", learned);
        }
        Command::Run(_) => return Err("The daemon is started from main".into()),
    }
    Ok(())
}

/// PCEd interactive commands (other than running the daemon)
pub async fn query_pced(args: &Args) {
    if let Err(err) = run_cmd(args).await {
        eprintln!("{}", err.to_string().red());
    }
}
