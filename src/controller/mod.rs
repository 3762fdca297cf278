//! Session, LSP and router registries plus the provisioning logic tying them
//! to the topology
//!
//! Intended LSPs (what the controller wants, keyed by name) are kept apart
//! from what each session has had reported by its router. Provisioning only
//! ever compares against the intended registry.

mod error;
mod lsps;
mod routers;

pub use error::{ControllerError, PhaseErrors};

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::models::{Router, SrLsp};
use crate::pcep::LspOper;
use crate::registry::Registry;
use crate::session::{LspReport, Session, SessionError, SessionEvent, SessionState};
use crate::store::{load_records, Store, LSPS, ROUTERS};
use crate::topology::{LsPath, TopologyView};

type NewSession = (Session, mpsc::UnboundedReceiver<SessionEvent>);

#[derive(Clone)]
pub struct Controller {
    config: Arc<ServerConfig>,
    store: Arc<dyn Store>,
    topology: Arc<TopologyView>,
    sessions: Registry<IpAddr, Session>,
    sessions_by_loopback: Registry<Ipv4Addr, Session>,
    lsps: Registry<String, SrLsp>,
    routers: Registry<Uuid, Router>,
    new_sessions: mpsc::UnboundedSender<NewSession>,
    new_sessions_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<NewSession>>>>,
    // One provisioning pass at a time, name dedup depends on it
    provisioning: Arc<Mutex<()>>,
}

impl Controller {
    /// Build the controller and load stored routers and LSPs
    pub async fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
    ) -> Result<Controller, ControllerError> {
        let (new_sessions, new_sessions_rx) = mpsc::unbounded_channel();
        let controller = Controller {
            config: Arc::new(config),
            store,
            topology: Arc::new(TopologyView::new()),
            sessions: Registry::new(),
            sessions_by_loopback: Registry::new(),
            lsps: Registry::new(),
            routers: Registry::new(),
            new_sessions,
            new_sessions_rx: Arc::new(Mutex::new(Some(new_sessions_rx))),
            provisioning: Arc::new(Mutex::new(())),
        };
        controller.load().await?;
        Ok(controller)
    }

    async fn load(&self) -> Result<(), ControllerError> {
        let routers: Vec<Router> = load_records(self.store.as_ref(), ROUTERS)?;
        for router in routers {
            match router.id {
                Some(id) => {
                    self.routers.put(id, router).await;
                }
                None => warn!("Skipping stored router {} with no ID", router.name),
            }
        }
        let lsps: Vec<SrLsp> = load_records(self.store.as_ref(), LSPS)?;
        for lsp in lsps {
            self.lsps.put(lsp.name.clone(), lsp).await;
        }
        // Configured routers are created once, the stored copy wins afterwards
        for router in self.config.routers.clone() {
            if self.find_router(|r| r.name == router.name).await.is_none() {
                let router = self.create_router(router).await?;
                debug!("Registered configured router {}", router);
            }
        }
        info!(
            "Loaded {} routers and {} LSPs",
            self.routers.len().await,
            self.lsps.len().await
        );
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn topology(&self) -> Arc<TopologyView> {
        Arc::clone(&self.topology)
    }

    /// Source addresses allowed to open a PCEP session
    pub async fn clients(&self) -> Vec<IpAddr> {
        self.routers
            .values()
            .await
            .into_iter()
            .map(|r| r.pcep_session_addr)
            .collect()
    }

    pub(crate) async fn find_router<F>(&self, predicate: F) -> Option<Router>
    where
        F: Fn(&Router) -> bool,
    {
        let mut found = None;
        self.routers
            .range(|_, router| {
                if predicate(router) {
                    found = Some(router.clone());
                    return false;
                }
                true
            })
            .await;
        found
    }

    pub async fn router_for_session(&self, addr: IpAddr) -> Option<Router> {
        self.find_router(|r| r.pcep_session_addr == addr).await
    }

    /// Register a new PCEP session, the peer must be a known router
    pub async fn session_start(
        &self,
        session: Session,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<(), ControllerError> {
        let addr = session.addr();
        let router = self
            .router_for_session(addr)
            .await
            .ok_or(ControllerError::UnknownPeer(addr))?;
        if let Some(existing) = self.sessions.get(&addr).await {
            if existing.state().await != SessionState::Closed {
                return Err(ControllerError::Invalid(format!(
                    "{} already has an active session",
                    addr
                )));
            }
        }
        self.sessions.put(addr, session.clone()).await;
        self.sessions_by_loopback
            .put(router.loopback, session.clone())
            .await;
        info!("New session started: {} [{}]", addr, router.name);
        self.new_sessions
            .send((session, events))
            .map_err(|_| ControllerError::Invalid("Session dispatcher is gone".to_string()))
    }

    /// Forget the session from `addr` once it has closed
    pub async fn session_end(&self, addr: IpAddr) {
        let session = match self.sessions.get(&addr).await {
            Some(session) => session,
            None => return,
        };
        // A newer session may have replaced it already
        if session.state().await != SessionState::Closed {
            return;
        }
        self.sessions.delete(&addr).await;
        if let Some(router) = self.router_for_session(addr).await {
            self.sessions_by_loopback.delete(&router.loopback).await;
        }
        debug!("Session with {} removed", addr);
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.sessions.values().await
    }

    pub async fn session_by_loopback(&self, loopback: Ipv4Addr) -> Option<Session> {
        self.sessions_by_loopback.get(&loopback).await
    }

    /// LSPs as reported by the routers
    pub async fn network_lsps(&self) -> Vec<(IpAddr, LspReport)> {
        let mut lsps = vec![];
        for session in self.sessions().await {
            for report in session.lsps().await {
                lsps.push((session.addr(), report));
            }
        }
        lsps
    }

    /// Apply BGP-LS paths to the topology, each one signals an update
    pub async fn learn_ls_paths(&self, paths: &[LsPath]) -> Result<usize, ControllerError> {
        for path in paths {
            self.topology.apply(path).await?;
        }
        Ok(paths.len())
    }

    /// Consume new sessions and topology updates until the controller goes away
    ///
    /// Only the first caller gets to run the dispatcher.
    pub async fn run(&self) {
        let mut new_sessions = match self.new_sessions_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                warn!("Controller dispatcher is already running");
                return;
            }
        };
        loop {
            tokio::select! {
                new_session = new_sessions.recv() => match new_session {
                    Some((session, events)) => {
                        let controller = self.clone();
                        tokio::spawn(async move {
                            controller.watch_session(session, events).await
                        });
                    }
                    None => break,
                },
                _ = self.topology.updated() => {
                    info!("Topology updated, reprovisioning all sessions");
                    self.topology.compute_paths().await;
                    // One task per session
                    for session in self.sessions().await {
                        if session.state().await == SessionState::Up {
                            let controller = self.clone();
                            tokio::spawn(async move { controller.init_sr_lsps(&session).await });
                        }
                    }
                }
            }
        }
    }

    async fn watch_session(&self, session: Session, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Ready => {
                    info!("Session with {} is ready", session.addr());
                    self.topology.compute_paths().await;
                    self.init_sr_lsps(&session).await;
                }
                SessionEvent::Closed => {
                    info!("Session with {} closed", session.addr());
                    break;
                }
            }
        }
    }

    /// Push every intended LSP sourced at this session's router that is not
    /// already active, then run the full mesh
    ///
    /// Work is collected under the provisioning lock and written after it is
    /// released.
    pub async fn init_sr_lsps(&self, session: &Session) {
        let router = match self.router_for_session(session.addr()).await {
            Some(router) => router,
            None => return,
        };
        let pending = {
            let _provisioning = self.provisioning.lock().await;
            let mut pending = vec![];
            for lsp in self.lsps.values().await {
                if lsp.src != router.loopback {
                    continue;
                }
                if let Some(reported) = session.get_lsp(&lsp.name).await {
                    if reported.oper == LspOper::Active {
                        trace!("{} is already active on {}", lsp.name, router.name);
                        continue;
                    }
                }
                pending.push(lsp);
            }
            pending.extend(self.full_mesh(&router).await);
            pending
        };
        for lsp in pending {
            match session.init_sr_lsp(&lsp).await {
                Ok(()) => (),
                Err(err @ SessionError::WriteTimeout(_)) => {
                    warn!("Giving up on {}: {}", router.name, err);
                    break;
                }
                Err(err) => {
                    warn!("Could not initiate {} on {}: {}", lsp.name, router.name, err)
                }
            }
        }
    }

    /// Register one LSP from `router` to every other full mesh router, unless
    /// an intended LSP of the same name already exists. Returns the new ones.
    ///
    /// Uses the paths from the last computation.
    async fn full_mesh(&self, router: &Router) -> Vec<SrLsp> {
        let start = Instant::now();
        let destinations: Vec<Router> = self
            .routers
            .values()
            .await
            .into_iter()
            .filter(|r| r.full_mesh && r.id != router.id)
            .collect();
        let mut provisioned = vec![];
        for dst in destinations {
            let lsp = match self
                .topology
                .best_sr_lsp(0.0, self.config.full_mesh_bandwidth, &router.iso_addr, &dst.iso_addr)
                .await
            {
                Ok(Some(lsp)) => lsp,
                Ok(None) => {
                    info!("{}", ControllerError::NoPath(router.iso_addr.clone(), dst.iso_addr.clone()));
                    continue;
                }
                Err(err) => {
                    warn!("Could not build LSP {} -> {}: {}", router.name, dst.name, err);
                    continue;
                }
            };
            if self.lsps.get(&lsp.name).await.is_some() {
                trace!("{} already provisioned", lsp.name);
                continue;
            }
            info!("Provisioning {}", lsp);
            self.lsps.put(lsp.name.clone(), lsp.clone()).await;
            provisioned.push(lsp);
        }
        debug!(
            "Full mesh for {} done in {:?}",
            router.name,
            start.elapsed()
        );
        provisioned
    }

    /// Close every session, used on shutdown
    pub async fn close_sessions(&self) {
        for session in self.sessions().await {
            session.close().await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use bytes::BytesMut;
    use futures::{SinkExt, StreamExt};
    use tokio::io::DuplexStream;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::pcep::{
        decode_objects, LspObject, LspOper, Message, MessageCodec, MessageProtocol, OpenObject,
        SrEroSubobject, SrpObject,
    };
    use crate::session::SessionTimers;
    use crate::store::MemoryStore;
    use crate::topology::{
        LsAttribute, LsLinkAttribute, LsLinkDescriptor, LsNlri, LsNodeAttribute,
        LsNodeDescriptor, LsPrefixAttribute, LsPrefixDescriptor, LsSrRange, PathAttribute,
    };

    pub(crate) fn router(name: &str, n: u8, full_mesh: bool) -> Router {
        Router {
            id: None,
            name: name.to_string(),
            mgmt_ip: IpAddr::from([192, 168, 0, n]),
            iso_addr: format!("0000.0000.000{}", n),
            loopback: Ipv4Addr::new(n, n, n, n),
            bgpls_peer: None,
            full_mesh,
            pcep_session_addr: IpAddr::from([10, 0, 0, n]),
        }
    }

    /// Controller LSP from `src` to 3.3.3.3 over a single node hop
    pub(crate) fn intended_lsp(name: &str, src: Ipv4Addr) -> SrLsp {
        SrLsp {
            name: name.to_string(),
            src,
            dst: Ipv4Addr::new(3, 3, 3, 3),
            delegate: true,
            sync: false,
            remove: false,
            admin: true,
            ero: vec![SrEroSubobject::ipv4_node(16003, Ipv4Addr::new(3, 3, 3, 3))],
            setup_priority: 7,
            hold_priority: 7,
            local_protection: false,
            bandwidth: 100,
        }
    }

    pub(crate) async fn controller() -> Controller {
        Controller::new(ServerConfig::default(), Arc::new(MemoryStore::new()))
            .await
            .unwrap()
    }

    fn descriptor(n: u8) -> LsNodeDescriptor {
        LsNodeDescriptor {
            asn: 65000,
            igp_router_id: format!("0000.0000.000{}", n),
        }
    }

    fn with_attribute(nlri: LsNlri, attribute: LsAttribute) -> LsPath {
        LsPath {
            nlri,
            attributes: vec![PathAttribute::LinkState(attribute)],
            withdrawal: false,
        }
    }

    /// r1 - r2 - r3 in a line, links both ways
    pub(crate) fn line_topology() -> Vec<LsPath> {
        let mut paths = vec![];
        for n in 1..=3u8 {
            paths.push(with_attribute(
                LsNlri::Node {
                    local_node: descriptor(n),
                },
                LsAttribute {
                    node: Some(LsNodeAttribute {
                        local_router_id: Some(format!("{0}.{0}.{0}.{0}", n)),
                        name: Some(format!("r{}", n)),
                        sr_ranges: vec![LsSrRange {
                            begin: 16000,
                            end: 23999,
                        }],
                    }),
                    ..Default::default()
                },
            ));
            paths.push(with_attribute(
                LsNlri::PrefixV4 {
                    local_node: descriptor(n),
                    prefix_descriptor: LsPrefixDescriptor {
                        ip_reachability: vec![format!("{0}.{0}.{0}.{0}/32", n)],
                    },
                },
                LsAttribute {
                    prefix: Some(LsPrefixAttribute {
                        sr_prefix_sid: n.into(),
                    }),
                    ..Default::default()
                },
            ));
        }
        for (a, b) in &[(1u8, 2u8), (2, 1), (2, 3), (3, 2)] {
            paths.push(with_attribute(
                LsNlri::Link {
                    local_node: descriptor(*a),
                    remote_node: descriptor(*b),
                    link_descriptor: LsLinkDescriptor {
                        interface_addr_ipv4: Some(Ipv4Addr::new(10, *a, *b, *a)),
                        neighbor_addr_ipv4: Some(Ipv4Addr::new(10, *a, *b, *b)),
                    },
                },
                LsAttribute {
                    link: Some(LsLinkAttribute {
                        igp_metric: 10,
                        unreserved_bandwidth: vec![1000.0],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ));
        }
        paths
    }

    /// Session from r1 driven to Up, returns the router side of the wire
    pub(crate) async fn up_session(
        controller: &Controller,
        addr: IpAddr,
    ) -> (Session, MessageProtocol<DuplexStream>) {
        up_session_over(controller, addr, 8192, SessionTimers::default()).await
    }

    /// Same as `up_session` over a wire buffering at most `max_buf` bytes
    pub(crate) async fn up_session_over(
        controller: &Controller,
        addr: IpAddr,
        max_buf: usize,
        timers: SessionTimers,
    ) -> (Session, MessageProtocol<DuplexStream>) {
        let (client, server) = tokio::io::duplex(max_buf);
        let (session, events) = Session::new(
            addr,
            MessageProtocol::new(server, MessageCodec::new()),
            timers,
        );
        let mut wire = MessageProtocol::new(client, MessageCodec::new());
        let runner = session.clone();
        tokio::spawn(async move { runner.run().await });
        controller.session_start(session.clone(), events).await.unwrap();

        wire.send(Message::Open(OpenObject::local(30, 120, 1)))
            .await
            .unwrap();
        assert!(matches!(wire.next().await, Some(Ok(Message::Open(_)))));
        assert_eq!(wire.next().await.unwrap().unwrap(), Message::Keepalive);
        wire.send(Message::Keepalive).await.unwrap();
        while session.state().await != SessionState::Up {
            sleep(Duration::from_millis(5)).await;
        }
        (session, wire)
    }

    pub(crate) fn active_report(name: &str, plsp_id: u32) -> Message {
        let mut body = BytesMut::new();
        SrpObject::new(0, false).encode(&mut body);
        LspObject {
            plsp_id,
            oper: LspOper::Active,
            delegate: true,
            admin: true,
            name: Some(name.to_string()),
            ..Default::default()
        }
        .encode(&mut body)
        .unwrap();
        Message::Report(decode_objects(&body).unwrap())
    }

    async fn next_initiate(wire: &mut MessageProtocol<DuplexStream>) -> Option<Message> {
        match timeout(Duration::from_millis(200), wire.next()).await {
            Ok(Some(Ok(message @ Message::Initiate(_)))) => Some(message),
            Ok(other) => panic!("Expected PCInitiate, got {:?}", other),
            Err(_) => None,
        }
    }

    #[tokio::test]
    async fn test_session_start_rejects_unknown_peer() {
        let controller = controller().await;
        let (_client, server) = tokio::io::duplex(64);
        let (session, events) = Session::new(
            IpAddr::from([10, 9, 9, 9]),
            MessageProtocol::new(server, MessageCodec::new()),
            SessionTimers::default(),
        );
        assert!(matches!(
            controller.session_start(session, events).await,
            Err(ControllerError::UnknownPeer(_))
        ));
        assert!(controller.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_registries() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, true)).await.unwrap();
        assert_eq!(controller.clients().await, vec![IpAddr::from([10, 0, 0, 1])]);

        let (session, _wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        assert!(controller
            .session_by_loopback(Ipv4Addr::new(1, 1, 1, 1))
            .await
            .is_some());

        // Still open, nothing removed
        controller.session_end(session.addr()).await;
        assert_eq!(controller.sessions().await.len(), 1);

        session.close().await;
        controller.session_end(session.addr()).await;
        assert!(controller.sessions().await.is_empty());
        assert!(controller
            .session_by_loopback(Ipv4Addr::new(1, 1, 1, 1))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_full_mesh_dedup_by_name() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, true)).await.unwrap();
        controller.create_router(router("r3", 3, true)).await.unwrap();
        controller.learn_ls_paths(&line_topology()).await.unwrap();
        controller.topology().compute_paths().await;

        let (session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        controller.init_sr_lsps(&session).await;
        match next_initiate(&mut wire).await {
            Some(Message::Initiate(request)) => {
                assert_eq!(request.lsp.name.as_deref(), Some("LSP-1.1.1.1-3.3.3.3"));
                assert_eq!(request.ero.map(|ero| ero.len()), Some(2));
            }
            other => panic!("Expected PCInitiate, got {:?}", other),
        }
        assert_eq!(controller.controller_lsps().await.len(), 1);

        // Router reports it active
        wire.send(active_report("LSP-1.1.1.1-3.3.3.3", 1))
            .await
            .unwrap();
        while session.get_lsp("LSP-1.1.1.1-3.3.3.3").await.is_none() {
            sleep(Duration::from_millis(5)).await;
        }

        // Same topology again, nothing new goes out
        controller.topology().compute_paths().await;
        controller.init_sr_lsps(&session).await;
        assert!(next_initiate(&mut wire).await.is_none());
        assert_eq!(controller.controller_lsps().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_path_is_not_provisioned() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, true)).await.unwrap();
        controller.create_router(router("r4", 4, true)).await.unwrap();
        controller.learn_ls_paths(&line_topology()).await.unwrap();
        controller.topology().compute_paths().await;

        let (session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        controller.init_sr_lsps(&session).await;
        assert!(next_initiate(&mut wire).await.is_none());
        assert!(controller.controller_lsps().await.is_empty());
    }

    #[tokio::test]
    async fn test_stuck_session_does_not_block_provisioning() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        controller.create_router(router("r2", 2, false)).await.unwrap();
        controller
            .create_lsp(intended_lsp("LSP-R1", Ipv4Addr::new(1, 1, 1, 1)))
            .await
            .unwrap();

        // Router stops reading once the session is up
        let (session, _wire) = up_session_over(
            &controller,
            IpAddr::from([10, 0, 0, 1]),
            64,
            SessionTimers::default(),
        )
        .await;
        let stuck = controller.clone();
        let blocked = session.clone();
        tokio::spawn(async move { stuck.init_sr_lsps(&blocked).await });
        sleep(Duration::from_millis(50)).await;

        let other = intended_lsp("LSP-R2", Ipv4Addr::new(2, 2, 2, 2));
        let created = timeout(Duration::from_secs(3), controller.create_lsp(other)).await;
        assert!(matches!(created, Ok(Ok(()))));
        assert_eq!(controller.controller_lsps().await.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatcher_provisions_on_ready() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, true)).await.unwrap();
        controller.create_router(router("r3", 3, true)).await.unwrap();
        controller.learn_ls_paths(&line_topology()).await.unwrap();
        let dispatcher = controller.clone();
        tokio::spawn(async move { dispatcher.run().await });

        let (_session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        let message = timeout(Duration::from_secs(2), wire.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(message, Message::Initiate(_)));
    }
}
