use std::fmt;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::timeout;

use super::report::LspReport;
use super::timers::{send_keepalives, watch_dead_timer};
use super::{MessageCounts, SessionError, SessionEvent, SessionState, SessionTimers};
use crate::models::SrLsp;
use crate::pcep::{
    next_srp_id, CloseObject, Message, MessageProtocol, Object, ObjectHeader, OpenObject,
    PcepError,
};
use crate::registry::Registry;
use crate::utils::format_time_as_elapsed;

/// Bound on any write made while tearing a session down
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type MessageSink = Pin<Box<dyn Sink<Message, Error = PcepError> + Send>>;
type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, PcepError>> + Send>>;

/// A `Session` is one PCEP peer connection: the read loop plus the
/// keepalive and dead timer tasks it starts once the OPEN arrives
///
/// Cheap to clone; the controller and API hold handles while `run()` drives it.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    addr: IpAddr,
    connect_time: DateTime<Utc>,
    timers: SessionTimers,
    state: RwLock<SessionState>,
    peer_open: RwLock<Option<OpenObject>>,
    counts: Mutex<MessageCounts>,
    // Router reported LSPs, by name and PLSP-ID -> name
    lsps: Registry<String, LspReport>,
    plsp_names: Registry<u32, String>,
    srp_id: Mutex<u32>,
    sink: Mutex<MessageSink>,
    stream: Mutex<Option<MessageStream>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    liveness: Mutex<Option<mpsc::UnboundedSender<()>>>,
}

impl Session {
    /// Build a new session over a framed PCEP transport
    pub fn new<T>(
        addr: IpAddr,
        protocol: MessageProtocol<T>,
        timers: SessionTimers,
    ) -> (Session, mpsc::UnboundedReceiver<SessionEvent>)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (sink, stream) = protocol.split::<Message>();
        let (events, events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let session = Session {
            inner: Arc::new(Inner {
                addr,
                connect_time: Utc::now(),
                timers,
                state: RwLock::new(SessionState::Idle),
                peer_open: RwLock::new(None),
                counts: Mutex::new(MessageCounts::new()),
                lsps: Registry::new(),
                plsp_names: Registry::new(),
                srp_id: Mutex::new(0),
                sink: Mutex::new(Box::pin(sink)),
                stream: Mutex::new(Some(Box::pin(stream))),
                events,
                stop_tx,
                stop_rx,
                liveness: Mutex::new(None),
            }),
        };
        (session, events_rx)
    }

    pub fn addr(&self) -> IpAddr {
        self.inner.addr
    }

    pub fn connect_time(&self) -> DateTime<Utc> {
        self.inner.connect_time
    }

    pub async fn state(&self) -> SessionState {
        *self.inner.state.read().await
    }

    /// OPEN received from the peer, once the session got that far
    pub async fn peer_open(&self) -> Option<OpenObject> {
        self.inner.peer_open.read().await.clone()
    }

    pub async fn counts(&self) -> MessageCounts {
        self.inner.counts.lock().await.clone()
    }

    pub async fn lsps(&self) -> Vec<LspReport> {
        self.inner.lsps.values().await
    }

    pub async fn get_lsp(&self, name: &str) -> Option<LspReport> {
        self.inner.lsps.get(&name.to_string()).await
    }

    async fn update_state(&self, new_state: SessionState) -> SessionState {
        let mut state = self.inner.state.write().await;
        let old_state = *state;
        if old_state != new_state {
            debug!("{} went from {} to {}", self.addr(), old_state, new_state);
        }
        *state = new_state;
        old_state
    }

    /// Move to `to` only if currently in `from`, true when the move happened
    async fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.inner.state.write().await;
        if *state != from {
            return false;
        }
        debug!("{} went from {} to {}", self.addr(), from, to);
        *state = to;
        true
    }

    /// Main loop for the session, processes messages in the order received
    /// until the peer goes away or the session is closed
    pub async fn run(&self) -> Result<(), SessionError> {
        let mut stream = self.inner.stream.lock().await.take().ok_or_else(|| {
            SessionError::Other(format!("Session with {} is already running", self.addr()))
        })?;
        let mut stop = self.inner.stop_rx.clone();
        let result = loop {
            let stopped = *stop.borrow();
            if stopped {
                break Ok(());
            }
            tokio::select! {
                message = stream.next() => match message {
                    // Framed stream is exhausted, remote side closed connection
                    None => {
                        break Err(SessionError::TransportError(format!(
                            "Session ended with {}",
                            self.addr()
                        )));
                    }
                    Some(Ok(message)) => {
                        trace!("[{}] Incoming: {}", self.addr(), message);
                        self.inner.counts.lock().await.increment_received();
                        self.feed_liveness().await;
                        if let Err(err) = self.process_message(message).await {
                            warn!("[{}] {}", self.addr(), err);
                        }
                    }
                    // Stream can no longer be framed
                    Some(Err(err)) => break Err(SessionError::from(err)),
                },
                _ = stop.changed() => (),
            }
        };
        self.close().await;
        result
    }

    async fn process_message(&self, message: Message) -> Result<(), SessionError> {
        match message {
            Message::Open(open) => self.receive_open(open).await,
            Message::Keepalive => {
                if self.transition(SessionState::OpenSent, SessionState::Up).await {
                    info!("Session with {} is up", self.addr());
                    let _ = self.inner.events.send(SessionEvent::Ready);
                }
                Ok(())
            }
            Message::Error(objects) => {
                log_errors(self.addr(), &objects);
                Ok(())
            }
            Message::Close(close) => {
                info!(
                    "[{}] Received CLOSE [reason={}]",
                    self.addr(),
                    close.reason
                );
                self.close().await;
                Ok(())
            }
            Message::Report(objects) => {
                for report in LspReport::from_objects(objects) {
                    self.upsert_report(report).await;
                }
                Ok(())
            }
            Message::Initiate(_) => {
                warn!("[{}] Unexpected PCInitiate from a PCC", self.addr());
                Ok(())
            }
            Message::Unrecognized(kind, _) => {
                info!("[{}] Ignoring {} message", self.addr(), kind);
                Ok(())
            }
            Message::Malformed(kind, err) => {
                warn!("[{}] Dropped malformed {} message: {}", self.addr(), kind, err);
                Ok(())
            }
        }
    }

    /// Record the peer OPEN and reply from a separate task so the read loop keeps going
    async fn receive_open(&self, open: OpenObject) -> Result<(), SessionError> {
        if !self
            .transition(SessionState::Idle, SessionState::OpenSent)
            .await
        {
            return Err(SessionError::Other(format!(
                "Unexpected OPEN while {}",
                self.state().await
            )));
        }
        debug!(
            "[{}] Received OPEN [sid={} keepalive={} dead_timer={}]",
            self.addr(),
            open.session_id,
            open.keepalive,
            open.dead_timer
        );
        *self.inner.peer_open.write().await = Some(open.clone());
        let session = self.clone();
        tokio::spawn(async move {
            if let Err(err) = session.establish(open).await {
                warn!("[{}] Could not establish session: {}", session.addr(), err);
                session.close().await;
            }
        });
        Ok(())
    }

    /// Send our OPEN and start the keepalive + dead timer tasks
    async fn establish(&self, peer_open: OpenObject) -> Result<(), SessionError> {
        let timers = self.inner.timers;
        let local = OpenObject::local(timers.keepalive, timers.dead_timer, peer_open.session_id);
        self.send_message(Message::Open(local)).await?;

        let (liveness_tx, liveness_rx) = mpsc::unbounded_channel();
        *self.inner.liveness.lock().await = Some(liveness_tx);
        let dead_timer = match peer_open.dead_timer {
            0 => timers.dead_timer,
            peer => peer,
        };
        tokio::spawn(watch_dead_timer(
            self.clone(),
            dead_timer,
            liveness_rx,
            self.inner.stop_rx.clone(),
        ));
        // A zero keepalive means we never send them
        if timers.keepalive > 0 {
            tokio::spawn(send_keepalives(
                self.clone(),
                Duration::from_secs(timers.keepalive.into()),
                self.inner.stop_rx.clone(),
            ));
        }
        Ok(())
    }

    async fn feed_liveness(&self) {
        if let Some(liveness) = self.inner.liveness.lock().await.as_ref() {
            let _ = liveness.send(());
        }
    }

    async fn upsert_report(&self, mut report: LspReport) {
        if report.plsp_id == 0 && report.name.is_empty() {
            debug!("[{}] Skipping report with no PLSP-ID or name", self.addr());
            return;
        }
        if report.name.is_empty() {
            match self.inner.plsp_names.get(&report.plsp_id).await {
                Some(name) => report.name = name,
                None => {
                    warn!(
                        "[{}] Skipping report for unknown PLSP-ID {}",
                        self.addr(),
                        report.plsp_id
                    );
                    return;
                }
            }
        }
        if report.remove {
            debug!("[{}] LSP {} removed", self.addr(), report.name);
            self.inner.lsps.delete(&report.name).await;
            self.inner.plsp_names.delete(&report.plsp_id).await;
            return;
        }
        debug!(
            "[{}] LSP {} is {} [plsp_id={}]",
            self.addr(),
            report.name,
            report.oper,
            report.plsp_id
        );
        report.received_at = Some(Utc::now());
        if report.plsp_id != 0 {
            self.inner
                .plsp_names
                .put(report.plsp_id, report.name.clone())
                .await;
        }
        self.inner.lsps.put(report.name.clone(), report).await;
    }

    async fn next_srp_id(&self) -> u32 {
        let mut srp_id = self.inner.srp_id.lock().await;
        *srp_id = next_srp_id(*srp_id);
        *srp_id
    }

    async fn ensure_up(&self) -> Result<(), SessionError> {
        match self.state().await {
            SessionState::Up => Ok(()),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Ask the router to instantiate (or update) `lsp`
    pub async fn init_sr_lsp(&self, lsp: &SrLsp) -> Result<(), SessionError> {
        self.ensure_up().await?;
        lsp.validate()?;
        let srp_id = self.next_srp_id().await;
        debug!("[{}] Initiating {} [srp_id={}]", self.addr(), lsp, srp_id);
        self.send_message(Message::Initiate(lsp.to_initiate(srp_id)))
            .await
    }

    /// Ask the router to tear down `lsp`, found by name among reported LSPs
    pub async fn remove_lsp(&self, lsp: &SrLsp) -> Result<(), SessionError> {
        self.ensure_up().await?;
        let reported = self.get_lsp(&lsp.name).await.ok_or_else(|| {
            SessionError::Other(format!("{} has not reported LSP {}", self.addr(), lsp.name))
        })?;
        let srp_id = self.next_srp_id().await;
        debug!(
            "[{}] Removing {} [srp_id={} plsp_id={}]",
            self.addr(),
            lsp.name,
            srp_id,
            reported.plsp_id
        );
        self.send_message(Message::Initiate(lsp.to_removal(srp_id, reported.plsp_id)))
            .await
    }

    /// Send a message, flushing the transport afterwards
    ///
    /// Waiting for the sink and writing share the session write timeout. On
    /// expiry the session is closed from a separate task.
    pub async fn send_message(&self, message: Message) -> Result<(), SessionError> {
        trace!("[{}] Outgoing: {}", self.addr(), message);
        let write_timeout = self.inner.timers.write_timeout;
        let send = async {
            let mut sink = self.inner.sink.lock().await;
            sink.send(message).await
        };
        match timeout(Duration::from_secs(write_timeout.into()), send).await {
            Ok(sent) => sent?,
            Err(_) => {
                let err = SessionError::WriteTimeout(write_timeout);
                warn!("[{}] {}, closing session", self.addr(), err);
                let session = self.clone();
                tokio::spawn(async move { session.close().await });
                return Err(err);
            }
        }
        self.inner.counts.lock().await.increment_sent();
        Ok(())
    }

    /// Dead timer expiry: tell the peer why, then tear down
    pub(super) async fn expire(&self) {
        let close = Message::Close(CloseObject::new(CloseObject::REASON_DEAD_TIMER));
        match timeout(CLOSE_TIMEOUT, self.send_message(close)).await {
            Ok(Ok(())) => (),
            Ok(Err(err)) => warn!("[{}] CLOSE not sent: {}", self.addr(), err),
            Err(_) => warn!("[{}] CLOSE not sent: write timed out", self.addr()),
        }
        self.close().await;
    }

    /// Stop all session tasks and shut the transport, safe to call more than once
    pub async fn close(&self) {
        if self.update_state(SessionState::Closed).await == SessionState::Closed {
            return;
        }
        let _ = self.inner.stop_tx.send(true);
        self.inner.liveness.lock().await.take();
        let shutdown = async {
            let mut sink = self.inner.sink.lock().await;
            sink.close().await
        };
        match timeout(CLOSE_TIMEOUT, shutdown).await {
            Ok(Ok(())) => (),
            Ok(Err(err)) => debug!("[{}] Error closing transport: {}", self.addr(), err),
            Err(_) => warn!("[{}] Timed out closing transport", self.addr()),
        }
        info!("Session with {} closed", self.addr());
        let _ = self.inner.events.send(SessionEvent::Closed);
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Session {} uptime={}>",
            self.addr(),
            format_time_as_elapsed(self.connect_time()),
        )
    }
}

fn log_errors(addr: IpAddr, objects: &[(ObjectHeader, Object)]) {
    for (header, object) in objects {
        match object {
            Object::Error(error) => warn!(
                "[{}] PCErr type={} value={}: {}",
                addr, error.error_type, error.error_value, error.description
            ),
            _ => warn!(
                "[{}] PCErr carried class={:?} type={} flags=[P:{} I:{}] reserved={}",
                addr,
                header.class,
                header.object_type,
                header.processing,
                header.ignore,
                header.reserved
            ),
        }
    }
}
