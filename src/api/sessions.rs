use super::rpc::SessionSummary;
use crate::models::Router;
use crate::session::Session;
use crate::utils::format_time_as_elapsed;

pub(super) async fn session_to_summary(session: &Session, router: Option<Router>) -> SessionSummary {
    let counts = session.counts().await;
    let peer_open = session.peer_open().await;
    SessionSummary {
        addr: session.addr(),
        router: router.map(|r| r.name),
        state: session.state().await.to_string(),
        connect_time: session.connect_time().timestamp(),
        uptime: format_time_as_elapsed(session.connect_time()),
        msg_received: counts.received(),
        msg_sent: counts.sent(),
        last_received: counts.last_received().map(format_time_as_elapsed),
        last_sent: counts.last_sent().map(format_time_as_elapsed),
        keepalive: peer_open.as_ref().map(|open| open.keepalive),
        dead_timer: peer_open.as_ref().map(|open| open.dead_timer),
        lsps: session.lsps().await.len(),
    }
}
