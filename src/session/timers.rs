use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;

use super::{Session, SessionError};
use crate::pcep::Message;

/// Send a keepalive right away and then every `interval` until stopped
///
/// Stops quietly on the first failed write, the read loop owns teardown.
/// A write stuck on a peer that stopped reading is abandoned once stopped.
pub(super) async fn send_keepalives(
    session: Session,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let stopped = *stop.borrow();
        if stopped {
            break;
        }
        tokio::select! {
            _ = stop.changed() => break,
            sent = session.send_message(Message::Keepalive) => {
                if let Err(err) = sent {
                    warn!("[{}] Keepalive not sent: {}", session.addr(), err);
                    break;
                }
            }
        }
        tokio::select! {
            _ = stop.changed() => (),
            _ = sleep(interval) => (),
        }
    }
    debug!("[{}] Keepalive sender stopped", session.addr());
}

/// Expire the session if nothing arrives on `liveness` within `dead_timer` seconds
pub(super) async fn watch_dead_timer(
    session: Session,
    dead_timer: u8,
    mut liveness: mpsc::UnboundedReceiver<()>,
    mut stop: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(dead_timer.into());
    loop {
        let stopped = *stop.borrow();
        if stopped {
            break;
        }
        tokio::select! {
            _ = stop.changed() => (),
            signal = liveness.recv() => {
                if signal.is_none() {
                    break;
                }
            }
            _ = sleep(interval) => {
                warn!("[{}] {}", session.addr(), SessionError::DeadTimerExpired(dead_timer));
                session.expire().await;
                break;
            }
        }
    }
    debug!("[{}] Dead timer stopped", session.addr());
}
