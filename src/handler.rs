use std::io;
use std::net::IpAddr;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use crate::controller::{Controller, ControllerError};
use crate::pcep::{MessageCodec, MessageProtocol};
use crate::session::Session;

/// PCEP listener plus the handle the JSON-RPC API works against
#[derive(Clone)]
pub struct Server {
    pub(crate) controller: Controller,
}

impl Server {
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Start the controller dispatcher and accept PCEP connections until the
    /// listener fails
    pub async fn serve(&self) -> io::Result<()> {
        let socket = self.controller.config().listen_socket();
        let listener = TcpListener::bind(socket).await?;
        info!("Listening for PCEP sessions on {}", socket);

        let controller = self.controller.clone();
        tokio::spawn(async move { controller.run().await });

        loop {
            let (stream, remote) = listener.accept().await?;
            debug!("Incoming connection from {}", remote);
            if let Err(err) = self.handle_new_connection(stream, remote.ip()).await {
                warn!("Dropped connection from {}: {}", remote, err);
            }
        }
    }

    /// Start a session for a known router and run it in the background
    ///
    /// Connections from addresses no router claims are dropped untouched.
    pub async fn handle_new_connection<T>(
        &self,
        stream: T,
        addr: IpAddr,
    ) -> Result<(), ControllerError>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        if !self.controller.clients().await.contains(&addr) {
            return Err(ControllerError::UnknownPeer(addr));
        }
        let (session, events) = Session::new(
            addr,
            MessageProtocol::new(stream, MessageCodec::new()),
            self.controller.config().timers,
        );
        if let Err(err) = self.controller.session_start(session.clone(), events).await {
            session.close().await;
            return Err(err);
        }
        let controller = self.controller.clone();
        tokio::spawn(async move {
            if let Err(err) = session.run().await {
                warn!("Session with {} ended: {}", addr, err);
            }
            session.close().await;
            controller.session_end(addr).await;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::time::sleep;

    use super::*;
    use crate::controller::tests::{controller, router};
    use crate::pcep::{Message, OpenObject};
    use crate::session::SessionState;

    #[tokio::test]
    async fn test_unknown_peer_is_dropped() {
        let server = Server::new(controller().await);
        let (_client, stream) = tokio::io::duplex(64);
        assert!(matches!(
            server
                .handle_new_connection(stream, IpAddr::from([10, 9, 9, 9]))
                .await,
            Err(ControllerError::UnknownPeer(_))
        ));
        assert!(server.controller().sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        let server = Server::new(controller.clone());
        let addr = IpAddr::from([10, 0, 0, 1]);

        let (client, stream) = tokio::io::duplex(8192);
        server.handle_new_connection(stream, addr).await.unwrap();
        let mut wire = MessageProtocol::new(client, MessageCodec::new());
        wire.send(Message::Open(OpenObject::local(30, 120, 1)))
            .await
            .unwrap();
        assert!(matches!(wire.next().await, Some(Ok(Message::Open(_)))));
        assert_eq!(wire.next().await.unwrap().unwrap(), Message::Keepalive);
        wire.send(Message::Keepalive).await.unwrap();

        let session = controller.sessions().await.pop().unwrap();
        while session.state().await != SessionState::Up {
            sleep(Duration::from_millis(5)).await;
        }

        // A second connection while the first is up is refused
        let (_other, stream) = tokio::io::duplex(64);
        assert!(matches!(
            server.handle_new_connection(stream, addr).await,
            Err(ControllerError::Invalid(_))
        ));

        // Router hangs up, the session is forgotten
        drop(wire);
        while !controller.sessions().await.is_empty() {
            sleep(Duration::from_millis(5)).await;
        }
        assert!(controller
            .session_by_loopback("1.1.1.1".parse().unwrap())
            .await
            .is_none());
    }
}
