use log::{debug, info, warn};

use super::{Controller, ControllerError, PhaseErrors};
use crate::models::SrLsp;
use crate::store::{put_record, LSPS};

impl Controller {
    /// Controller intended LSPs, by name
    pub async fn controller_lsps(&self) -> Vec<SrLsp> {
        let mut lsps = self.lsps.values().await;
        lsps.sort_by(|a, b| a.name.cmp(&b.name));
        lsps
    }

    pub async fn get_lsp(&self, name: &str) -> Option<SrLsp> {
        self.lsps.get(&name.to_string()).await
    }

    pub async fn create_lsp(&self, lsp: SrLsp) -> Result<(), ControllerError> {
        lsp.validate()?;
        if self.lsps.get(&lsp.name).await.is_some() {
            return Err(ControllerError::Invalid(format!(
                "LSP {} already exists",
                lsp.name
            )));
        }
        self.save_lsp(lsp).await
    }

    pub async fn update_lsp(&self, lsp: SrLsp) -> Result<(), ControllerError> {
        lsp.validate()?;
        if self.lsps.get(&lsp.name).await.is_none() {
            return Err(ControllerError::NotFound(format!("LSP {}", lsp.name)));
        }
        self.save_lsp(lsp).await
    }

    /// Push to the source router's session (if connected), then write the
    /// store, then the registry. The registry only follows a successful write.
    ///
    /// Only the store and registry update runs under the provisioning lock.
    async fn save_lsp(&self, lsp: SrLsp) -> Result<(), ControllerError> {
        let mut errors = PhaseErrors::default();
        match self.sessions_by_loopback.get(&lsp.src).await {
            Some(session) => {
                if let Err(err) = session.init_sr_lsp(&lsp).await {
                    warn!("Could not initiate {}: {}", lsp.name, err);
                    errors.session = Some(err);
                }
            }
            None => debug!(
                "{}, {} is pushed once it connects",
                ControllerError::NoSession(lsp.src),
                lsp.name
            ),
        }
        let _provisioning = self.provisioning.lock().await;
        match put_record(self.store.as_ref(), LSPS, &lsp.name, &lsp) {
            Ok(()) => {
                info!("Saved {}", lsp);
                self.lsps.put(lsp.name.clone(), lsp).await;
            }
            Err(err) => {
                warn!("Could not store {}: {}", lsp.name, err);
                errors.store = Some(err);
            }
        }
        errors.into_result()
    }

    /// Ask the source router to remove the LSP (if connected), then drop it
    /// from the store and the registry
    pub async fn delete_lsp(&self, name: &str) -> Result<(), ControllerError> {
        let lsp = self
            .get_lsp(name)
            .await
            .ok_or_else(|| ControllerError::NotFound(format!("LSP {}", name)))?;
        let mut errors = PhaseErrors::default();
        if let Some(session) = self.sessions_by_loopback.get(&lsp.src).await {
            if let Err(err) = session.remove_lsp(&lsp).await {
                warn!("Could not remove {} from {}: {}", name, lsp.src, err);
                errors.session = Some(err);
            }
        }
        let _provisioning = self.provisioning.lock().await;
        match self.store.delete(LSPS, name) {
            Ok(()) => {
                info!("Deleted LSP {}", name);
                self.lsps.delete(&lsp.name).await;
            }
            Err(err) => {
                warn!("Could not delete {} from the store: {}", name, err);
                errors.store = Some(err);
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use serde_json::Value;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::config::ServerConfig;
    use crate::controller::tests::{
        active_report, controller, intended_lsp, router, up_session, up_session_over,
    };
    use crate::pcep::Message;
    use crate::session::{SessionError, SessionState, SessionTimers};
    use crate::store::{Store, StoreError};

    fn lsp(name: &str) -> SrLsp {
        intended_lsp(name, Ipv4Addr::new(1, 1, 1, 1))
    }

    /// Reads work, every write fails
    struct ReadOnlyStore;

    impl Store for ReadOnlyStore {
        fn put(&self, _: &str, _: &str, _: Value) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn get(&self, _: &str, _: &str) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }
        fn for_each(&self, _: &str) -> Result<Vec<(String, Value)>, StoreError> {
            Ok(vec![])
        }
        fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_create_without_session() {
        let controller = controller().await;
        controller.create_lsp(lsp("LSP-A")).await.unwrap();
        assert_eq!(controller.controller_lsps().await, vec![lsp("LSP-A")]);
        assert!(matches!(
            controller.create_lsp(lsp("LSP-A")).await,
            Err(ControllerError::Invalid(_))
        ));
        assert!(matches!(
            controller.update_lsp(lsp("LSP-B")).await,
            Err(ControllerError::NotFound(_))
        ));
        let mut bad = lsp("LSP-C");
        bad.setup_priority = 9;
        assert!(matches!(
            controller.create_lsp(bad).await,
            Err(ControllerError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_create_pushes_to_session() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        let (_session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;

        controller.create_lsp(lsp("LSP-A")).await.unwrap();
        match timeout(Duration::from_secs(1), wire.next()).await {
            Ok(Some(Ok(Message::Initiate(request)))) => {
                assert_eq!(request.lsp.name.as_deref(), Some("LSP-A"));
                assert!(!request.srp.remove);
            }
            other => panic!("Expected PCInitiate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        let (session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        controller.create_lsp(lsp("LSP-A")).await.unwrap();
        assert!(matches!(wire.next().await, Some(Ok(Message::Initiate(_)))));

        wire.send(active_report("LSP-A", 9)).await.unwrap();
        while session.get_lsp("LSP-A").await.is_none() {
            sleep(Duration::from_millis(5)).await;
        }
        controller.delete_lsp("LSP-A").await.unwrap();
        match wire.next().await {
            Some(Ok(Message::Initiate(request))) => {
                assert!(request.srp.remove);
                assert_eq!(request.lsp.plsp_id, 9);
            }
            other => panic!("Expected PCInitiate, got {:?}", other),
        }
        assert!(controller.controller_lsps().await.is_empty());
        assert!(matches!(
            controller.delete_lsp("LSP-A").await,
            Err(ControllerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unreported_still_removes_from_store() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        let (_session, mut wire) = up_session(&controller, IpAddr::from([10, 0, 0, 1])).await;
        controller.create_lsp(lsp("LSP-A")).await.unwrap();
        assert!(matches!(wire.next().await, Some(Ok(Message::Initiate(_)))));

        match controller.delete_lsp("LSP-A").await {
            Err(ControllerError::Phases(errors)) => {
                assert!(errors.session.is_some());
                assert!(errors.store.is_none());
            }
            other => panic!("Expected a session phase error, got {:?}", other),
        }
        assert!(controller.controller_lsps().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_registry() {
        let controller = Controller::new(ServerConfig::default(), Arc::new(ReadOnlyStore))
            .await
            .unwrap();
        match controller.create_lsp(lsp("LSP-A")).await {
            Err(ControllerError::Phases(errors)) => {
                assert!(errors.session.is_none());
                assert!(errors.store.is_some());
            }
            other => panic!("Expected a store phase error, got {:?}", other),
        }
        assert!(controller.controller_lsps().await.is_empty());
    }

    #[tokio::test]
    async fn test_stuck_router_does_not_block_other_lsps() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        controller.create_router(router("r2", 2, false)).await.unwrap();
        // r1 is up but never reads again, its PCInitiate cannot be written
        let (_session, _wire) = up_session_over(
            &controller,
            IpAddr::from([10, 0, 0, 1]),
            64,
            SessionTimers::default(),
        )
        .await;
        let stuck = controller.clone();
        tokio::spawn(async move { stuck.create_lsp(lsp("LSP-R1")).await });
        sleep(Duration::from_millis(50)).await;

        let unrelated = intended_lsp("LSP-R2", Ipv4Addr::new(2, 2, 2, 2));
        let created = timeout(Duration::from_secs(3), controller.create_lsp(unrelated)).await;
        assert!(matches!(created, Ok(Ok(()))));
        assert!(controller.get_lsp("LSP-R2").await.is_some());
    }

    #[tokio::test]
    async fn test_write_timeout_closes_session() {
        let controller = controller().await;
        controller.create_router(router("r1", 1, false)).await.unwrap();
        let timers = SessionTimers {
            write_timeout: 1,
            ..Default::default()
        };
        let (session, _wire) =
            up_session_over(&controller, IpAddr::from([10, 0, 0, 1]), 64, timers).await;

        match controller.create_lsp(lsp("LSP-R1")).await {
            Err(ControllerError::Phases(errors)) => {
                assert!(matches!(errors.session, Some(SessionError::WriteTimeout(1))));
                assert!(errors.store.is_none());
            }
            other => panic!("Expected a session phase error, got {:?}", other),
        }
        // Stored anyway, pushed again once the router reconnects
        assert!(controller.get_lsp("LSP-R1").await.is_some());
        timeout(Duration::from_secs(1), async {
            while session.state().await != SessionState::Closed {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
