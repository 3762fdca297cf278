use log::info;
use uuid::Uuid;

use super::{Controller, ControllerError};
use crate::models::Router;
use crate::store::{put_record, ROUTERS};

impl Controller {
    /// Registered routers, by name
    pub async fn routers(&self) -> Vec<Router> {
        let mut routers = self.routers.values().await;
        routers.sort_by(|a, b| a.name.cmp(&b.name));
        routers
    }

    pub async fn get_router(&self, id: &Uuid) -> Option<Router> {
        self.routers.get(id).await
    }

    /// Register a router under a freshly assigned ID
    pub async fn create_router(&self, mut router: Router) -> Result<Router, ControllerError> {
        router.id = Some(Uuid::new_v4());
        self.save_router(router).await
    }

    /// Replace an existing router, the ID must already be registered
    pub async fn update_router(&self, router: Router) -> Result<Router, ControllerError> {
        let id = router
            .id
            .ok_or_else(|| ControllerError::Invalid("Router update needs an ID".to_string()))?;
        if self.routers.get(&id).await.is_none() {
            return Err(ControllerError::NotFound(format!("Router {}", id)));
        }
        self.save_router(router).await
    }

    async fn save_router(&self, router: Router) -> Result<Router, ControllerError> {
        let id = router
            .id
            .ok_or_else(|| ControllerError::Invalid("Router has no ID".to_string()))?;
        if router.name.is_empty() {
            return Err(ControllerError::Invalid("Router name is empty".to_string()));
        }
        let addr = router.pcep_session_addr;
        if let Some(other) = self
            .find_router(|r| r.pcep_session_addr == addr && r.id != Some(id))
            .await
        {
            return Err(ControllerError::Invalid(format!(
                "{} already uses PCEP address {}",
                other.name, addr
            )));
        }
        put_record(self.store.as_ref(), ROUTERS, &id.to_string(), &router)?;
        self.routers.put(id, router.clone()).await;
        info!("Saved {}", router);
        Ok(router)
    }

    pub async fn delete_router(&self, id: &Uuid) -> Result<(), ControllerError> {
        let router = self
            .routers
            .get(id)
            .await
            .ok_or_else(|| ControllerError::NotFound(format!("Router {}", id)))?;
        self.store.delete(ROUTERS, &id.to_string())?;
        self.routers.delete(id).await;
        info!("Deleted {}", router);
        Ok(())
    }
}
