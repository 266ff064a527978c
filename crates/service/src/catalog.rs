use async_trait::async_trait;
use model::request::{ServiceRequest, Validate};
use model::{Principal, Role, Service, ServiceDraft};
use repository::ServicesRepository;
use tracing::{info, instrument};

use crate::{ServiceError, require_owner, require_role};

/// Services that organizers publish and customers browse.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_services(&self, keyword: Option<String>) -> Result<Vec<Service>, ServiceError>;

    async fn find_service(&self, id: i64) -> Result<Service, ServiceError>;

    async fn create_service(
        &self,
        principal: Principal,
        request: ServiceRequest,
    ) -> Result<Service, ServiceError>;

    async fn update_service(
        &self,
        principal: Principal,
        id: i64,
        request: ServiceRequest,
    ) -> Result<Service, ServiceError>;

    async fn delete_service(&self, principal: Principal, id: i64) -> Result<(), ServiceError>;
}

pub struct CatalogServiceImpl<S> {
    services: S,
}

impl<S> CatalogServiceImpl<S>
where
    S: ServicesRepository,
{
    pub fn new(services: S) -> Self {
        Self { services }
    }

    /// Loads a service and checks that `principal` owns it.
    async fn owned_service(&self, principal: &Principal, id: i64) -> Result<Service, ServiceError> {
        let service = self.find_service(id).await?;
        require_owner(principal, service.user_id)?;
        Ok(service)
    }
}

fn draft(request: ServiceRequest, is_published: bool) -> ServiceDraft {
    ServiceDraft {
        name: request.name,
        cost: request.cost,
        phone: request.phone,
        email: request.email,
        description: request.description,
        is_published: request.is_published.unwrap_or(is_published),
    }
}

#[async_trait]
impl<S> CatalogService for CatalogServiceImpl<S>
where
    S: ServicesRepository,
{
    async fn list_services(&self, keyword: Option<String>) -> Result<Vec<Service>, ServiceError> {
        Ok(self.services.list(keyword.as_deref()).await?)
    }

    async fn find_service(&self, id: i64) -> Result<Service, ServiceError> {
        self.services
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))
    }

    #[instrument(skip(self, request))]
    async fn create_service(
        &self,
        principal: Principal,
        request: ServiceRequest,
    ) -> Result<Service, ServiceError> {
        require_role(&principal, Role::Organizer)?;
        request.validate()?;

        let service = self
            .services
            .insert(principal.user_id, &draft(request, true))
            .await?;
        info!(service_id = service.id, "service created");
        Ok(service)
    }

    #[instrument(skip(self, request))]
    async fn update_service(
        &self,
        principal: Principal,
        id: i64,
        request: ServiceRequest,
    ) -> Result<Service, ServiceError> {
        let current = self.owned_service(&principal, id).await?;
        request.validate()?;

        Ok(self
            .services
            .update(id, &draft(request, current.is_published))
            .await?)
    }

    #[instrument(skip(self))]
    async fn delete_service(&self, principal: Principal, id: i64) -> Result<(), ServiceError> {
        self.owned_service(&principal, id).await?;
        if !self.services.delete(id).await? {
            return Err(ServiceError::not_found("service"));
        }
        info!(service_id = id, "service deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDb, service};

    const ORGANIZER: Principal = Principal {
        user_id: 2,
        role: Role::Organizer,
    };

    fn request() -> ServiceRequest {
        ServiceRequest {
            name: "Wedding band".into(),
            cost: 500_000.0,
            phone: "0812".into(),
            email: "band@example.com".into(),
            description: "live music".into(),
            is_published: None,
        }
    }

    #[tokio::test]
    async fn test_create_service_defaults_to_published() {
        let catalog = CatalogServiceImpl::new(FakeDb::default());
        let created = catalog.create_service(ORGANIZER, request()).await.unwrap();
        assert!(created.is_published);
        assert_eq!(created.user_id, 2);

        let listed = catalog.list_services(Some("MUSIC".into())).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(catalog.list_services(Some("catering".into())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_customers_cannot_create_services() {
        let catalog = CatalogServiceImpl::new(FakeDb::default());
        let err = catalog
            .create_service(Principal::new(1, Role::Customer), request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_only_owner_may_modify() {
        let db = FakeDb::default().with_service(service(10, 3, 100.0));
        let catalog = CatalogServiceImpl::new(db.clone());

        let err = catalog.delete_service(ORGANIZER, 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
        let err = catalog.update_service(ORGANIZER, 10, request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));

        let owner = Principal::new(3, Role::Organizer);
        let updated = catalog.update_service(owner, 10, request()).await.unwrap();
        assert_eq!(updated.name, "Wedding band");
        catalog.delete_service(owner, 10).await.unwrap();
        assert!(db.is_service_deleted(10));

        let err = catalog.find_service(10).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(m) if m == "service not found"));
    }
}
