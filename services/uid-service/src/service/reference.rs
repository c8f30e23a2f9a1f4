//! Administration of reference entities and tenant claims.

use tracing::info;
use uid_core::validate_required;

use super::ServiceError;
use crate::model::{Claim, ClaimRole, Page, Reference, ReferenceKind, Window};
use crate::store::Store;

pub struct ReferenceService<'a> {
    store: &'a dyn Store,
}

impl<'a> ReferenceService<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        kind: ReferenceKind,
        window: Window,
    ) -> Result<Page<Reference>, ServiceError> {
        Ok(self.store.list_references(kind, window).await?)
    }

    pub async fn get(&self, kind: ReferenceKind, id: &str) -> Result<Reference, ServiceError> {
        self.store
            .find_reference(kind, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(kind.name(), id))
    }

    pub async fn create(&self, reference: Reference) -> Result<Reference, ServiceError> {
        reference.kind.validate_id(&reference.id)?;
        validate_required("name", Some(reference.name.as_str()))?;

        self.store
            .insert_reference(&reference)
            .await
            .map_err(|e| {
                ServiceError::on_write(e, || {
                    format!("{} '{}' already exists", reference.kind.name(), reference.id)
                })
            })?;

        info!(kind = %reference.kind, id = %reference.id, "Reference created");
        Ok(reference)
    }

    pub async fn update(&self, reference: Reference) -> Result<Reference, ServiceError> {
        validate_required("name", Some(reference.name.as_str()))?;

        if !self.store.update_reference(&reference).await? {
            return Err(ServiceError::not_found(reference.kind.name(), reference.id));
        }
        Ok(reference)
    }

    pub async fn delete(&self, kind: ReferenceKind, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_reference(kind, id).await? {
            return Err(ServiceError::not_found(kind.name(), id));
        }
        info!(kind = %kind, id = %id, "Reference deleted");
        Ok(())
    }

    pub async fn claims(&self, tenant: &str) -> Result<Vec<Claim>, ServiceError> {
        self.get(ReferenceKind::Tenant, tenant).await?;
        Ok(self.store.claims_for_tenant(tenant).await?)
    }

    /// Grants `role` on `tenant` to `principal`. Returns false if the claim
    /// already existed.
    pub async fn grant(
        &self,
        tenant: &str,
        principal: &str,
        role: &str,
    ) -> Result<bool, ServiceError> {
        let claim = self.claim(tenant, principal, role)?;
        self.get(ReferenceKind::Tenant, tenant).await?;

        let granted = self.store.grant_claim(&claim).await?;
        if granted {
            info!(tenant = %tenant, principal = %principal, role = %claim.role, "Claim granted");
        }
        Ok(granted)
    }

    pub async fn revoke(
        &self,
        tenant: &str,
        principal: &str,
        role: &str,
    ) -> Result<(), ServiceError> {
        let claim = self.claim(tenant, principal, role)?;
        if !self.store.revoke_claim(&claim).await? {
            return Err(ServiceError::not_found(
                "claim",
                format!("{tenant}/{principal}/{role}"),
            ));
        }
        info!(tenant = %tenant, principal = %principal, role = %claim.role, "Claim revoked");
        Ok(())
    }

    fn claim(&self, tenant: &str, principal: &str, role: &str) -> Result<Claim, ServiceError> {
        validate_required("principal", Some(principal))?;
        Ok(Claim {
            tenant: tenant.to_string(),
            principal: principal.to_string(),
            role: role.parse::<ClaimRole>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use uid_core::SchemaError;

    fn reference(kind: ReferenceKind, id: &str) -> Reference {
        Reference {
            kind,
            id: id.to_string(),
            name: format!("{kind} {id}"),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_validates_id_against_segment() {
        let store = MemoryStore::new();
        let service = ReferenceService::new(&store);

        let err = service
            .create(reference(ReferenceKind::AccountType, "1O1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidValue(SchemaError::ArgumentBadValue { segment: "tid" })
        ));

        let err = service
            .create(reference(ReferenceKind::Tenant, "A-36"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn test_create_requires_name_and_unique_id() {
        let store = MemoryStore::new();
        let service = ReferenceService::new(&store);

        let mut blank = reference(ReferenceKind::Country, "36");
        blank.name = "  ".to_string();
        assert!(matches!(
            service.create(blank).await,
            Err(ServiceError::InvalidValue(SchemaError::ArgumentIsNull { segment: "name" }))
        ));

        service
            .create(reference(ReferenceKind::Country, "36"))
            .await
            .unwrap();
        assert!(matches!(
            service.create(reference(ReferenceKind::Country, "36")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let store = MemoryStore::new();
        let service = ReferenceService::new(&store);

        assert!(matches!(
            service.update(reference(ReferenceKind::State, "0")).await,
            Err(ServiceError::NotFound {
                resource: "state",
                ..
            })
        ));
        assert!(matches!(
            service.delete(ReferenceKind::State, "0").await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_claim_lifecycle() {
        let store = MemoryStore::new();
        let service = ReferenceService::new(&store);

        assert!(matches!(
            service.grant("A-36-0-P1", "alice", "generate").await,
            Err(ServiceError::NotFound {
                resource: "tenant",
                ..
            })
        ));

        service
            .create(reference(ReferenceKind::Tenant, "A-36-0-P1"))
            .await
            .unwrap();
        assert!(service.grant("A-36-0-P1", "alice", "generate").await.unwrap());
        assert!(!service.grant("A-36-0-P1", "alice", "generate").await.unwrap());
        assert!(matches!(
            service.grant("A-36-0-P1", "alice", "viewer").await,
            Err(ServiceError::InvalidValue(_))
        ));

        assert_eq!(service.claims("A-36-0-P1").await.unwrap().len(), 1);
        service
            .revoke("A-36-0-P1", "alice", "generate")
            .await
            .unwrap();
        assert!(matches!(
            service.revoke("A-36-0-P1", "alice", "generate").await,
            Err(ServiceError::NotFound {
                resource: "claim",
                ..
            })
        ));
    }
}
