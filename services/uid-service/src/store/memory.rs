//! In-process store.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uid_core::{State, SurrogateKey};
use uuid::Uuid;

use super::{DbError, SearchRequest, Store};
use crate::model::{Claim, Page, Reference, ReferenceKind, Surrogate, Window};

/// Keeps everything in memory. Writes are serialized by the lock, so the
/// active-key check and the insert happen atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    surrogates: Vec<Surrogate>,
    references: BTreeMap<(ReferenceKind, String), Reference>,
    claims: BTreeSet<Claim>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, window: Window) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(window.count).unwrap_or(usize::MAX))
        .collect();
    Page {
        items,
        total,
        start_index: window.start_index,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn find_surrogate(&self, key: &SurrogateKey) -> Result<Option<Surrogate>, DbError> {
        let inner = self.inner.read().await;
        let found = inner
            .surrogates
            .iter()
            .filter(|s| s.key() == *key)
            .max_by_key(|s| (s.state.is_active(), s.updated_at))
            .cloned();
        Ok(found)
    }

    async fn insert_surrogate(&self, surrogate: &Surrogate) -> Result<(), DbError> {
        let mut inner = self.inner.write().await;
        let key = surrogate.key();
        let taken = surrogate.state.is_active()
            && inner
                .surrogates
                .iter()
                .any(|s| s.state.is_active() && s.key() == key);
        if taken {
            return Err(DbError::UniqueViolation(
                "surrogates_active_key_idx".to_string(),
            ));
        }
        inner.surrogates.push(surrogate.clone());
        Ok(())
    }

    async fn deactivate_surrogate(
        &self,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        let Some(surrogate) = inner
            .surrogates
            .iter_mut()
            .find(|s| s.id == id && s.state.is_active())
        else {
            return Ok(false);
        };
        surrogate.state = State::Inactive;
        surrogate.updated_by = actor.to_string();
        surrogate.updated_at = at;
        Ok(true)
    }

    async fn search_surrogates(&self, request: &SearchRequest) -> Result<Page<Surrogate>, DbError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Surrogate> = inner
            .surrogates
            .iter()
            .filter(|s| request.tenants.contains(&s.tenant()))
            .filter(|s| request.filter.as_ref().is_none_or(|f| f.matches(*s)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            (a.key(), a.created_at).cmp(&(b.key(), b.created_at))
        });
        Ok(paginate(matches, request.window))
    }

    async fn reference_exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .references
            .get(&(kind, id.to_string()))
            .is_some_and(|r| r.active))
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        id: &str,
    ) -> Result<Option<Reference>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner.references.get(&(kind, id.to_string())).cloned())
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
        window: Window,
    ) -> Result<Page<Reference>, DbError> {
        let inner = self.inner.read().await;
        let items = inner
            .references
            .range((kind, String::new())..)
            .take_while(|((k, _), _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect();
        Ok(paginate(items, window))
    }

    async fn insert_reference(&self, reference: &Reference) -> Result<(), DbError> {
        let mut inner = self.inner.write().await;
        let key = (reference.kind, reference.id.clone());
        if inner.references.contains_key(&key) {
            return Err(DbError::UniqueViolation(format!(
                "{}_pkey",
                reference.kind.table()
            )));
        }
        inner.references.insert(key, reference.clone());
        Ok(())
    }

    async fn update_reference(&self, reference: &Reference) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        match inner
            .references
            .get_mut(&(reference.kind, reference.id.clone()))
        {
            Some(existing) => {
                *existing = reference.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_reference(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        let removed = inner.references.remove(&(kind, id.to_string())).is_some();
        if removed && kind == ReferenceKind::Tenant {
            inner.claims.retain(|c| c.tenant != id);
        }
        Ok(removed)
    }

    async fn claims_for_principal(&self, principal: &str) -> Result<Vec<Claim>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .claims
            .iter()
            .filter(|c| c.principal == principal)
            .cloned()
            .collect())
    }

    async fn claims_for_tenant(&self, tenant: &str) -> Result<Vec<Claim>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .claims
            .iter()
            .filter(|c| c.tenant == tenant)
            .cloned()
            .collect())
    }

    async fn grant_claim(&self, claim: &Claim) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        Ok(inner.claims.insert(claim.clone()))
    }

    async fn revoke_claim(&self, claim: &Claim) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        Ok(inner.claims.remove(claim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use crate::model::ClaimRole;
    use uid_core::slice;

    fn surrogate(id: &str, state: State) -> Surrogate {
        Surrogate::new(slice(id).unwrap(), state, "alice")
    }

    fn window(start_index: u64, count: u64) -> Window {
        Window { start_index, count }
    }

    #[tokio::test]
    async fn test_insert_rejects_second_active_key() {
        let store = MemoryStore::new();
        store
            .insert_surrogate(&surrogate("A-36-0-P1-101-EXT12345", State::Generated))
            .await
            .unwrap();

        let err = store
            .insert_surrogate(&surrogate("A-36-0-P1-101-EXT12345", State::Registered))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_key_is_reusable_after_deactivation() {
        let store = MemoryStore::new();
        let first = surrogate("A-36-0-P1-101-EXT12345", State::Generated);
        store.insert_surrogate(&first).await.unwrap();
        assert!(store
            .deactivate_surrogate(first.id, "bob", Utc::now())
            .await
            .unwrap());

        let second = surrogate("A-36-0-P1-101-EXT12345", State::Registered);
        store.insert_surrogate(&second).await.unwrap();

        let found = store.find_surrogate(&first.key()).await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn test_deactivate_is_one_way() {
        let store = MemoryStore::new();
        let s = surrogate("A-36-0-P1-101-EXT12345", State::Generated);
        store.insert_surrogate(&s).await.unwrap();

        assert!(store.deactivate_surrogate(s.id, "bob", Utc::now()).await.unwrap());
        assert!(!store.deactivate_surrogate(s.id, "bob", Utc::now()).await.unwrap());

        let found = store.find_surrogate(&s.key()).await.unwrap().unwrap();
        assert_eq!(found.state, State::Inactive);
        assert_eq!(found.updated_by, "bob");
    }

    #[tokio::test]
    async fn test_search_scopes_filters_and_pages() {
        let store = MemoryStore::new();
        for id in [
            "A-36-0-P1-101-EXT00001",
            "A-36-0-P1-101-EXT00002",
            "A-36-0-P1-102-EXT00003",
            "B-49-1-P2-101-EXT00004",
        ] {
            store
                .insert_surrogate(&surrogate(id, State::Generated))
                .await
                .unwrap();
        }

        let request = SearchRequest {
            tenants: vec!["A-36-0-P1".to_string()],
            filter: Some(parse_filter(r#"tid eq "101""#).unwrap()),
            window: window(2, 10),
        };
        let page = store.search_surrogates(&request).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].segments.eid, "EXT00002");
    }

    #[tokio::test]
    async fn test_references_and_claims() {
        let store = MemoryStore::new();
        let tenant = Reference {
            kind: ReferenceKind::Tenant,
            id: "A-36-0-P1".to_string(),
            name: "Acme".to_string(),
            active: true,
        };
        let country = Reference {
            kind: ReferenceKind::Country,
            id: "36".to_string(),
            name: "Hungary".to_string(),
            active: false,
        };
        store.insert_reference(&tenant).await.unwrap();
        store.insert_reference(&country).await.unwrap();
        assert!(matches!(
            store.insert_reference(&tenant).await,
            Err(DbError::UniqueViolation(_))
        ));

        assert!(store.reference_exists(ReferenceKind::Tenant, "A-36-0-P1").await.unwrap());
        assert!(!store.reference_exists(ReferenceKind::Country, "36").await.unwrap());

        let tenants = store
            .list_references(ReferenceKind::Tenant, window(1, 10))
            .await
            .unwrap();
        assert_eq!(tenants.total, 1);

        let claim = Claim {
            tenant: "A-36-0-P1".to_string(),
            principal: "alice".to_string(),
            role: ClaimRole::Generate,
        };
        assert!(store.grant_claim(&claim).await.unwrap());
        assert!(!store.grant_claim(&claim).await.unwrap());
        assert_eq!(store.claims_for_principal("alice").await.unwrap(), vec![claim.clone()]);

        assert!(store
            .delete_reference(ReferenceKind::Tenant, "A-36-0-P1")
            .await
            .unwrap());
        assert!(store.claims_for_tenant("A-36-0-P1").await.unwrap().is_empty());
    }
}
