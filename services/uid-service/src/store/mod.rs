//! Persistence for Surrogates, reference entities and tenant claims.
//!
//! Two backends implement [`Store`]:
//! - [`Database`]: Postgres through SQLx, with runtime migrations
//! - [`MemoryStore`]: process-local maps behind a `tokio` lock, for dev mode
//!   and tests
//!
//! Uniqueness of active Surrogates is enforced by the backend; a rejected
//! write surfaces as [`DbError::UniqueViolation`].

mod error;
mod memory;
mod postgres;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::Database;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uid_core::SurrogateKey;
use uuid::Uuid;

use crate::filter::Filter;
use crate::model::{Claim, Page, Reference, ReferenceKind, Surrogate, Window};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/uid".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.min_connections);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..Self::default()
        }
    }
}

/// A Surrogate search, already scoped to the tenants the caller may read.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Only Surrogates of these tenants are returned. Must not be empty.
    pub tenants: Vec<String>,
    /// Additional, already checked, filter.
    pub filter: Option<Filter>,
    pub window: Window,
}

/// Storage operations used by the service layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<(), DbError>;

    /// Finds the Surrogate for `key`, preferring the active row over
    /// deactivated ones.
    async fn find_surrogate(&self, key: &SurrogateKey) -> Result<Option<Surrogate>, DbError>;

    /// Inserts a new Surrogate. Fails with `UniqueViolation` if an active
    /// Surrogate already holds the key.
    async fn insert_surrogate(&self, surrogate: &Surrogate) -> Result<(), DbError>;

    /// Moves an active Surrogate to the inactive state. Returns false if the
    /// row was already inactive or does not exist.
    async fn deactivate_surrogate(
        &self,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    async fn search_surrogates(&self, request: &SearchRequest) -> Result<Page<Surrogate>, DbError>;

    /// True if an active reference of `kind` with `id` exists.
    async fn reference_exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError>;

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        id: &str,
    ) -> Result<Option<Reference>, DbError>;

    async fn list_references(
        &self,
        kind: ReferenceKind,
        window: Window,
    ) -> Result<Page<Reference>, DbError>;

    /// Fails with `UniqueViolation` if the id is taken.
    async fn insert_reference(&self, reference: &Reference) -> Result<(), DbError>;

    /// Returns false if no such reference exists.
    async fn update_reference(&self, reference: &Reference) -> Result<bool, DbError>;

    /// Removes a reference. Deleting a tenant also drops its claims.
    async fn delete_reference(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError>;

    async fn claims_for_principal(&self, principal: &str) -> Result<Vec<Claim>, DbError>;

    async fn claims_for_tenant(&self, tenant: &str) -> Result<Vec<Claim>, DbError>;

    /// Returns false if the claim was already granted.
    async fn grant_claim(&self, claim: &Claim) -> Result<bool, DbError>;

    /// Returns false if there was nothing to revoke.
    async fn revoke_claim(&self, claim: &Claim) -> Result<bool, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.database_url, "postgres://localhost/uid");
    }
}
