//! Postgres backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;
use uid_core::{Segments, State, SurrogateKey};
use uuid::Uuid;

use super::{DbConfig, DbError, SearchRequest, Store};
use crate::filter::sql::push_filter;
use crate::model::{Claim, ClaimRole, Page, Reference, ReferenceKind, Surrogate, Window};

const SURROGATE_COLUMNS: &str =
    "id, ptt, cid, sid, pts, tid, eid, state, created_by, created_at, updated_by, updated_at";

impl<'r> sqlx::FromRow<'r, PgRow> for Surrogate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let state: String = row.try_get("state")?;
        let state = state
            .parse::<State>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.try_get("id")?,
            segments: Segments {
                ptt: row.try_get("ptt")?,
                cid: row.try_get("cid")?,
                sid: row.try_get("sid")?,
                pts: row.try_get("pts")?,
                tid: row.try_get("tid")?,
                eid: row.try_get("eid")?,
            },
            state,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Reference columns; the kind comes from the table queried.
struct ReferenceRow {
    id: String,
    name: String,
    active: bool,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ReferenceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            active: row.try_get("active")?,
        })
    }
}

impl ReferenceRow {
    fn into_reference(self, kind: ReferenceKind) -> Reference {
        Reference {
            kind,
            id: self.id,
            name: self.name,
            active: self.active,
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Claim {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role
            .parse::<ClaimRole>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            tenant: row.try_get("tenant")?,
            principal: row.try_get("principal")?,
            role,
        })
    }
}

fn bind_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the first migrations directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        let candidates = [
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/uid-service/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn push_search_conditions(builder: &mut QueryBuilder<'_, Postgres>, request: &SearchRequest) {
        builder
            .push(" WHERE tenant = ANY(")
            .push_bind(request.tenants.clone())
            .push(")");
        if let Some(filter) = &request.filter {
            builder.push(" AND ");
            push_filter(builder, filter);
        }
    }
}

#[async_trait]
impl Store for Database {
    async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    async fn find_surrogate(&self, key: &SurrogateKey) -> Result<Option<Surrogate>, DbError> {
        let sql = format!(
            r#"
            SELECT {SURROGATE_COLUMNS}
            FROM surrogates
            WHERE tenant = $1 AND tid = $2 AND eid = $3
            ORDER BY (state <> '0') DESC, updated_at DESC
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, Surrogate>(&sql)
            .bind(key.tenant())
            .bind(key.tid())
            .bind(key.eid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    async fn insert_surrogate(&self, surrogate: &Surrogate) -> Result<(), DbError> {
        let s = &surrogate.segments;
        sqlx::query(
            r#"
            INSERT INTO surrogates (
                id, tenant, ptt, cid, sid, pts, tid, eid, state,
                created_by, created_at, updated_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(surrogate.id)
        .bind(surrogate.tenant())
        .bind(&s.ptt)
        .bind(&s.cid)
        .bind(&s.sid)
        .bind(&s.pts)
        .bind(&s.tid)
        .bind(&s.eid)
        .bind(surrogate.state.code())
        .bind(&surrogate.created_by)
        .bind(surrogate.created_at)
        .bind(&surrogate.updated_by)
        .bind(surrogate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::query)?;
        Ok(())
    }

    async fn deactivate_surrogate(
        &self,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE surrogates
            SET state = $4, updated_by = $2, updated_at = $3
            WHERE id = $1 AND state <> $4
            "#,
        )
        .bind(id)
        .bind(actor)
        .bind(at)
        .bind(State::Inactive.code())
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;
        Ok(result.rows_affected() == 1)
    }

    async fn search_surrogates(&self, request: &SearchRequest) -> Result<Page<Surrogate>, DbError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM surrogates");
        Self::push_search_conditions(&mut count, request);
        let matched: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SURROGATE_COLUMNS} FROM surrogates"
        ));
        Self::push_search_conditions(&mut select, request);
        select
            .push(" ORDER BY tenant, tid, eid, created_at LIMIT ")
            .push_bind(bind_count(request.window.count))
            .push(" OFFSET ")
            .push_bind(bind_count(request.window.offset()));
        let items = select
            .build_query_as::<Surrogate>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(Page {
            items,
            total: total(matched),
            start_index: request.window.start_index,
        })
    }

    async fn reference_exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND active)",
            kind.table()
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        id: &str,
    ) -> Result<Option<Reference>, DbError> {
        let sql = format!("SELECT id, name, active FROM {} WHERE id = $1", kind.table());
        let row = sqlx::query_as::<_, ReferenceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(row.map(|r| r.into_reference(kind)))
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
        window: Window,
    ) -> Result<Page<Reference>, DbError> {
        let count_sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let matched: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let sql = format!(
            "SELECT id, name, active FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            kind.table()
        );
        let rows = sqlx::query_as::<_, ReferenceRow>(&sql)
            .bind(bind_count(window.count))
            .bind(bind_count(window.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(Page {
            items: rows.into_iter().map(|r| r.into_reference(kind)).collect(),
            total: total(matched),
            start_index: window.start_index,
        })
    }

    async fn insert_reference(&self, reference: &Reference) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (id, name, active) VALUES ($1, $2, $3)",
            reference.kind.table()
        );
        sqlx::query(&sql)
            .bind(&reference.id)
            .bind(&reference.name)
            .bind(reference.active)
            .execute(&self.pool)
            .await
            .map_err(DbError::query)?;
        Ok(())
    }

    async fn update_reference(&self, reference: &Reference) -> Result<bool, DbError> {
        let sql = format!(
            "UPDATE {} SET name = $2, active = $3, updated_at = now() WHERE id = $1",
            reference.kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(&reference.id)
            .bind(&reference.name)
            .bind(reference.active)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_reference(&self, kind: ReferenceKind, id: &str) -> Result<bool, DbError> {
        // tenant_claims rows go with their tenant via ON DELETE CASCADE
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(result.rows_affected() == 1)
    }

    async fn claims_for_principal(&self, principal: &str) -> Result<Vec<Claim>, DbError> {
        sqlx::query_as::<_, Claim>(
            r#"
            SELECT tenant, principal, role
            FROM tenant_claims
            WHERE principal = $1
            ORDER BY tenant, role
            "#,
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn claims_for_tenant(&self, tenant: &str) -> Result<Vec<Claim>, DbError> {
        sqlx::query_as::<_, Claim>(
            r#"
            SELECT tenant, principal, role
            FROM tenant_claims
            WHERE tenant = $1
            ORDER BY principal, role
            "#,
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn grant_claim(&self, claim: &Claim) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_claims (tenant, principal, role)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&claim.tenant)
        .bind(&claim.principal)
        .bind(claim.role.label())
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_claim(&self, claim: &Claim) -> Result<bool, DbError> {
        let result = sqlx::query(
            "DELETE FROM tenant_claims WHERE tenant = $1 AND principal = $2 AND role = $3",
        )
        .bind(&claim.tenant)
        .bind(&claim.principal)
        .bind(claim.role.label())
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;
        Ok(result.rows_affected() == 1)
    }
}
