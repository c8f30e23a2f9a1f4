//! Surrogate lifecycle: list, lookup, generate, register, delete.
//!
//! ```text
//! (none) --generate--> GENERATED  --delete--> 0
//! (none) --register--> REGISTERED --delete--> 0
//! ```
//!
//! Every operation is scoped by the caller's tenant claims. Validation
//! happens before any storage access, and the active-key uniqueness check is
//! left to the store so that concurrent creates cannot both succeed.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uid_core::{slice, validate_identifier_length, SchemaError, Segment, Segments, State, UID};

use super::{Permissions, ServiceError};
use crate::filter::{parse_filter, scope};
use crate::generator::ExternalIdGenerator;
use crate::model::{Page, ReferenceKind, Surrogate, Window};
use crate::store::{SearchRequest, Store};

/// Segments supplied to generate. `eid` is synthesized when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Draft {
    pub ptt: Option<String>,
    pub cid: Option<String>,
    pub sid: Option<String>,
    pub pts: Option<String>,
    pub tid: Option<String>,
    pub eid: Option<String>,
}

pub struct SurrogateService<'a> {
    store: &'a dyn Store,
    generator: &'a dyn ExternalIdGenerator,
    principal: &'a str,
}

impl<'a> SurrogateService<'a> {
    pub fn new(
        store: &'a dyn Store,
        generator: &'a dyn ExternalIdGenerator,
        principal: &'a str,
    ) -> Self {
        Self {
            store,
            generator,
            principal,
        }
    }

    async fn permissions(&self) -> Result<Permissions, ServiceError> {
        Ok(Permissions::load(self.store, self.principal).await?)
    }

    /// Lists Surrogates of the tenants the caller may read, optionally
    /// narrowed by a filter.
    pub async fn list(
        &self,
        filter: Option<&str>,
        window: Window,
    ) -> Result<Page<Surrogate>, ServiceError> {
        let tenants = self.permissions().await?.tenants();
        if tenants.is_empty() {
            return Ok(Page::empty(window.start_index));
        }

        let filter = match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(input) => {
                let filter =
                    parse_filter(input).map_err(|e| ServiceError::InvalidFilter(e.to_string()))?;
                scope::check(&filter, &tenants).map_err(|e| {
                    if e.is_forbidden() {
                        ServiceError::Forbidden(e.to_string())
                    } else {
                        ServiceError::InvalidFilter(e.to_string())
                    }
                })?;
                Some(filter)
            }
            None => None,
        };

        let request = SearchRequest {
            tenants: tenants.into_iter().collect(),
            filter,
            window,
        };
        Ok(self.store.search_surrogates(&request).await?)
    }

    /// Fetches one Surrogate, whatever its state.
    pub async fn lookup(&self, uid: &str) -> Result<Surrogate, ServiceError> {
        let segments = slice_identifier(uid)?;
        let tenant = segments.tenant();

        if !self.permissions().await?.permitted(&tenant, false, false) {
            return Err(forbidden(&tenant));
        }

        self.store
            .find_surrogate(&segments.key())
            .await?
            .ok_or_else(|| ServiceError::not_found(UID, uid))
    }

    /// Creates a `GENERATED` Surrogate, synthesizing the external id if the
    /// draft carries none.
    pub async fn generate(&self, draft: Draft) -> Result<Surrogate, ServiceError> {
        let ptt = segment(&Segment::PTT, draft.ptt)?;
        let cid = segment(&Segment::CID, draft.cid)?;
        let sid = segment(&Segment::SID, draft.sid)?;
        let pts = segment(&Segment::PTS, draft.pts)?;
        let tid = segment(&Segment::TID, draft.tid)?;
        let supplied = match draft.eid {
            Some(eid) => Some(segment(&Segment::EID, Some(eid))?),
            None => None,
        };

        let mut segments = Segments {
            ptt,
            cid,
            sid,
            pts,
            tid,
            eid: String::new(),
        };
        self.check_references(&segments).await?;

        let tenant = segments.tenant();
        if !self.permissions().await?.permitted(&tenant, true, false) {
            return Err(forbidden(&tenant));
        }

        segments.eid = supplied.unwrap_or_else(|| self.generator.generate());
        self.create(segments, State::Generated).await
    }

    /// Creates a `REGISTERED` Surrogate from a caller-supplied identifier.
    pub async fn register(&self, uid: Option<&str>) -> Result<Surrogate, ServiceError> {
        let uid = uid.ok_or(SchemaError::ArgumentIsNull { segment: UID })?;
        let segments = slice_identifier(uid)?;
        segments.validate_all()?;
        self.check_references(&segments).await?;

        let tenant = segments.tenant();
        if !self.permissions().await?.permitted(&tenant, false, true) {
            return Err(forbidden(&tenant));
        }

        self.create(segments, State::Registered).await
    }

    /// Soft deletes a Surrogate. Inactive Surrogates are never touched again.
    pub async fn delete(&self, uid: &str) -> Result<(), ServiceError> {
        let segments = slice_identifier(uid)?;
        let tenant = segments.tenant();

        if !self.permissions().await?.permitted(&tenant, true, true) {
            return Err(forbidden(&tenant));
        }

        let surrogate = self
            .store
            .find_surrogate(&segments.key())
            .await?
            .ok_or_else(|| ServiceError::not_found(UID, uid))?;

        if !surrogate.state.can_transition_to(State::Inactive) {
            return Err(inactive(uid));
        }

        let deactivated = self
            .store
            .deactivate_surrogate(surrogate.id, self.principal, Utc::now())
            .await?;
        if !deactivated {
            // lost a race with a concurrent delete
            return Err(inactive(uid));
        }

        info!(uid = %uid, tenant = %tenant, principal = %self.principal, "Surrogate deactivated");
        Ok(())
    }

    async fn check_references(&self, segments: &Segments) -> Result<(), ServiceError> {
        let tenant = segments.tenant();
        let references = [
            (ReferenceKind::ParticipantType, segments.ptt.as_str()),
            (ReferenceKind::Country, segments.cid.as_str()),
            (ReferenceKind::State, segments.sid.as_str()),
            (ReferenceKind::Participant, segments.pts.as_str()),
            (ReferenceKind::AccountType, segments.tid.as_str()),
            (ReferenceKind::Tenant, tenant.as_str()),
        ];

        for (kind, id) in references {
            if !self.store.reference_exists(kind, id).await? {
                return Err(ServiceError::not_found(kind.name(), id));
            }
        }
        Ok(())
    }

    async fn create(&self, segments: Segments, state: State) -> Result<Surrogate, ServiceError> {
        let surrogate = Surrogate::new(segments, state, self.principal);
        let key = surrogate.key();

        self.store
            .insert_surrogate(&surrogate)
            .await
            .map_err(|e| ServiceError::on_write(e, || format!("uid '{key}' already exists")))?;

        info!(
            uid = %key,
            state = %state,
            principal = %self.principal,
            "Surrogate created"
        );
        Ok(surrogate)
    }
}

/// Checks the overall length, then splits into segments.
fn slice_identifier(uid: &str) -> Result<Segments, SchemaError> {
    validate_identifier_length(uid)?;
    slice(uid)
}

fn segment(segment: &Segment, value: Option<String>) -> Result<String, SchemaError> {
    segment.validate(value.as_deref())?;
    Ok(value.unwrap_or_default())
}

fn forbidden(tenant: &str) -> ServiceError {
    ServiceError::Forbidden(format!("tenant '{tenant}' is not permitted"))
}

fn inactive(uid: &str) -> ServiceError {
    ServiceError::Mutability(format!("uid '{uid}' is inactive"))
}
