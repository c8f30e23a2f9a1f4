//! Domain records persisted by the service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uid_core::{validate_tenant, SchemaError, Segment, Segments, State, SurrogateKey};
use uuid::Uuid;

use crate::filter::{Field, Resolve};

/// A persisted Surrogate.
///
/// Several rows may share a key as long as at most one of them is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surrogate {
    pub id: Uuid,
    pub segments: Segments,
    pub state: State,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Surrogate {
    /// A fresh record created by `actor` now.
    pub fn new(segments: Segments, state: State, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            segments,
            state,
            created_by: actor.to_string(),
            created_at: now,
            updated_by: actor.to_string(),
            updated_at: now,
        }
    }

    pub fn tenant(&self) -> String {
        self.segments.tenant()
    }

    pub fn key(&self) -> SurrogateKey {
        self.segments.key()
    }
}

impl Resolve for Surrogate {
    fn resolve(&self, field: Field) -> Option<String> {
        let s = &self.segments;
        let value = match field {
            Field::Uid => self.key().to_string(),
            Field::Tenant => s.tenant(),
            Field::Ptt => s.ptt.clone(),
            Field::Cid => s.cid.clone(),
            Field::Sid => s.sid.clone(),
            Field::Pts => s.pts.clone(),
            Field::Tid => s.tid.clone(),
            Field::Eid => s.eid.clone(),
            Field::State => self.state.code().to_string(),
        };
        Some(value)
    }
}

/// Kinds of reference entity a Surrogate segment must resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceKind {
    ParticipantType,
    Country,
    State,
    Participant,
    AccountType,
    Tenant,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::ParticipantType,
        ReferenceKind::Country,
        ReferenceKind::State,
        ReferenceKind::Participant,
        ReferenceKind::AccountType,
        ReferenceKind::Tenant,
    ];

    /// URL path segment under `/v1`.
    pub const fn path(&self) -> &'static str {
        match self {
            ReferenceKind::ParticipantType => "participant-type",
            ReferenceKind::Country => "country",
            ReferenceKind::State => "state",
            ReferenceKind::Participant => "participant",
            ReferenceKind::AccountType => "type",
            ReferenceKind::Tenant => "tenant",
        }
    }

    /// Name used in not-found errors.
    pub fn name(&self) -> &'static str {
        self.segment().map_or(uid_core::TENANT, |segment| segment.name)
    }

    /// Backing table.
    pub const fn table(&self) -> &'static str {
        match self {
            ReferenceKind::ParticipantType => "participant_types",
            ReferenceKind::Country => "countries",
            ReferenceKind::State => "states",
            ReferenceKind::Participant => "participants",
            ReferenceKind::AccountType => "account_types",
            ReferenceKind::Tenant => "tenants",
        }
    }

    /// The Surrogate segment whose values this kind enumerates.
    pub const fn segment(&self) -> Option<Segment> {
        match self {
            ReferenceKind::ParticipantType => Some(Segment::PTT),
            ReferenceKind::Country => Some(Segment::CID),
            ReferenceKind::State => Some(Segment::SID),
            ReferenceKind::Participant => Some(Segment::PTS),
            ReferenceKind::AccountType => Some(Segment::TID),
            ReferenceKind::Tenant => None,
        }
    }

    /// Validates a reference id with the rule of the matching segment.
    pub fn validate_id(&self, id: &str) -> Result<(), SchemaError> {
        match self.segment() {
            Some(segment) => segment.validate(Some(id)),
            None => validate_tenant(id),
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A reference entity. Inactive references do not satisfy referential
/// checks on new Surrogates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: String,
    pub name: String,
    pub active: bool,
}

/// Role granted by a tenant claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClaimRole {
    Generate,
    Register,
}

impl ClaimRole {
    pub const fn label(&self) -> &'static str {
        match self {
            ClaimRole::Generate => "generate",
            ClaimRole::Register => "register",
        }
    }
}

impl fmt::Display for ClaimRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClaimRole {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(ClaimRole::Generate),
            "register" => Ok(ClaimRole::Register),
            _ => Err(SchemaError::ArgumentBadValue { segment: "role" }),
        }
    }
}

/// Grant of a tenant to a principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Claim {
    pub tenant: String,
    pub principal: String,
    pub role: ClaimRole,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches across all pages.
    pub total: u64,
    /// 1-based index of the first item.
    pub start_index: u64,
}

impl<T> Page<T> {
    pub fn empty(start_index: u64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            start_index,
        }
    }
}

/// Page window for listings, 1-based like SCIM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start_index: u64,
    pub count: u64,
}

impl Window {
    pub fn offset(&self) -> u64 {
        self.start_index.saturating_sub(1)
    }
}
