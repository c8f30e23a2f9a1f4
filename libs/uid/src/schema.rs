//! Segment definitions and per-segment validation.

use crate::SchemaError;

/// Minimum length of a full Surrogate identifier.
pub const MIN_LENGTH: usize = 15;

/// Maximum length of a full Surrogate identifier.
pub const MAX_LENGTH: usize = 36;

/// Segment separator.
pub const SEPARATOR: char = '-';

/// JSON key carrying a full identifier in request and response bodies.
pub const UID: &str = "uid";

/// Name reported for tenant-level failures.
pub const TENANT: &str = "tenant";

/// Character class a segment must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `^[0-9]+$`
    Digit,
    /// `^[0-9A-Za-z]+$`
    Alnum,
}

impl Charset {
    /// Returns true if every character of `value` belongs to this class.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Charset::Digit => value.bytes().all(|b| b.is_ascii_digit()),
            Charset::Alnum => value.bytes().all(|b| b.is_ascii_alphanumeric()),
        }
    }
}

/// Positional definition of one Surrogate segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Short key used on the wire (`ptt`, `cid`, ...).
    pub json: &'static str,
    /// Descriptive name of the referenced entity.
    pub name: &'static str,
    /// Position within the dashed identifier.
    pub index: usize,
    pub minimum: usize,
    pub maximum: usize,
    pub charset: Charset,
}

impl Segment {
    pub const PTT: Segment = Segment::new("ptt", "participantType", 0, 1, 1, Charset::Alnum);
    pub const CID: Segment = Segment::new("cid", "country", 1, 1, 3, Charset::Digit);
    pub const SID: Segment = Segment::new("sid", "state", 2, 1, 2, Charset::Digit);
    pub const PTS: Segment = Segment::new("pts", "participant", 3, 2, 11, Charset::Alnum);
    pub const TID: Segment = Segment::new("tid", "type", 4, 3, 3, Charset::Digit);
    pub const EID: Segment = Segment::new("eid", "externalId", 5, 5, 11, Charset::Alnum);

    /// All segments in identifier order.
    pub const ALL: [Segment; 6] = [
        Segment::PTT,
        Segment::CID,
        Segment::SID,
        Segment::PTS,
        Segment::TID,
        Segment::EID,
    ];

    const fn new(
        json: &'static str,
        name: &'static str,
        index: usize,
        minimum: usize,
        maximum: usize,
        charset: Charset,
    ) -> Self {
        Self {
            json,
            name,
            index,
            minimum,
            maximum,
            charset,
        }
    }

    /// Validates a single segment value.
    ///
    /// Checks presence, then length, then character class, and reports the
    /// first violation.
    pub fn validate(&self, value: Option<&str>) -> Result<(), SchemaError> {
        let Some(value) = value else {
            return Err(SchemaError::ArgumentIsNull { segment: self.json });
        };

        // lengths are in characters, so a non-ASCII value in range is a bad value
        if !(self.minimum..=self.maximum).contains(&value.chars().count()) {
            return Err(SchemaError::ArgumentLengthMismatch { segment: self.json });
        }

        if !self.charset.matches(value) {
            return Err(SchemaError::ArgumentBadValue { segment: self.json });
        }

        Ok(())
    }
}

pub fn validate_participant_type(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::PTT.validate(value)
}

pub fn validate_country(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::CID.validate(value)
}

pub fn validate_state(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::SID.validate(value)
}

pub fn validate_participant(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::PTS.validate(value)
}

pub fn validate_account_type(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::TID.validate(value)
}

pub fn validate_external_id(value: Option<&str>) -> Result<(), SchemaError> {
    Segment::EID.validate(value)
}

/// Validates the overall length of a full identifier before it is sliced.
pub fn validate_identifier_length(value: &str) -> Result<(), SchemaError> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&value.chars().count()) {
        return Err(SchemaError::ArgumentLengthMismatch { segment: UID });
    }
    Ok(())
}

/// Validates a four-segment tenant string (`ptt-cid-sid-pts`).
pub fn validate_tenant(value: &str) -> Result<(), SchemaError> {
    let parts: Vec<&str> = value.splitn(4, SEPARATOR).collect();
    if parts.len() != 4 {
        return Err(SchemaError::SegmentCount {
            segment: TENANT,
            expected: 4,
            actual: parts.len(),
        });
    }

    for (segment, part) in Segment::ALL.iter().zip(parts) {
        segment.validate(Some(part))?;
    }
    Ok(())
}

/// Requires a non-blank value, e.g. the display name of a reference entity.
pub fn validate_required(name: &'static str, value: Option<&str>) -> Result<(), SchemaError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(SchemaError::ArgumentIsNull { segment: name }),
    }
}
