//! Composition and slicing of full identifiers.

use std::fmt;
use std::str::FromStr;

use crate::schema::{validate_identifier_length, Segment, SEPARATOR, UID};
use crate::SchemaError;

/// Formats the four tenant segments as `ptt-cid-sid-pts`.
pub fn tenant(ptt: &str, cid: &str, sid: &str, pts: &str) -> String {
    format!("{ptt}-{cid}-{sid}-{pts}")
}

/// Splits an identifier into its six positional segments.
///
/// The string is split on `-` at most five times, so any surplus separator
/// stays in the external id and is reported against `eid` by validation.
/// Fewer than six parts is an error. Segment contents are not validated here.
pub fn slice(value: &str) -> Result<Segments, SchemaError> {
    let mut parts = value.splitn(Segment::ALL.len(), SEPARATOR);
    let mut next = || parts.next().map(str::to_string);

    match (next(), next(), next(), next(), next(), next()) {
        (Some(ptt), Some(cid), Some(sid), Some(pts), Some(tid), Some(eid)) => Ok(Segments {
            ptt,
            cid,
            sid,
            pts,
            tid,
            eid,
        }),
        _ => Err(SchemaError::SegmentCount {
            segment: UID,
            expected: Segment::ALL.len(),
            actual: value.split(SEPARATOR).count(),
        }),
    }
}

/// The six positional segments of a Surrogate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segments {
    pub ptt: String,
    pub cid: String,
    pub sid: String,
    pub pts: String,
    pub tid: String,
    pub eid: String,
}

impl Segments {
    /// Returns the tenant identifier formed by the first four segments.
    pub fn tenant(&self) -> String {
        tenant(&self.ptt, &self.cid, &self.sid, &self.pts)
    }

    /// Returns the segment value at the position described by `segment`.
    pub fn get(&self, segment: &Segment) -> &str {
        match segment.index {
            0 => &self.ptt,
            1 => &self.cid,
            2 => &self.sid,
            3 => &self.pts,
            4 => &self.tid,
            _ => &self.eid,
        }
    }

    /// Validates participant type, country, state, participant and account
    /// type in that order. The external id is left to the caller.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for segment in &Segment::ALL[..5] {
            segment.validate(Some(self.get(segment)))?;
        }
        Ok(())
    }

    /// Validates all six segments, including the external id.
    pub fn validate_all(&self) -> Result<(), SchemaError> {
        self.validate()?;
        Segment::EID.validate(Some(&self.eid))
    }

    /// Builds the composite key.
    pub fn key(&self) -> SurrogateKey {
        SurrogateKey::compose(self.tenant(), &self.tid, &self.eid)
    }
}

impl fmt::Display for Segments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{}",
            self.ptt, self.cid, self.sid, self.pts, self.tid, self.eid
        )
    }
}

/// A composed Surrogate key: tenant, account type and external id.
///
/// The string form is `{tenant}-{tid}-{eid}`. Parsing enforces the overall
/// length bounds and validates every segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurrogateKey {
    tenant: String,
    tid: String,
    eid: String,
}

impl SurrogateKey {
    /// Composes a key from a tenant, account type and external id.
    #[must_use]
    pub fn compose(tenant: impl Into<String>, tid: impl Into<String>, eid: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            tid: tid.into(),
            eid: eid.into(),
        }
    }

    /// Parses and fully validates an identifier.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        if s.is_empty() {
            return Err(SchemaError::ArgumentIsNull { segment: UID });
        }
        validate_identifier_length(s)?;
        let segments = slice(s)?;
        segments.validate_all()?;
        Ok(segments.key())
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn tid(&self) -> &str {
        &self.tid
    }

    pub fn eid(&self) -> &str {
        &self.eid
    }
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.tenant, self.tid, self.eid)
    }
}

impl FromStr for SurrogateKey {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for SurrogateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for SurrogateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Segments {
        Segments {
            ptt: "A".to_string(),
            cid: "36".to_string(),
            sid: "0".to_string(),
            pts: "P1".to_string(),
            tid: "101".to_string(),
            eid: "EXT12345".to_string(),
        }
    }

    #[test]
    fn test_compose_sample() {
        let segments = sample();
        assert_eq!(segments.tenant(), "A-36-0-P1");
        assert_eq!(segments.key().to_string(), "A-36-0-P1-101-EXT12345");
        assert_eq!(slice("A-36-0-P1-101-EXT12345").unwrap(), segments);
    }

    #[test]
    fn test_slice_too_few_segments() {
        let result = slice("A-36-0-P1-101");
        assert!(matches!(
            result,
            Err(SchemaError::SegmentCount {
                expected: 6,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_slice_keeps_surplus_separators_in_eid() {
        let segments = slice("A-36-0-P1-101-EXT-12345").unwrap();
        assert_eq!(segments.eid, "EXT-12345");
        assert_eq!(
            segments.validate_all(),
            Err(SchemaError::ArgumentBadValue { segment: "eid" })
        );
    }

    #[test]
    fn test_validate_stops_at_first_failure() {
        let mut segments = sample();
        segments.cid = "ABC".to_string();
        segments.tid = "1".to_string();
        assert_eq!(
            segments.validate(),
            Err(SchemaError::ArgumentBadValue { segment: "cid" })
        );
    }

    #[test]
    fn test_validate_ignores_eid() {
        let mut segments = sample();
        segments.eid = "x".to_string();
        assert!(segments.validate().is_ok());
        assert!(segments.validate_all().is_err());
    }

    #[test]
    fn test_parse_rejects_length() {
        assert_eq!(
            SurrogateKey::parse("A-1-0-P1-101-E"),
            Err(SchemaError::ArgumentLengthMismatch { segment: "uid" })
        );
        assert_eq!(
            SurrogateKey::parse(""),
            Err(SchemaError::ArgumentIsNull { segment: "uid" })
        );
    }

    #[test]
    fn test_key_json_roundtrip() {
        let key = sample().key();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"A-36-0-P1-101-EXT12345\"");
        let parsed: SurrogateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_key_json_rejects_invalid() {
        let result: Result<SurrogateKey, _> = serde_json::from_str("\"A-36-0-P1-101-EXT-1234\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_slice_inverts_compose(
            ptt in "[0-9A-Za-z]",
            cid in "[0-9]{1,3}",
            sid in "[0-9]{1,2}",
            pts in "[0-9A-Za-z]{2,11}",
            tid in "[0-9]{3}",
            eid in "[0-9A-Za-z]{5,11}",
        ) {
            let segments = Segments { ptt, cid, sid, pts, tid, eid };
            prop_assert!(segments.validate_all().is_ok());

            let id = segments.key().to_string();
            prop_assert_eq!(slice(&id).unwrap(), segments.clone());
            prop_assert_eq!(SurrogateKey::parse(&id).unwrap(), segments.key());
        }
    }
}
