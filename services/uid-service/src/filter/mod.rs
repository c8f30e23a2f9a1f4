//! Search filter language for Surrogate listings.
//!
//! Callers narrow `GET /v1/uid` with boolean expressions over the identifier
//! segments, the tenant and the lifecycle state:
//!
//! ```text
//! expr       := disjunct ("or" disjunct)*
//! disjunct   := term ("and" term)*
//! term       := "not" "(" expr ")" | "(" expr ")" | test
//! test       := name "pr" | name op literal
//! op         := eq | ne | co | sw | ew | gt | ge | lt | le
//! literal    := "quoted" | number | true | false | null
//! ```
//!
//! Keywords and operators ignore case; string literals do not. `and` binds
//! tighter than `or`.
//!
//! [`parse_filter`] yields a syntax tree and knows nothing about Surrogates.
//! [`scope::check`] resolves names and confines the tree to the caller's
//! tenants, [`sql`] renders a checked tree as a bound Postgres predicate and
//! [`Filter::matches`] evaluates it against a record in memory.
//!
//! ```text
//! tenant eq "A-36-0-P1" and tid eq "101"
//! not (state eq "0") and eid sw "EXT"
//! ```

mod eval;
mod parse;
pub mod scope;
pub mod sql;

use std::fmt;

pub use eval::Resolve;
pub use parse::{parse_filter, FilterParseError};

/// Longest filter accepted, in bytes.
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Deepest parenthesis nesting accepted.
pub const MAX_FILTER_DEPTH: usize = 32;

/// Syntax tree of a filter. Attribute names are kept as written.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `tid eq "101"`
    Compare {
        attr: String,
        op: CompareOp,
        value: FilterValue,
    },
    /// `eid pr`: the attribute is non-empty
    Present { attr: String },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { attr, op, value } => write!(f, "{attr} {op} {value}"),
            Filter::Present { attr } => write!(f, "{attr} pr"),
            Filter::And(left, right) => write!(f, "({left} and {right})"),
            Filter::Or(left, right) => write!(f, "({left} or {right})"),
            Filter::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        };
        f.write_str(s)
    }
}

/// Right-hand side of a comparison. Only strings match Surrogate fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Bool(bool),
    Number(f64),
    Null,
}

impl FilterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

/// Attributes a Surrogate listing can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Uid,
    Tenant,
    Ptt,
    Cid,
    Sid,
    Pts,
    Tid,
    Eid,
    State,
}

impl Field {
    /// Resolves an attribute name, ignoring ASCII case.
    ///
    /// Only exact names resolve; `tenantName` is not `tenant`.
    pub fn resolve(name: &str) -> Option<Self> {
        const NAMES: [(&str, Field); 11] = [
            ("uid", Field::Uid),
            ("tenant", Field::Tenant),
            ("ptt", Field::Ptt),
            ("cid", Field::Cid),
            ("sid", Field::Sid),
            ("pts", Field::Pts),
            ("tid", Field::Tid),
            ("type", Field::Tid),
            ("eid", Field::Eid),
            ("externalId", Field::Eid),
            ("state", Field::State),
        ];

        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| *field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_resolution() {
        assert_eq!(Field::resolve("TENANT"), Some(Field::Tenant));
        assert_eq!(Field::resolve("type"), Some(Field::Tid));
        assert_eq!(Field::resolve("externalId"), Some(Field::Eid));
        assert_eq!(Field::resolve("tenantName"), None);
        assert_eq!(Field::resolve("unknown"), None);
    }

    #[test]
    fn test_display_quotes_strings() {
        let filter = Filter::Not(Box::new(Filter::Compare {
            attr: "eid".to_string(),
            op: CompareOp::Sw,
            value: FilterValue::String("a\"b".to_string()),
        }));
        assert_eq!(filter.to_string(), r#"not (eid sw "a\"b")"#);
    }
}
