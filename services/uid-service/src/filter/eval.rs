//! In-memory evaluation.

use super::{CompareOp, Field, Filter};

/// Supplies attribute values to [`Filter::matches`].
pub trait Resolve {
    fn resolve(&self, field: Field) -> Option<String>;
}

impl Filter {
    /// Evaluates the filter against a single record.
    ///
    /// Unknown attributes and non-string values never match; run
    /// [`super::scope::check`] first to reject them with a proper error.
    pub fn matches<R: Resolve + ?Sized>(&self, record: &R) -> bool {
        match self {
            Filter::Compare { attr, op, value } => {
                let (Some(field), Some(expected)) = (Field::resolve(attr), value.as_str()) else {
                    return false;
                };
                let Some(actual) = record.resolve(field) else {
                    return false;
                };
                compare(&actual, *op, expected)
            }
            Filter::Present { attr } => Field::resolve(attr)
                .and_then(|field| record.resolve(field))
                .is_some_and(|v| !v.is_empty()),
            Filter::And(left, right) => left.matches(record) && right.matches(record),
            Filter::Or(left, right) => left.matches(record) || right.matches(record),
            Filter::Not(inner) => !inner.matches(record),
        }
    }
}

fn compare(actual: &str, op: CompareOp, expected: &str) -> bool {
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Co => actual.contains(expected),
        CompareOp::Sw => actual.starts_with(expected),
        CompareOp::Ew => actual.ends_with(expected),
        CompareOp::Gt => actual > expected,
        CompareOp::Ge => actual >= expected,
        CompareOp::Lt => actual < expected,
        CompareOp::Le => actual <= expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;

    struct Record;

    impl Resolve for Record {
        fn resolve(&self, field: Field) -> Option<String> {
            let value = match field {
                Field::Tenant => "A-36-0-P1",
                Field::Tid => "101",
                Field::Eid => "EXT12345",
                Field::State => "GENERATED",
                _ => return None,
            };
            Some(value.to_string())
        }
    }

    fn eval(input: &str) -> bool {
        parse_filter(input).unwrap().matches(&Record)
    }

    #[test]
    fn test_string_operators() {
        assert!(eval(r#"tenant eq "A-36-0-P1""#));
        assert!(eval(r#"tenant ne "B-1-1-P2""#));
        assert!(eval(r#"eid co "123""#));
        assert!(eval(r#"eid sw "EXT""#));
        assert!(eval(r#"eid ew "45""#));
        assert!(eval(r#"tid gt "100" and tid le "101""#));
        assert!(!eval(r#"tid lt "101""#));
    }

    #[test]
    fn test_logical_operators() {
        assert!(eval(r#"tid eq "999" or externalId eq "EXT12345""#));
        assert!(!eval(r#"tid eq "101" and eid eq "OTHER""#));
        assert!(eval(r#"not (state eq "0")"#));
    }

    #[test]
    fn test_unknown_and_absent_attributes_do_not_match() {
        assert!(!eval(r#"tenantName eq "A-36-0-P1""#));
        assert!(!eval("ptt pr"));
        assert!(eval("eid pr"));
        assert!(!eval("tid eq 101"));
    }
}
