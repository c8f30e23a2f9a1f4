//! Semantic pass over a parsed filter.
//!
//! Every attribute must resolve to a known [`Field`] and carry a string
//! value. `tenant` is the only field with extra rules: it may appear only as
//! `tenant eq "<value>"`, and the value must be one of the caller's permitted
//! tenants.

use std::collections::BTreeSet;

use thiserror::Error;

use super::{CompareOp, Field, Filter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("unknown filter attribute '{0}'")]
    UnknownAttribute(String),

    #[error("filter attribute '{0}' must be compared with a string value")]
    NonStringValue(String),

    #[error("filter attribute 'tenant' only supports the 'eq' operator")]
    TenantOperator,

    #[error("tenant '{0}' is not permitted")]
    TenantNotPermitted(String),
}

impl ScopeError {
    /// True when the filter is well formed but names a tenant the caller may
    /// not see.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ScopeError::TenantNotPermitted(_))
    }
}

/// Checks `filter` against the set of tenants the caller may read.
pub fn check(filter: &Filter, permitted: &BTreeSet<String>) -> Result<(), ScopeError> {
    match filter {
        Filter::Compare { attr, op, value } => {
            let field = resolve(attr)?;
            let Some(value) = value.as_str() else {
                return Err(ScopeError::NonStringValue(attr.clone()));
            };

            if field == Field::Tenant {
                if *op != CompareOp::Eq {
                    return Err(ScopeError::TenantOperator);
                }
                if !permitted.contains(value) {
                    return Err(ScopeError::TenantNotPermitted(value.to_string()));
                }
            }
            Ok(())
        }
        Filter::Present { attr } => match resolve(attr)? {
            Field::Tenant => Err(ScopeError::TenantOperator),
            _ => Ok(()),
        },
        Filter::And(left, right) | Filter::Or(left, right) => {
            check(left, permitted)?;
            check(right, permitted)
        }
        Filter::Not(inner) => check(inner, permitted),
    }
}

fn resolve(attr: &str) -> Result<Field, ScopeError> {
    Field::resolve(attr).ok_or_else(|| ScopeError::UnknownAttribute(attr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use rstest::rstest;

    fn permitted() -> BTreeSet<String> {
        ["A-36-0-P1", "B-49-1-P2"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn scope(input: &str) -> Result<(), ScopeError> {
        check(&parse_filter(input).unwrap(), &permitted())
    }

    #[rstest]
    #[case(r#"tenant eq "A-36-0-P1""#)]
    #[case(r#"tenant eq "A-36-0-P1" or tenant eq "B-49-1-P2""#)]
    #[case(r#"tid eq "101" and not (state eq "0")"#)]
    #[case(r#"eid sw "EXT""#)]
    fn test_accepts(#[case] input: &str) {
        assert_eq!(scope(input), Ok(()));
    }

    #[rstest]
    #[case(r#"tenant ne "A-36-0-P1""#)]
    #[case(r#"tenant co "A""#)]
    #[case(r#"tenant sw "A-36""#)]
    #[case("tenant pr")]
    #[case(r#"tid eq "101" and not (tenant ne "A-36-0-P1")"#)]
    fn test_rejects_non_eq_tenant_operator(#[case] input: &str) {
        assert_eq!(scope(input), Err(ScopeError::TenantOperator));
    }

    #[test]
    fn test_forbids_unpermitted_tenant() {
        let err = scope(r#"tenant eq "A-36-0-P1" or tenant eq "C-1-1-P9""#).unwrap_err();
        assert_eq!(err, ScopeError::TenantNotPermitted("C-1-1-P9".to_string()));
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_tenant_name_is_not_the_tenant_attribute() {
        let err = scope(r#"tenantName ne "x""#).unwrap_err();
        assert_eq!(err, ScopeError::UnknownAttribute("tenantName".to_string()));
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_rejects_non_string_values() {
        assert_eq!(
            scope("tid eq 101"),
            Err(ScopeError::NonStringValue("tid".to_string()))
        );
    }
}
