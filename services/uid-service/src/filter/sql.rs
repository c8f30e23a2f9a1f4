//! Filter to SQL translation.
//!
//! Appends a checked filter to a Postgres `QueryBuilder` as a boolean
//! expression over the `surrogates` table. Every value is bound, never
//! interpolated.
//!
//! | Attribute             | Column                              |
//! |-----------------------|-------------------------------------|
//! | `uid`                 | `tenant \|\| '-' \|\| tid \|\| '-' \|\| eid` |
//! | `tenant`              | `tenant`                            |
//! | `ptt` .. `pts`        | the matching segment column         |
//! | `tid`, `type`         | `tid`                               |
//! | `eid`, `externalId`   | `eid`                               |
//! | `state`               | `state`                             |

use sqlx::{Postgres, QueryBuilder};

use super::{CompareOp, Field, Filter};

/// Column expression backing a filter field.
pub fn column(field: Field) -> &'static str {
    match field {
        Field::Uid => "(tenant || '-' || tid || '-' || eid)",
        Field::Tenant => "tenant",
        Field::Ptt => "ptt",
        Field::Cid => "cid",
        Field::Sid => "sid",
        Field::Pts => "pts",
        Field::Tid => "tid",
        Field::Eid => "eid",
        Field::State => "state",
    }
}

/// Appends `filter` to `builder`.
///
/// Attributes that do not resolve, or values that are not strings, become
/// `FALSE`, mirroring [`Filter::matches`].
pub fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Compare { attr, op, value } => {
            let (Some(field), Some(value)) = (Field::resolve(attr), value.as_str()) else {
                builder.push("FALSE");
                return;
            };
            push_compare(builder, column(field), *op, value.to_string());
        }
        Filter::Present { attr } => match Field::resolve(attr) {
            Some(field) => {
                builder.push(column(field)).push(" <> ''");
            }
            None => {
                builder.push("FALSE");
            }
        },
        Filter::And(left, right) => push_binary(builder, left, " AND ", right),
        Filter::Or(left, right) => push_binary(builder, left, " OR ", right),
        Filter::Not(inner) => {
            builder.push("NOT (");
            push_filter(builder, inner);
            builder.push(")");
        }
    }
}

fn push_binary(builder: &mut QueryBuilder<'_, Postgres>, left: &Filter, op: &str, right: &Filter) {
    builder.push("(");
    push_filter(builder, left);
    builder.push(op);
    push_filter(builder, right);
    builder.push(")");
}

fn push_compare(builder: &mut QueryBuilder<'_, Postgres>, column: &str, op: CompareOp, value: String) {
    let operator = match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Co => {
            builder
                .push("strpos(")
                .push(column)
                .push(", ")
                .push_bind(value)
                .push(") > 0");
            return;
        }
        CompareOp::Sw => {
            builder
                .push("starts_with(")
                .push(column)
                .push(", ")
                .push_bind(value)
                .push(")");
            return;
        }
        CompareOp::Ew => {
            builder
                .push("right(")
                .push(column)
                .push(", length(")
                .push_bind(value.clone())
                .push(")) = ")
                .push_bind(value);
            return;
        }
    };

    builder
        .push(column)
        .push(" ")
        .push(operator)
        .push(" ")
        .push_bind(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;

    fn translate(input: &str) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_filter(&mut builder, &parse_filter(input).unwrap());
        builder.sql().to_string()
    }

    #[test]
    fn test_equality_is_bound() {
        assert_eq!(translate(r#"tenant eq "A-36-0-P1""#), "tenant = $1");
    }

    #[test]
    fn test_logical_nesting() {
        assert_eq!(
            translate(r#"tid eq "101" and not (eid ne "X" or state eq "0")"#),
            "(tid = $1 AND NOT ((eid <> $2 OR state = $3)))"
        );
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(translate(r#"eid co "12""#), "strpos(eid, $1) > 0");
        assert_eq!(translate(r#"eid sw "EXT""#), "starts_with(eid, $1)");
        assert_eq!(translate(r#"eid ew "45""#), "right(eid, length($1)) = $2");
    }

    #[test]
    fn test_aliases_and_uid_column() {
        assert_eq!(translate(r#"externalId eq "X""#), "eid = $1");
        assert_eq!(
            translate(r#"uid eq "A-36-0-P1-101-EXT12345""#),
            "(tenant || '-' || tid || '-' || eid) = $1"
        );
    }

    #[test]
    fn test_unresolvable_terms_are_false() {
        assert_eq!(translate(r#"tenantName eq "x""#), "FALSE");
        assert_eq!(translate("tid eq 101"), "FALSE");
        assert_eq!(translate("eid pr"), "eid <> ''");
    }
}
