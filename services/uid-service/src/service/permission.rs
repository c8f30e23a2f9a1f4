//! Tenant permission checks backed by claims.

use std::collections::BTreeSet;

use crate::model::{Claim, ClaimRole};
use crate::store::{DbError, Store};

/// The tenant claims held by one principal.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    claims: Vec<Claim>,
}

impl Permissions {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    pub async fn load(store: &dyn Store, principal: &str) -> Result<Self, DbError> {
        Ok(Self::new(store.claims_for_principal(principal).await?))
    }

    /// True if the principal holds any claim on `tenant` and, for each flag
    /// set, the claim of that role.
    pub fn permitted(&self, tenant: &str, generate: bool, register: bool) -> bool {
        let holds = |role: ClaimRole| {
            self.claims
                .iter()
                .any(|c| c.tenant == tenant && c.role == role)
        };

        let any = self.claims.iter().any(|c| c.tenant == tenant);
        any && (!generate || holds(ClaimRole::Generate))
            && (!register || holds(ClaimRole::Register))
    }

    /// Every tenant the principal may read.
    pub fn tenants(&self) -> BTreeSet<String> {
        self.claims.iter().map(|c| c.tenant.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn claim(tenant: &str, role: ClaimRole) -> Claim {
        Claim {
            tenant: tenant.to_string(),
            principal: "alice".to_string(),
            role,
        }
    }

    fn permissions() -> Permissions {
        Permissions::new(vec![
            claim("A-36-0-P1", ClaimRole::Generate),
            claim("B-49-1-P2", ClaimRole::Generate),
            claim("B-49-1-P2", ClaimRole::Register),
        ])
    }

    #[rstest]
    #[case("A-36-0-P1", false, false, true)]
    #[case("A-36-0-P1", true, false, true)]
    #[case("A-36-0-P1", false, true, false)]
    #[case("A-36-0-P1", true, true, false)]
    #[case("B-49-1-P2", true, true, true)]
    #[case("C-1-1-P9", false, false, false)]
    fn test_permitted(
        #[case] tenant: &str,
        #[case] generate: bool,
        #[case] register: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(permissions().permitted(tenant, generate, register), expected);
    }

    #[test]
    fn test_tenants_are_deduplicated() {
        let tenants: Vec<_> = permissions().tenants().into_iter().collect();
        assert_eq!(tenants, vec!["A-36-0-P1", "B-49-1-P2"]);
    }
}
