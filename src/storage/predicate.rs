//! Composable match tests over stored entities.
//!
//! A predicate sees any [`Entity`] and does its own kind check: a predicate
//! written for leases simply answers `false` when handed a tenant. A list of
//! predicates matches when every member matches (logical AND).

use std::fmt;
use std::sync::Arc;

use crate::domain::{Entity, EntityKey, EntityKind, Lease, Site, Tenant, Term};

#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Entity) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(test: impl Fn(&Entity) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(test))
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        (self.0)(entity)
    }

    /// Test tenants only.
    pub fn tenant(test: impl Fn(&Tenant) -> bool + Send + Sync + 'static) -> Self {
        Self::new(move |entity| entity.as_tenant().is_some_and(&test))
    }

    /// Test sites only.
    pub fn site(test: impl Fn(&Site) -> bool + Send + Sync + 'static) -> Self {
        Self::new(move |entity| entity.as_site().is_some_and(&test))
    }

    /// Test leases only.
    pub fn lease(test: impl Fn(&Lease) -> bool + Send + Sync + 'static) -> Self {
        Self::new(move |entity| entity.as_lease().is_some_and(&test))
    }

    /// Collapse a list into one predicate that requires all of them.
    pub fn all(predicates: impl Into<Predicates>) -> Self {
        let predicates = predicates.into();
        Self::new(move |entity| predicates.matches(entity))
    }

    pub fn of_kind(kind: EntityKind) -> Self {
        Self::new(move |entity| entity.kind() == kind)
    }

    pub fn with_key(key: EntityKey) -> Self {
        Self::new(move |entity| entity.key() == key)
    }

    pub fn tenant_named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::tenant(move |tenant| tenant.name == name)
    }

    pub fn site_numbered(number: impl Into<String>) -> Self {
        let number = number.into();
        Self::site(move |site| site.number == number)
    }

    pub fn lease_for_tenant(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::lease(move |lease| lease.tenant == name)
    }

    pub fn lease_on_site(number: impl Into<String>) -> Self {
        let number = number.into();
        Self::lease(move |lease| lease.site == number)
    }

    pub fn lease_with_term(term: Term) -> Self {
        Self::lease(move |lease| lease.term == term)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// An AND-list of predicates. The empty list matches everything.
#[derive(Debug, Clone, Default)]
pub struct Predicates(Vec<Predicate>);

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match every entity.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.0.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.0.push(predicate);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short-circuits on the first predicate that fails.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.0.iter().all(|predicate| predicate.matches(entity))
    }
}

impl From<Vec<Predicate>> for Predicates {
    fn from(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }
}

impl From<Predicate> for Predicates {
    fn from(predicate: Predicate) -> Self {
        Self(vec![predicate])
    }
}

impl FromIterator<Predicate> for Predicates {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{Currency, DwellingKind};

    fn lease(tenant: &str, site: &str) -> Entity {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Lease::new(tenant, site, Term::new(start, 30), Currency::from_dollars(500)).into()
    }

    #[test]
    fn test_mismatched_kind_is_no_match() {
        let tenant = Entity::from(Tenant::new("Ada", ""));
        let site = Entity::from(Site::new("Ada", DwellingKind::Flat));

        let predicate = Predicate::tenant_named("Ada");
        assert!(predicate.matches(&tenant));
        assert!(!predicate.matches(&site));
        assert!(!Predicate::lease_for_tenant("Ada").matches(&tenant));
    }

    #[test]
    fn test_list_is_logical_and() {
        let list = Predicates::new()
            .and(Predicate::lease_for_tenant("Ada"))
            .and(Predicate::lease_on_site("A-1"));

        assert!(list.matches(&lease("Ada", "A-1")));
        assert!(!list.matches(&lease("Ada", "B-2")));
        assert!(!list.matches(&lease("Bob", "A-1")));
    }

    #[test]
    fn test_empty_list_matches_everything() {
        assert!(Predicates::any().matches(&lease("Ada", "A-1")));
        assert!(Predicates::any().is_empty());
    }

    #[test]
    fn test_list_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let list: Predicates = vec![
            Predicate::new(|_| false),
            Predicate::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ]
        .into();

        assert!(!list.matches(&lease("Ada", "A-1")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_nests_as_single_predicate() {
        let both = Predicate::all(vec![
            Predicate::of_kind(EntityKind::Lease),
            Predicate::lease_on_site("A-1"),
        ]);
        let list = Predicates::from(both).and(Predicate::lease_for_tenant("Ada"));

        assert_eq!(list.len(), 2);
        assert!(list.matches(&lease("Ada", "A-1")));
        assert!(!list.matches(&lease("Ada", "C-3")));
    }

    #[test]
    fn test_with_key() {
        let entity = lease("Ada", "A-1");
        assert!(Predicate::with_key(entity.key()).matches(&entity));
        assert!(!Predicate::with_key(entity.key()).matches(&lease("Ada", "A-1")));
    }
}
