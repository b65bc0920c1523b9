use tracing::debug;

use crate::domain::{Entity, EntityKey};

use super::{Predicates, StoreError};

/// Ordered slots of entities shared by every backend.
///
/// Deleted entities leave an empty slot behind so positions stay stable while
/// callers iterate. Scans visit slots in order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    slots: Vec<Option<Entity>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    pub fn into_entities(self) -> impl Iterator<Item = Entity> {
        self.slots.into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.entities().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First entity matching every predicate.
    pub fn find(&self, predicates: &Predicates) -> Option<&Entity> {
        self.entities().find(|entity| predicates.matches(entity))
    }

    /// All entities matching every predicate, in slot order.
    pub fn filter(&self, predicates: &Predicates) -> Vec<Entity> {
        self.entities()
            .filter(|entity| predicates.matches(entity))
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.position(key).and_then(|index| self.slots[index].as_ref())
    }

    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entity| &entity.key() == key))
    }

    /// Reject a lease whose site and term equal another lease's.
    pub fn check_conflicts(&self, candidate: &Entity) -> Result<(), StoreError> {
        let Entity::Lease(lease) = candidate else {
            return Ok(());
        };
        let clash = self
            .entities()
            .filter_map(Entity::as_lease)
            .any(|existing| existing.conflicts_with(lease));
        if clash {
            return Err(StoreError::Conflict {
                site: lease.site.clone(),
                term: lease.term,
            });
        }
        Ok(())
    }

    /// Validate that `entity` may be appended as a new identity.
    pub fn check_insert(&self, entity: &Entity) -> Result<(), StoreError> {
        let key = entity.key();
        if self.position(&key).is_some() {
            return Err(StoreError::Duplicate(key));
        }
        self.check_conflicts(entity)
    }

    /// Validate that `entity` may replace the stored entity with its identity.
    pub fn check_update(&self, entity: &Entity) -> Result<(), StoreError> {
        let key = entity.key();
        if self.position(&key).is_none() {
            return Err(StoreError::NotFound(key));
        }
        self.check_conflicts(entity)
    }

    /// Append a new identity.
    pub fn insert(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.check_insert(&entity)?;
        self.slots.push(Some(entity));
        Ok(())
    }

    /// Replace an existing identity in place.
    pub fn update(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.check_update(&entity)?;
        match self.position(&entity.key()) {
            Some(index) => {
                self.slots[index] = Some(entity);
                Ok(())
            }
            None => Err(StoreError::NotFound(entity.key())),
        }
    }

    /// Replace in place when the identity exists, append otherwise.
    pub fn upsert(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.check_conflicts(&entity)?;
        match self.position(&entity.key()) {
            Some(index) => {
                debug!(key = %entity.key(), index, "replacing entity");
                self.slots[index] = Some(entity);
            }
            None => {
                debug!(key = %entity.key(), "appending entity");
                self.slots.push(Some(entity));
            }
        }
        Ok(())
    }

    /// Empty the slot holding `key`, leaving later positions untouched.
    pub fn remove(&mut self, key: &EntityKey) -> Result<Entity, StoreError> {
        let index = self
            .position(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        self.slots[index]
            .take()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

impl FromIterator<Entity> for Catalog {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Some).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{Currency, DwellingKind, Lease, Site, Tenant, Term};
    use crate::storage::Predicate;

    fn term(days: u32) -> Term {
        Term::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), days)
    }

    #[test]
    fn test_insert_rejects_duplicate_identity() {
        let mut catalog = Catalog::new();
        catalog.insert(Site::new("A-1", DwellingKind::Cabin).into()).unwrap();

        let result = catalog.insert(Site::new("A-1", DwellingKind::House).into());

        assert!(matches!(result, Err(StoreError::Duplicate(EntityKey::Site(_)))));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_lease_conflict_on_identical_term_only() {
        let mut catalog = Catalog::new();
        let rent = Currency::from_dollars(100);
        catalog.insert(Lease::new("Ada", "A-1", term(30), rent).into()).unwrap();

        let clash = catalog.insert(Lease::new("Bob", "A-1", term(30), rent).into());
        assert!(matches!(clash, Err(StoreError::Conflict { .. })));

        catalog.insert(Lease::new("Bob", "A-1", term(31), rent).into()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut catalog: Catalog = vec![
            Entity::from(Tenant::new("Ada", "old")),
            Entity::from(Tenant::new("Bob", "")),
        ]
        .into_iter()
        .collect();

        catalog.upsert(Tenant::new("Ada", "new").into()).unwrap();
        catalog.upsert(Tenant::new("Cy", "").into()).unwrap();

        let names: Vec<_> = catalog
            .entities()
            .filter_map(Entity::as_tenant)
            .map(|t| (t.name.as_str(), t.contact.as_str()))
            .collect();
        assert_eq!(names, vec![("Ada", "new"), ("Bob", ""), ("Cy", "")]);
    }

    #[test]
    fn test_update_missing_fails() {
        let mut catalog = Catalog::new();
        let result = catalog.update(Tenant::new("Ada", "").into());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_remove_keeps_positions_stable() {
        let mut catalog: Catalog = ["1", "2", "3"]
            .into_iter()
            .map(|n| Entity::from(Site::new(n, DwellingKind::Flat)))
            .collect();

        catalog.remove(&EntityKey::Site("2".into())).unwrap();
        assert_eq!(catalog.slots.len(), 3);
        assert!(catalog.get(&EntityKey::Site("3".into())).is_some());

        let missing = catalog.remove(&EntityKey::Site("2".into()));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_find_and_filter_preserve_order() {
        let catalog: Catalog = ["1", "2", "3"]
            .into_iter()
            .map(|n| Entity::from(Site::new(n, DwellingKind::Flat)))
            .collect();

        let sites = Predicates::from(Predicate::site(|s| s.number != "1"));
        assert_eq!(
            catalog.find(&sites).map(Entity::key),
            Some(EntityKey::Site("2".into()))
        );
        let numbers: Vec<_> = catalog
            .filter(&sites)
            .into_iter()
            .filter_map(Entity::into_site)
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, vec!["2", "3"]);
    }
}
