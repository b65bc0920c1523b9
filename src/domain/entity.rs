//! The closed set of record kinds held by the entity store.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Lease, LeaseId, Site, Tenant};

/// Kind of an entity. Doubles as the bucket name in the file-backed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tenant,
    Site,
    Lease,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Tenant, EntityKind::Site, EntityKind::Lease];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Tenant => "tenant",
            EntityKind::Site => "site",
            EntityKind::Lease => "lease",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tenant" => Some(EntityKind::Tenant),
            "site" => Some(EntityKind::Site),
            "lease" => Some(EntityKind::Lease),
            _ => None,
        }
    }

    /// Decode a raw record known to be of this kind.
    pub fn decode(&self, record: serde_json::Value) -> serde_json::Result<Entity> {
        Ok(match self {
            EntityKind::Tenant => Entity::Tenant(serde_json::from_value(record)?),
            EntityKind::Site => Entity::Site(serde_json::from_value(record)?),
            EntityKind::Lease => Entity::Lease(serde_json::from_value(record)?),
        })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of an entity: unique per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Tenant(String),
    Site(String),
    Lease(LeaseId),
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityKey::Tenant(_) => EntityKind::Tenant,
            EntityKey::Site(_) => EntityKind::Site,
            EntityKey::Lease(_) => EntityKind::Lease,
        }
    }

    /// The identity without its kind, as stored in the database key column.
    pub fn value(&self) -> String {
        match self {
            EntityKey::Tenant(name) => name.clone(),
            EntityKey::Site(number) => number.clone(),
            EntityKey::Lease(id) => id.to_string(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.value())
    }
}

/// Any record the store can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Tenant(Tenant),
    Site(Site),
    Lease(Lease),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Tenant(_) => EntityKind::Tenant,
            Entity::Site(_) => EntityKind::Site,
            Entity::Lease(_) => EntityKind::Lease,
        }
    }

    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Tenant(tenant) => EntityKey::Tenant(tenant.name.clone()),
            Entity::Site(site) => EntityKey::Site(site.number.clone()),
            Entity::Lease(lease) => EntityKey::Lease(lease.id),
        }
    }

    /// Encode the record without its kind tag; the kind lives in the bucket name.
    pub fn encode(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Entity::Tenant(tenant) => serde_json::to_value(tenant),
            Entity::Site(site) => serde_json::to_value(site),
            Entity::Lease(lease) => serde_json::to_value(lease),
        }
    }

    pub fn as_tenant(&self) -> Option<&Tenant> {
        match self {
            Entity::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }

    pub fn as_site(&self) -> Option<&Site> {
        match self {
            Entity::Site(site) => Some(site),
            _ => None,
        }
    }

    pub fn as_lease(&self) -> Option<&Lease> {
        match self {
            Entity::Lease(lease) => Some(lease),
            _ => None,
        }
    }

    pub fn into_tenant(self) -> Option<Tenant> {
        match self {
            Entity::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }

    pub fn into_site(self) -> Option<Site> {
        match self {
            Entity::Site(site) => Some(site),
            _ => None,
        }
    }

    pub fn into_lease(self) -> Option<Lease> {
        match self {
            Entity::Lease(lease) => Some(lease),
            _ => None,
        }
    }
}

impl From<Tenant> for Entity {
    fn from(tenant: Tenant) -> Self {
        Entity::Tenant(tenant)
    }
}

impl From<Site> for Entity {
    fn from(site: Site) -> Self {
        Entity::Site(site)
    }
}

impl From<Lease> for Entity {
    fn from(lease: Lease) -> Self {
        Entity::Lease(lease)
    }
}
