//! Scope matching and resource key extraction

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::{PermError, Result};
use crate::model::{EntitiesGroupId, EntityKey, Scope};

/// Decides whether a record's scope applies to a resolution target.
///
/// A global request sees only global records. An entity request also sees
/// global records, since a global rule is the fallback everywhere, plus
/// records written for the entity itself or any entities group holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeMatcher {
    /// No scope restriction at all
    Any,
    /// Global records only
    Global,
    /// Global, this entity, or one of its entities groups
    Entity { key: EntityKey, groups: BTreeSet<EntitiesGroupId> },
    /// This entity or one of its entities groups, global excluded
    EntityOnly { key: EntityKey, groups: BTreeSet<EntitiesGroupId> },
}

impl ScopeMatcher {
    #[inline]
    pub fn matches(&self, scope: &Scope) -> bool {
        match (self, scope) {
            (ScopeMatcher::Any, _) => true,
            (ScopeMatcher::Global, s) => s.is_global(),
            (ScopeMatcher::Entity { .. }, Scope::Global) => true,
            (ScopeMatcher::EntityOnly { .. }, Scope::Global) => false,
            (ScopeMatcher::Entity { key, .. } | ScopeMatcher::EntityOnly { key, .. }, Scope::Entity(k)) => k == key,
            (ScopeMatcher::Entity { groups, .. } | ScopeMatcher::EntityOnly { groups, .. }, Scope::EntitiesGroup(g)) => {
                groups.contains(g)
            }
        }
    }
}

type Extractor = Box<dyn Fn(&dyn Any) -> Option<EntityKey> + Send + Sync>;

/// Per-type key extraction, registered by the host application.
///
/// ```
/// use permres::{EntityKey, KeyExtractors};
/// struct Invoice { key: u64 }
/// let mut ex = KeyExtractors::new();
/// ex.register(|i: &Invoice| EntityKey(i.key));
/// assert_eq!(ex.extract(&Invoice { key: 4 }).unwrap(), EntityKey(4));
/// ```
#[derive(Default)]
pub struct KeyExtractors {
    by_type: HashMap<TypeId, Extractor>,
}

impl KeyExtractors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the extractor for `T`
    pub fn register<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> EntityKey + Send + Sync + 'static,
    {
        self.by_type.insert(TypeId::of::<T>(), Box::new(move |r: &dyn Any| r.downcast_ref::<T>().map(&f)));
        self
    }

    /// Extract the security key of `resource`
    pub fn extract<T: Any>(&self, resource: &T) -> Result<EntityKey> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|f| f(resource))
            .ok_or(PermError::UnsupportedEntityType(type_name::<T>()))
    }
}

impl fmt::Debug for KeyExtractors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExtractors").field("types", &self.by_type.len()).finish()
    }
}
