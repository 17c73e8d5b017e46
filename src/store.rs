//! Collaborator contracts and an in-memory implementation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::MAX_GROUP_DEPTH;
use crate::error::{PermError, Result};
use crate::filter::Filter;
use crate::model::{EntitiesGroupId, EntityKey, GroupId, Permission, PermissionId, UserId};

/// Returns records matching a filter, in no particular order
pub trait PermissionStore: Send + Sync {
    fn query(&self, filter: &Filter) -> Result<Vec<Permission>>;
}

/// Transitive group membership of a user (user itself excluded)
pub trait GroupClosure: Send + Sync {
    fn groups_of(&self, user: UserId) -> Result<BTreeSet<GroupId>>;
}

/// Entities groups that contain a resource
pub trait EntitiesGroups: Send + Sync {
    fn entities_groups_of(&self, key: EntityKey) -> Result<BTreeSet<EntitiesGroupId>>;
}

/// Breadth-first walk up the group graph.
///
/// Cycles terminate because visited groups are not expanded twice. Nesting
/// deeper than `max_depth` levels is an error, never a truncated closure.
pub(crate) fn walk_groups<F>(direct: BTreeSet<GroupId>, max_depth: usize, mut parents: F) -> Result<BTreeSet<GroupId>>
where
    F: FnMut(GroupId) -> Result<Vec<GroupId>>,
{
    let mut seen = direct.clone();
    let mut frontier: Vec<GroupId> = direct.into_iter().collect();
    for _ in 0..max_depth {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for g in frontier {
            for p in parents(g)? {
                if seen.insert(p) {
                    next.push(p);
                }
            }
        }
        frontier = next;
    }
    for g in frontier {
        if parents(g)?.into_iter().any(|p| !seen.contains(&p)) {
            return Err(PermError::CollaboratorUnavailable(format!(
                "group nesting deeper than {} levels above group {}",
                max_depth, g
            )));
        }
    }
    Ok(seen)
}

#[derive(Default)]
struct Tables {
    perms: BTreeMap<PermissionId, Permission>,
    user_groups: BTreeMap<UserId, BTreeSet<GroupId>>,
    group_parents: BTreeMap<GroupId, BTreeSet<GroupId>>,
    entity_groups: BTreeMap<EntityKey, BTreeSet<EntitiesGroupId>>,
}

/// In-process store implementing every collaborator trait
#[derive(Default)]
pub struct MemoryStore {
    t: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.t.read().map_err(|_| PermError::CollaboratorUnavailable("memory store poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.t.write().map_err(|_| PermError::CollaboratorUnavailable("memory store poisoned".into()))
    }

    /// Insert or replace a record
    pub fn put(&self, p: Permission) -> Result<()> {
        self.write()?.perms.insert(p.id, p);
        Ok(())
    }

    pub fn remove(&self, id: PermissionId) -> Result<bool> {
        Ok(self.write()?.perms.remove(&id).is_some())
    }

    pub fn add_user_to_group(&self, user: UserId, group: GroupId) -> Result<()> {
        self.write()?.user_groups.entry(user).or_default().insert(group);
        Ok(())
    }

    /// Make `child` a member of `parent`
    pub fn add_group_to_group(&self, child: GroupId, parent: GroupId) -> Result<()> {
        if child == parent {
            return Err(PermError::invalid("group cannot contain itself"));
        }
        self.write()?.group_parents.entry(child).or_default().insert(parent);
        Ok(())
    }

    pub fn add_entity_to_group(&self, key: EntityKey, group: EntitiesGroupId) -> Result<()> {
        self.write()?.entity_groups.entry(key).or_default().insert(group);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.perms.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl PermissionStore for MemoryStore {
    fn query(&self, filter: &Filter) -> Result<Vec<Permission>> {
        Ok(self.read()?.perms.values().filter(|p| filter.matches(p)).cloned().collect())
    }
}

impl GroupClosure for MemoryStore {
    fn groups_of(&self, user: UserId) -> Result<BTreeSet<GroupId>> {
        let t = self.read()?;
        let direct = t.user_groups.get(&user).cloned().unwrap_or_default();
        walk_groups(direct, MAX_GROUP_DEPTH, |g| {
            Ok(t.group_parents.get(&g).map(|s| s.iter().copied().collect()).unwrap_or_default())
        })
    }
}

impl EntitiesGroups for MemoryStore {
    fn entities_groups_of(&self, key: EntityKey) -> Result<BTreeSet<EntitiesGroupId>> {
        Ok(self.read()?.entity_groups.get(&key).cloned().unwrap_or_default())
    }
}
