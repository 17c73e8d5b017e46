//! LMDB-backed store implementing every collaborator trait

use std::collections::BTreeSet;

use heed::types::{Bytes, Str, Unit};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::constants::MAX_DBS;
use crate::error::{err, PermError, Result};
use crate::filter::Filter;
use crate::keys::{decode_record, encode_record, operation_prefix, pair, pair_second, permission_key, MAX_OPERATION_LEN};
use crate::model::{EntitiesGroupId, EntityKey, GroupId, Permission, PermissionId, UserId};
use crate::store::{walk_groups, EntitiesGroups, GroupClosure, PermissionStore};

/// Membership table: pair(member, container) -> ()
type Edges = Database<Bytes, Unit>;

/// All database handles
struct Dbs {
    /// [len][operation][id] -> record
    perms: Database<Bytes, Bytes>,
    /// id -> operation, to find a record's key on removal
    by_id: Database<Bytes, Str>,
    user_groups: Edges,
    group_parents: Edges,
    entity_groups: Edges,
}

pub struct LmdbStore {
    env: Env,
    dbs: Dbs,
    max_group_depth: usize,
}

impl LmdbStore {
    /// Open (creating if needed) the environment at `config.path`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.path).map_err(err)?;
        // SAFETY: LMDB requires no other process to open this path with a different map size concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(MAX_DBS)
                .open(&config.path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            perms: env.create_database(&mut tx, Some("perms")).map_err(err)?,
            by_id: env.create_database(&mut tx, Some("by_id")).map_err(err)?,
            user_groups: env.create_database(&mut tx, Some("user_groups")).map_err(err)?,
            group_parents: env.create_database(&mut tx, Some("group_parents")).map_err(err)?,
            entity_groups: env.create_database(&mut tx, Some("entity_groups")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        debug!(path = %config.path.display(), map_size = config.map_size, "opened permission store");
        Ok(LmdbStore { env, dbs, max_group_depth: config.max_group_depth })
    }

    fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(&self.dbs, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    /// Insert or replace a record
    pub fn put(&self, p: &Permission) -> Result<()> {
        self.put_all(std::slice::from_ref(p))
    }

    /// Insert or replace many records in one transaction
    pub fn put_all(&self, perms: &[Permission]) -> Result<()> {
        self.write(|d, tx| {
            for p in perms {
                let id = p.id.0.to_be_bytes();
                // A record may move to another operation; drop the old key first.
                if let Some(old) = d.by_id.get(tx, &id).map_err(err)?.map(str::to_string) {
                    d.perms.delete(tx, &permission_key(&old, p.id)?).map_err(err)?;
                }
                d.perms.put(tx, &permission_key(&p.operation, p.id)?, &encode_record(p)).map_err(err)?;
                d.by_id.put(tx, &id, &p.operation).map_err(err)?;
            }
            Ok(())
        })?;
        trace!(count = perms.len(), "stored permissions");
        Ok(())
    }

    /// Remove a record by id
    pub fn remove(&self, id: PermissionId) -> Result<bool> {
        self.write(|d, tx| {
            let key = id.0.to_be_bytes();
            let Some(op) = d.by_id.get(tx, &key).map_err(err)?.map(str::to_string) else {
                return Ok(false);
            };
            d.by_id.delete(tx, &key).map_err(err)?;
            d.perms.delete(tx, &permission_key(&op, id)?).map_err(err)
        })
    }

    pub fn add_user_to_group(&self, user: UserId, group: GroupId) -> Result<()> {
        self.write(|d, tx| d.user_groups.put(tx, &pair(user.0, group.0), &()).map_err(err))
    }

    pub fn remove_user_from_group(&self, user: UserId, group: GroupId) -> Result<bool> {
        self.write(|d, tx| d.user_groups.delete(tx, &pair(user.0, group.0)).map_err(err))
    }

    /// Make `child` a member of `parent`
    pub fn add_group_to_group(&self, child: GroupId, parent: GroupId) -> Result<()> {
        if child == parent {
            return Err(PermError::invalid("group cannot contain itself"));
        }
        self.write(|d, tx| d.group_parents.put(tx, &pair(child.0, parent.0), &()).map_err(err))
    }

    pub fn add_entity_to_group(&self, key: EntityKey, group: EntitiesGroupId) -> Result<()> {
        self.write(|d, tx| d.entity_groups.put(tx, &pair(key.0, group.0), &()).map_err(err))
    }

    pub fn remove_entity_from_group(&self, key: EntityKey, group: EntitiesGroupId) -> Result<bool> {
        self.write(|d, tx| d.entity_groups.delete(tx, &pair(key.0, group.0)).map_err(err))
    }

    /// Clear all databases (for testing)
    pub fn clear_all(&self) -> Result<()> {
        self.write(|d, tx| {
            d.perms.clear(tx).map_err(err)?;
            d.by_id.clear(tx).map_err(err)?;
            d.user_groups.clear(tx).map_err(err)?;
            d.group_parents.clear(tx).map_err(err)?;
            d.entity_groups.clear(tx).map_err(err)
        })
    }

    pub fn count(&self) -> Result<u64> {
        self.read(|d, tx| d.perms.len(tx).map_err(err))
    }
}

/// Second halves of every pair(a, _) key
fn list_edges(tx: &RoTxn, db: &Edges, a: u64) -> Result<Vec<u64>> {
    let mut r = Vec::new();
    for item in db.prefix_iter(tx, &a.to_be_bytes()).map_err(err)? {
        let (k, ()) = item.map_err(err)?;
        if let Some(b) = pair_second(k) {
            r.push(b);
        }
    }
    Ok(r)
}

impl PermissionStore for LmdbStore {
    fn query(&self, filter: &Filter) -> Result<Vec<Permission>> {
        self.read(|d, tx| {
            let mut out = Vec::new();
            let mut keep = |k: &[u8], v: &[u8]| -> Result<()> {
                let p = decode_record(k, v)?;
                if filter.matches(&p) {
                    out.push(p);
                }
                Ok(())
            };
            match filter.operation_names() {
                Some(names) => {
                    for name in names {
                        // Nothing longer can be stored, so no record can match
                        if name.len() > MAX_OPERATION_LEN {
                            continue;
                        }
                        for item in d.perms.prefix_iter(tx, &operation_prefix(name)?).map_err(err)? {
                            let (k, v) = item.map_err(err)?;
                            keep(k, v)?;
                        }
                    }
                }
                None => {
                    for item in d.perms.iter(tx).map_err(err)? {
                        let (k, v) = item.map_err(err)?;
                        keep(k, v)?;
                    }
                }
            }
            trace!(matched = out.len(), "permission query");
            Ok(out)
        })
    }
}

impl GroupClosure for LmdbStore {
    fn groups_of(&self, user: UserId) -> Result<BTreeSet<GroupId>> {
        self.read(|d, tx| {
            let direct = list_edges(tx, &d.user_groups, user.0)?.into_iter().map(GroupId).collect();
            walk_groups(direct, self.max_group_depth, |g| {
                Ok(list_edges(tx, &d.group_parents, g.0)?.into_iter().map(GroupId).collect())
            })
        })
    }
}

impl EntitiesGroups for LmdbStore {
    fn entities_groups_of(&self, key: EntityKey) -> Result<BTreeSet<EntitiesGroupId>> {
        self.read(|d, tx| Ok(list_edges(tx, &d.entity_groups, key.0)?.into_iter().map(EntitiesGroupId).collect()))
    }
}
