//! permres - Hierarchical permission resolution
//!
//! Given a subject, one or more operation names and an optional resource,
//! find the permission records that apply and order them so the first one
//! is the effective decision.
//!
//! - Operations are path names; `/Doc/Delete` inherits rules on `/Doc`
//! - A user sees its own records and those of every group it belongs to
//! - Entity lookups see global records too; global lookups see only global
//! - Higher `level` wins; at equal level deny wins
//!
//! ```
//! use std::sync::Arc;
//! use permres::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.add_user_to_group(UserId(1), GroupId(10)).unwrap();
//! store.put(Permission::new(Subject::Group(GroupId(10)), Scope::Global, "/Doc", 1, true).unwrap()).unwrap();
//! store.put(Permission::new(Subject::User(UserId(1)), Scope::Global, "/Doc/Delete", 2, false).unwrap()).unwrap();
//!
//! let resolver = PermissionResolver::with_backend(store);
//! let u = Subject::User(UserId(1));
//! assert!(resolver.is_allowed(&u, &["/Doc/Edit"], Target::Global).unwrap());
//! assert!(!resolver.is_allowed(&u, &["/Doc/Delete"], Target::Global).unwrap());
//! ```

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod keys;
pub mod model;
pub mod operation;
pub mod resolver;
pub mod scope;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

pub use config::{ServerConfig, StoreConfig};
pub use db::LmdbStore;
pub use error::{PermError, Result};
pub use filter::{Filter, OperationCriterion, SubjectCriterion};
pub use fingerprint::fingerprint;
pub use model::{EntitiesGroupId, EntityKey, GroupId, Permission, PermissionId, Scope, Subject, UserId};
pub use operation::{ancestors, expand_operation_names, validate_operation_name};
pub use resolver::{order_by_precedence, precedence, Decision, PermissionResolver, Target};
pub use scope::{KeyExtractors, ScopeMatcher};
pub use store::{EntitiesGroups, GroupClosure, MemoryStore, PermissionStore};
