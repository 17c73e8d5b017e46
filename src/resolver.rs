//! Permission resolution.
//!
//! A record is a candidate iff its subject is the user (or a group in the
//! user's closure), its operation is the requested name or an ancestor of
//! it, and its scope applies to the target. Candidates come back ordered by
//! precedence:
//!
//! 1. `level` descending: more specific rules win
//! 2. `allow` ascending: at equal level, deny wins
//! 3. `id` ascending, so the order never depends on the store
//!
//! The first element is the effective rule. An empty list means no rule
//! applies, which callers conventionally treat as deny.

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::filter::{Filter, SubjectCriterion};
use crate::model::{EntityKey, GroupId, Permission, PermissionId, Subject, UserId};
use crate::operation::expand_operation_names;
use crate::scope::{KeyExtractors, ScopeMatcher};
use crate::store::{EntitiesGroups, GroupClosure, PermissionStore};

/// What a resolution is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Target {
    /// No particular resource
    Global,
    /// One resource instance
    Entity(EntityKey),
}

impl Default for Target {
    fn default() -> Self {
        Target::Global
    }
}

/// Outcome of taking the first record of an ordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "by", rename_all = "snake_case")]
pub enum Decision {
    Allowed(PermissionId),
    Denied(PermissionId),
    NoRule,
}

impl Decision {
    /// Decide from a list already in precedence order
    pub fn from_ordered(perms: &[Permission]) -> Self {
        match perms.first() {
            Some(p) if p.allow => Decision::Allowed(p.id),
            Some(p) => Decision::Denied(p.id),
            None => Decision::NoRule,
        }
    }

    /// Only an explicit allow grants access
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// Precedence comparator: level desc, deny before allow, id asc
#[inline]
pub fn precedence(a: &Permission, b: &Permission) -> Ordering {
    b.level.cmp(&a.level).then(a.allow.cmp(&b.allow)).then(a.id.cmp(&b.id))
}

/// Sort records into precedence order
pub fn order_by_precedence(perms: &mut [Permission]) {
    perms.sort_by(precedence);
}

pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    closure: Arc<dyn GroupClosure>,
    entities: Arc<dyn EntitiesGroups>,
    extractors: KeyExtractors,
}

impl PermissionResolver {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        closure: Arc<dyn GroupClosure>,
        entities: Arc<dyn EntitiesGroups>,
    ) -> Self {
        PermissionResolver { store, closure, entities, extractors: KeyExtractors::new() }
    }

    /// Use one backend for all three collaborators
    pub fn with_backend<B>(backend: Arc<B>) -> Self
    where
        B: PermissionStore + GroupClosure + EntitiesGroups + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend)
    }

    pub fn with_extractors(mut self, extractors: KeyExtractors) -> Self {
        self.extractors = extractors;
        self
    }

    /// Ordered candidate records for `subject` performing any of `operations` on `target`
    #[instrument(level = "debug", skip_all, fields(subject = %subject, target = ?target))]
    pub fn resolve<S: AsRef<str>>(&self, subject: &Subject, operations: &[S], target: Target) -> Result<Vec<Permission>> {
        subject.validate()?;
        let names = expand_operation_names(operations)?;
        let scope = match target {
            Target::Global => ScopeMatcher::Global,
            Target::Entity(key) => ScopeMatcher::Entity { key, groups: self.entities.entities_groups_of(key)? },
        };
        let filter = Filter::new().subject(self.subject_criterion(subject)?).operations(names).scope(scope);
        self.run(&filter)
    }

    /// Resolve against a host resource via its registered key extractor
    pub fn resolve_for<S: AsRef<str>, T: Any>(&self, subject: &Subject, operations: &[S], resource: &T) -> Result<Vec<Permission>> {
        let key = self.extractors.extract(resource)?;
        self.resolve(subject, operations, Target::Entity(key))
    }

    /// Resolve and take the effective decision
    pub fn decide<S: AsRef<str>>(&self, subject: &Subject, operations: &[S], target: Target) -> Result<Decision> {
        let perms = self.resolve(subject, operations, target)?;
        let d = Decision::from_ordered(&perms);
        debug!(subject = %subject, decision = ?d, candidates = perms.len(), "decided");
        Ok(d)
    }

    /// `true` only when the effective rule is an explicit allow
    pub fn is_allowed<S: AsRef<str>>(&self, subject: &Subject, operations: &[S], target: Target) -> Result<bool> {
        Ok(self.decide(subject, operations, target)?.is_allowed())
    }

    /// Every record written for the user or its groups
    pub fn permissions_for_user(&self, user: UserId) -> Result<Vec<Permission>> {
        let subject = Subject::User(user);
        subject.validate()?;
        self.run(&Filter::new().subject(self.subject_criterion(&subject)?))
    }

    /// Every record, for any subject, on these operations or their ancestors
    pub fn permissions_for_operations<S: AsRef<str>>(&self, operations: &[S]) -> Result<Vec<Permission>> {
        self.run(&Filter::new().operations(expand_operation_names(operations)?))
    }

    /// Records of the user written for this entity or its entities groups; global records excluded
    pub fn permissions_on_entity(&self, user: UserId, key: EntityKey) -> Result<Vec<Permission>> {
        let subject = Subject::User(user);
        subject.validate()?;
        let scope = ScopeMatcher::EntityOnly { key, groups: self.entities.entities_groups_of(key)? };
        self.run(&Filter::new().subject(self.subject_criterion(&subject)?).scope(scope))
    }

    /// Records of any subject written for this entity or its entities groups
    pub fn permissions_for_entity(&self, key: EntityKey) -> Result<Vec<Permission>> {
        let scope = ScopeMatcher::EntityOnly { key, groups: self.entities.entities_groups_of(key)? };
        self.run(&Filter::new().scope(scope))
    }

    /// Records written for exactly this group on the operation or its ancestors
    pub fn permissions_for_group(&self, group: GroupId, operation: &str) -> Result<Vec<Permission>> {
        Subject::Group(group).validate()?;
        let names = expand_operation_names(&[operation])?;
        self.run(&Filter::new().subject(SubjectCriterion::Group(group)).operations(names))
    }

    fn subject_criterion(&self, subject: &Subject) -> Result<SubjectCriterion> {
        Ok(match *subject {
            Subject::User(user) => SubjectCriterion::Closure { user, groups: self.closure.groups_of(user)? },
            Subject::Group(g) => SubjectCriterion::Group(g),
        })
    }

    fn run(&self, filter: &Filter) -> Result<Vec<Permission>> {
        let mut perms = self.store.query(filter)?;
        // Stores may return extra rows; only the filter decides.
        perms.retain(|p| filter.matches(p));
        order_by_precedence(&mut perms);
        debug!(candidates = perms.len(), "resolved permissions");
        Ok(perms)
    }
}
