//! Filter description handed to a permission store.
//!
//! A filter is the conjunction of three criteria, each a disjunction:
//! subject ∈ set, operation ∈ set, scope matched by a [`ScopeMatcher`].
//! Stores may use any part of it to drive an index and must apply
//! [`Filter::matches`] to whatever they return.

use std::collections::BTreeSet;

use crate::model::{GroupId, Permission, Subject, UserId};
use crate::scope::ScopeMatcher;

/// Which subjects a record may be written for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectCriterion {
    Any,
    /// The user or any group in its closure
    Closure { user: UserId, groups: BTreeSet<GroupId> },
    /// Exactly this group
    Group(GroupId),
}

impl SubjectCriterion {
    #[inline]
    pub fn matches(&self, subject: &Subject) -> bool {
        match (self, subject) {
            (SubjectCriterion::Any, _) => true,
            (SubjectCriterion::Closure { user, .. }, Subject::User(u)) => u == user,
            (SubjectCriterion::Closure { groups, .. }, Subject::Group(g)) => groups.contains(g),
            (SubjectCriterion::Group(want), Subject::Group(g)) => g == want,
            (SubjectCriterion::Group(_), Subject::User(_)) => false,
        }
    }
}

/// Which operation names a record may carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationCriterion {
    Any,
    /// One of these names, already expanded with ancestors
    In(BTreeSet<String>),
}

impl OperationCriterion {
    #[inline]
    pub fn matches(&self, operation: &str) -> bool {
        match self {
            OperationCriterion::Any => true,
            OperationCriterion::In(names) => names.contains(operation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub subject: SubjectCriterion,
    pub operation: OperationCriterion,
    pub scope: ScopeMatcher,
}

impl Default for Filter {
    fn default() -> Self {
        Filter { subject: SubjectCriterion::Any, operation: OperationCriterion::Any, scope: ScopeMatcher::Any }
    }
}

impl Filter {
    /// A filter that accepts every record
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, c: SubjectCriterion) -> Self {
        self.subject = c;
        self
    }

    pub fn operations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operation = OperationCriterion::In(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn scope(mut self, m: ScopeMatcher) -> Self {
        self.scope = m;
        self
    }

    /// Evaluate the filter against one record
    #[inline]
    pub fn matches(&self, p: &Permission) -> bool {
        self.subject.matches(&p.subject) && self.operation.matches(&p.operation) && self.scope.matches(&p.scope)
    }

    /// Names to scan when the store indexes by operation
    pub fn operation_names(&self) -> Option<&BTreeSet<String>> {
        match &self.operation {
            OperationCriterion::Any => None,
            OperationCriterion::In(names) => Some(names),
        }
    }
}
