//! Permission records and the identifiers they refer to

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PermError, Result};
use crate::operation::validate_operation_name;

macro_rules! id_type {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A user known to the host application
    UserId
);
id_type!(
    /// A group of users; groups may nest
    GroupId
);
id_type!(
    /// A named collection of resource instances
    EntitiesGroupId
);
id_type!(
    /// Opaque security key of a single resource instance
    EntityKey
);
id_type!(
    /// Identity of a permission record
    PermissionId
);

impl PermissionId {
    /// Draw a fresh random id
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 8];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| PermError::CollaboratorUnavailable(format!("random source: {}", e)))?;
        Ok(PermissionId(u64::from_be_bytes(bytes)))
    }
}

/// Who a permission record is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    User(UserId),
    Group(GroupId),
}

impl Subject {
    /// Reject the zero id, which no host assigns
    pub fn validate(&self) -> Result<()> {
        let raw = match self {
            Subject::User(u) => u.0,
            Subject::Group(g) => g.0,
        };
        if raw == 0 {
            return Err(PermError::invalid(format!("subject {:?} has a zero id", self)));
        }
        Ok(())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(u) => write!(f, "user:{}", u),
            Subject::Group(g) => write!(f, "group:{}", g),
        }
    }
}

/// Which resources a permission record applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Applies everywhere
    Global,
    /// Applies to one resource instance
    Entity(EntityKey),
    /// Applies to every resource in an entities group
    EntitiesGroup(EntitiesGroupId),
}

impl Scope {
    #[inline]
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

/// A single allow or deny decision record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub subject: Subject,
    pub scope: Scope,
    /// Hierarchical operation name, e.g. `/Company/Edit`
    pub operation: String,
    /// Higher is more specific and takes precedence
    pub level: i32,
    /// `false` is an explicit deny
    pub allow: bool,
}

impl Permission {
    /// Build a record with a freshly generated id
    pub fn new(subject: Subject, scope: Scope, operation: &str, level: i32, allow: bool) -> Result<Self> {
        Self::with_id(PermissionId::generate()?, subject, scope, operation, level, allow)
    }

    /// Build a record with a caller-chosen id
    pub fn with_id(
        id: PermissionId,
        subject: Subject,
        scope: Scope,
        operation: &str,
        level: i32,
        allow: bool,
    ) -> Result<Self> {
        subject.validate()?;
        validate_operation_name(operation)?;
        Ok(Permission { id, subject, scope, operation: operation.to_string(), level, allow })
    }
}
