//! Privilege grants

use serde::{Deserialize, Serialize};

use crate::identity::name_sets_match;

/// A privilege grant owned by a schema, table, sequence, function, or view
///
/// Grants have no identity of their own. Compositing appends them and never
/// deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Roles receiving the permissions
    #[serde(default)]
    pub roles: Vec<String>,

    /// Permissions granted (SELECT, INSERT, USAGE, EXECUTE, ...)
    #[serde(default)]
    pub permissions: Vec<String>,

    /// WITH GRANT OPTION
    #[serde(default)]
    pub with_grant_option: bool,
}

impl Grant {
    /// Create a grant of `permissions` to `roles`
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            with_grant_option: false,
        }
    }

    /// Set the grant option
    pub fn with_grant_option(mut self) -> Self {
        self.with_grant_option = true;
        self
    }

    /// Same roles and permissions regardless of order or case
    pub fn equivalent(&self, other: &Grant) -> bool {
        self.with_grant_option == other.with_grant_option
            && name_sets_match(&self.roles, &other.roles)
            && name_sets_match(&self.permissions, &other.permissions)
    }
}
