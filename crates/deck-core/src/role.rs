//! Participant roles and permission predicates

use serde::{Deserialize, Serialize};

/// Permission level of a participant in a presentation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The presentation's creator; exactly one per session
    Creator,
    /// May add, move and remove slide content
    Editor,
    /// Read-only participant
    Viewer,
}

impl Role {
    /// Whether this role may issue content mutations
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Creator | Role::Editor)
    }

    /// Whether this role may reassign other participants' roles
    pub fn can_manage_roles(self) -> bool {
        matches!(self, Role::Creator)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Viewer
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Creator => write!(f, "creator"),
            Role::Editor => write!(f, "editor"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(Role::Creator),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(crate::Error::InvalidRole(s.to_string())),
        }
    }
}

/// A role that can be granted through a role change.
///
/// `creator` is deliberately absent: nobody is promoted to or demoted from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignableRole {
    Editor,
    Viewer,
}

impl From<AssignableRole> for Role {
    fn from(role: AssignableRole) -> Self {
        match role {
            AssignableRole::Editor => Role::Editor,
            AssignableRole::Viewer => Role::Viewer,
        }
    }
}

impl TryFrom<Role> for AssignableRole {
    type Error = crate::Error;

    fn try_from(role: Role) -> Result<Self, Self::Error> {
        match role {
            Role::Editor => Ok(AssignableRole::Editor),
            Role::Viewer => Ok(AssignableRole::Viewer),
            Role::Creator => Err(crate::Error::UnassignableRole(role.to_string())),
        }
    }
}

impl std::fmt::Display for AssignableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Role::from(*self).fmt(f)
    }
}

impl std::str::FromStr for AssignableRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Role>()?.try_into()
    }
}
