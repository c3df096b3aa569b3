use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::user::RoleMember;
use super::{Entity, EntityId};
use crate::errors::{ConsoleError, ValidationItem};

// =============================================================================
// VERB
// =============================================================================

/// HTTP verbs a permission can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    #[default]
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Verb {
    /// Options offered by the create-permission form, in display order.
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Patch, Verb::Put, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the exact uppercase spelling only; `"get"` is rejected.
impl FromStr for Verb {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| {
                ConsoleError::validation([ValidationItem::new(
                    "invalid_verb",
                    serde_json::Value::String(s.to_string()),
                )])
            })
    }
}

// =============================================================================
// PERMISSION
// =============================================================================

/// A grant of one verb on one resource path.
///
/// `verb` is kept as the service sent it. Comparisons are exact, so a stored
/// `"get"` never matches a check for `GET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: EntityId,
    pub verb: String,
    pub path: String,
}

impl Permission {
    pub fn new(id: EntityId, verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            verb: verb.into(),
            path: path.into(),
        }
    }

    /// Semantic identity: two permissions are the same grant iff both fields match.
    pub fn same_grant(&self, other: &Permission) -> bool {
        self.path == other.path && self.verb == other.verb
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.verb, self.path)
    }
}

impl Entity for Permission {
    fn entity_type() -> &'static str { "permission" }
    fn entity_id(&self) -> EntityId { self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCreateRequest {
    pub verb: Verb,
    pub path: String,
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub users: Vec<RoleMember>,
}

impl Role {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            permissions: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = RoleMember>) -> Self {
        self.users = users.into_iter().collect();
        self
    }

    pub fn permission_ids(&self) -> Vec<EntityId> {
        self.permissions.iter().map(|p| p.id).collect()
    }

    /// Member display keys, uppercased the way the role directory lists them.
    pub fn member_labels(&self) -> Vec<String> {
        self.users.iter().map(|m| m.display_key().to_uppercase()).collect()
    }
}

impl Entity for Role {
    fn entity_type() -> &'static str { "role" }
    fn entity_id(&self) -> EntityId { self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCreateRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Replaces the role's permission list with exactly `permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdateRequest {
    pub id: EntityId,
    pub permissions: Vec<EntityId>,
}

// =============================================================================
// ROLE-PERMISSION LINK
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolePermissionLink {
    pub role_id: EntityId,
    pub permission_id: EntityId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_parses_exact_spelling_only() {
        assert_eq!("DELETE".parse::<Verb>().ok(), Some(Verb::Delete));
        assert!("delete".parse::<Verb>().is_err());
        assert!("OPTIONS".parse::<Verb>().is_err());
    }

    #[test]
    fn verb_serializes_uppercase() {
        let json = serde_json::to_string(&Verb::Patch).unwrap();
        assert_eq!(json, "\"PATCH\"");
    }

    #[test]
    fn same_grant_ignores_surrogate_id() {
        let a = Permission::new(1, "GET", "/api/roles");
        let b = Permission::new(9, "GET", "/api/roles");
        let c = Permission::new(1, "POST", "/api/roles");
        assert!(a.same_grant(&b));
        assert!(!a.same_grant(&c));
    }

    #[test]
    fn role_decodes_without_relationships() {
        let role: Role = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Editor"
        }))
        .unwrap();
        assert!(role.permissions.is_empty());
        assert!(role.users.is_empty());
        assert_eq!(role.description, None);
    }

    #[test]
    fn member_labels_uppercase_display_keys() {
        let role = Role::new(1, "Editor").with_users(vec![
            RoleMember::new(1, Some("ada@example.com"), Some("ada")),
            RoleMember::new(2, None, Some("grace")),
        ]);
        assert_eq!(role.member_labels(), vec!["ADA@EXAMPLE.COM", "GRACE"]);
    }
}
