use serde::{Deserialize, Serialize};

use super::rbac::Role;
use super::{Entity, EntityId};

/// Picks the email when it looks like one, otherwise the username.
pub fn display_key(email: Option<&str>, username: Option<&str>) -> String {
    match email {
        Some(email) if is_plausible_email(email) => email.to_string(),
        _ => username.or(email).unwrap_or_default().to_string(),
    }
}

fn is_plausible_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            name: None,
            email: None,
            username: None,
            roles: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn display_key(&self) -> String {
        display_key(self.email.as_deref(), self.username.as_deref())
    }

    pub fn role_ids(&self) -> Vec<EntityId> {
        self.roles.iter().map(|r| r.id).collect()
    }
}

impl Entity for User {
    fn entity_type() -> &'static str { "user" }
    fn entity_id(&self) -> EntityId { self.id }
}

/// A user as seen from the role side; display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMember {
    pub id: EntityId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl RoleMember {
    pub fn new(id: EntityId, email: Option<&str>, username: Option<&str>) -> Self {
        Self {
            id,
            email: email.map(String::from),
            username: username.map(String::from),
        }
    }

    pub fn display_key(&self) -> String {
        display_key(self.email.as_deref(), self.username.as_deref())
    }
}

impl From<&User> for RoleMember {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreateRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Replaces the user's role list with exactly `roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    pub id: EntityId,
    pub roles: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRoleLink {
    pub user_id: EntityId,
    pub role_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_key_prefers_email() {
        assert_eq!(display_key(Some("ada@example.com"), Some("ada")), "ada@example.com");
    }

    #[test]
    fn display_key_falls_back_to_username() {
        assert_eq!(display_key(None, Some("ada")), "ada");
        assert_eq!(display_key(Some(""), Some("ada")), "ada");
        assert_eq!(display_key(Some("not-an-email"), Some("ada")), "ada");
    }

    #[test]
    fn display_key_keeps_invalid_email_without_username() {
        assert_eq!(display_key(Some("not-an-email"), None), "not-an-email");
        assert_eq!(display_key(None, None), "");
    }
}
