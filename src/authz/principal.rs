use std::collections::{HashMap, HashSet};

use crate::models::{EntityId, User};

/// Principal is a user flattened into the capabilities granted by all held roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: EntityId,
    pub display: String,
    pub roles: HashSet<String>,
    /// path -> verbs granted on it
    pub capabilities: HashMap<String, HashSet<String>>,
}

impl Principal {
    pub fn new(user_id: EntityId) -> Self {
        Self {
            user_id,
            display: String::new(),
            roles: HashSet::new(),
            capabilities: HashMap::new(),
        }
    }

    /// Unions the permissions of every held role; repeated grants collapse.
    pub fn from_user(user: &User) -> Self {
        let mut principal = Self::new(user.id);
        principal.display = user.display_key();
        for role in &user.roles {
            principal.roles.insert(role.name.clone());
            for permission in &role.permissions {
                principal
                    .capabilities
                    .entry(permission.path.clone())
                    .or_default()
                    .insert(permission.verb.clone());
            }
        }
        principal
    }

    pub fn with_capability(mut self, path: impl Into<String>, verb: impl Into<String>) -> Self {
        self.capabilities
            .entry(path.into())
            .or_default()
            .insert(verb.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_capability(&self, path: &str, verb: &str) -> bool {
        self.capabilities
            .get(path)
            .map(|verbs| verbs.contains(verb))
            .unwrap_or(false)
    }

    /// True when no held role carries any permission.
    pub fn is_powerless(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Number of distinct (path, verb) grants.
    pub fn grant_count(&self) -> usize {
        self.capabilities.values().map(HashSet::len).sum()
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::from_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, Role};

    #[test]
    fn duplicate_grants_across_roles_collapse() {
        let user = User::new(7).with_email("ada@example.com").with_roles(vec![
            Role::new(1, "Editor").with_permissions(vec![Permission::new(1, "GET", "/api/roles")]),
            Role::new(2, "Viewer").with_permissions(vec![
                Permission::new(1, "GET", "/api/roles"),
                Permission::new(2, "GET", "/api/users"),
            ]),
        ]);

        let principal = Principal::from_user(&user);
        assert_eq!(principal.grant_count(), 2);
        assert!(principal.has_role("Editor"));
        assert!(principal.has_role("Viewer"));
        assert_eq!(principal.display, "ada@example.com");
    }

    #[test]
    fn roles_without_permissions_leave_principal_powerless() {
        let user = User::new(1).with_roles(vec![Role::new(1, "Empty")]);
        assert!(Principal::from_user(&user).is_powerless());
    }
}
