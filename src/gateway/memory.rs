//! In-memory implementation of the mutation gateway.
//!
//! Holds permissions, roles, users and the two link tables in `BTreeMap`s and
//! `BTreeSet`s behind one `tokio::sync::RwLock`, and assembles the nested
//! aggregates (role with permissions and members, user with roles) on every
//! read, the way the remote service does. It exists for:
//! - tests, which can inspect every call it received
//! - the CLI's demo mode, which runs without a backend
//!
//! Ids are assigned from one counter shared by all entity types. Role and user
//! updates replace the whole relationship set with the submitted id list.
//! `fail_next` makes the next call return a chosen error without touching state.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::MutationGateway;
use crate::errors::{ConsoleError, ConsoleResult, ValidationItem};
use crate::models::{
    Entity, EntityId, LoginRequest, Permission, PermissionCreateRequest, Role,
    RoleCreateRequest, RoleMember, RolePermissionLink, RoleUpdateRequest, User,
    UserCreateRequest, UserRoleLink, UserUpdateRequest,
};

/// A call received by the in-memory gateway, with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ListPermissions,
    CreatePermission(PermissionCreateRequest),
    DeletePermission(EntityId),
    ListRoles,
    GetRole(EntityId),
    CreateRole(RoleCreateRequest),
    UpdateRole(RoleUpdateRequest),
    DeleteRole(EntityId),
    DeleteRolePermission(RolePermissionLink),
    ListUsers,
    GetUser(EntityId),
    CreateUser(UserCreateRequest),
    UpdateUser(UserUpdateRequest),
    DeleteUser(EntityId),
    DeleteUserRole(UserRoleLink),
    Login(String),
    Logout(EntityId),
    CurrentUser,
}

impl RecordedCall {
    /// True for calls that change state on the service.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            RecordedCall::ListPermissions
                | RecordedCall::ListRoles
                | RecordedCall::GetRole(_)
                | RecordedCall::ListUsers
                | RecordedCall::GetUser(_)
                | RecordedCall::CurrentUser
        )
    }
}

#[derive(Debug, Clone)]
struct StoredRole {
    id: EntityId,
    name: String,
    description: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: EntityId,
    name: String,
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: EntityId,
    permissions: BTreeMap<EntityId, Permission>,
    roles: BTreeMap<EntityId, StoredRole>,
    users: BTreeMap<EntityId, StoredUser>,
    role_permissions: BTreeSet<(EntityId, EntityId)>,
    user_roles: BTreeSet<(EntityId, EntityId)>,
    session: Option<EntityId>,
    fail_next: Option<ConsoleError>,
    calls: Vec<RecordedCall>,
}

impl State {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    /// Records the call, then consumes a pending injected failure if any.
    fn begin(&mut self, call: RecordedCall) -> ConsoleResult<()> {
        self.calls.push(call);
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn role_permissions(&self, role_id: EntityId) -> Vec<Permission> {
        self.role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| self.permissions.get(p).cloned())
            .collect()
    }

    fn role_members(&self, role_id: EntityId) -> Vec<RoleMember> {
        self.user_roles
            .iter()
            .filter(|(_, r)| *r == role_id)
            .filter_map(|(u, _)| self.users.get(u))
            .map(|u| RoleMember::new(u.id, Some(u.email.as_str()), Some(u.username.as_str())))
            .collect()
    }

    fn assemble_role(&self, stored: &StoredRole) -> Role {
        Role {
            id: stored.id,
            name: stored.name.clone(),
            description: stored.description.clone(),
            permissions: self.role_permissions(stored.id),
            users: self.role_members(stored.id),
        }
    }

    fn assemble_user(&self, stored: &StoredUser) -> User {
        let roles = self
            .user_roles
            .iter()
            .filter(|(u, _)| *u == stored.id)
            .filter_map(|(_, r)| self.roles.get(r))
            .map(|r| Role {
                id: r.id,
                name: r.name.clone(),
                description: r.description.clone(),
                permissions: self.role_permissions(r.id),
                users: Vec::new(),
            })
            .collect();

        User {
            id: stored.id,
            name: Some(stored.name.clone()),
            email: Some(stored.email.clone()),
            username: Some(stored.username.clone()),
            roles,
        }
    }

    fn role(&self, id: EntityId) -> ConsoleResult<&StoredRole> {
        self.roles.get(&id).ok_or_else(|| not_found::<Role>(id))
    }

    fn user(&self, id: EntityId) -> ConsoleResult<&StoredUser> {
        self.users.get(&id).ok_or_else(|| not_found::<User>(id))
    }
}

fn not_found<T: Entity>(id: EntityId) -> ConsoleError {
    ConsoleError::unknown(format!("404: {} {id} not found", T::entity_type()))
}

fn required(field: &str) -> ValidationItem {
    ValidationItem::for_field("required", field)
}

fn unknown_ids(code: &str, ids: &[EntityId]) -> ConsoleError {
    ConsoleError::validation([ValidationItem::new(code, serde_json::json!({ "ids": ids }))])
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: RwLock<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call fail with `err`. The call is still recorded.
    pub async fn fail_next(&self, err: ConsoleError) {
        self.state.write().await.fail_next = Some(err);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    pub async fn seed_permission(&self, verb: &str, path: &str) -> Permission {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let permission = Permission::new(id, verb, path);
        state.permissions.insert(id, permission.clone());
        permission
    }

    pub async fn seed_role(&self, name: &str, permission_ids: &[EntityId]) -> Role {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let stored = StoredRole {
            id,
            name: name.to_string(),
            description: None,
        };
        state.roles.insert(id, stored.clone());
        for pid in permission_ids {
            state.role_permissions.insert((id, *pid));
        }
        state.assemble_role(&stored)
    }

    pub async fn seed_user(&self, email: &str, password: &str, role_ids: &[EntityId]) -> User {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let username = email.split('@').next().unwrap_or(email).to_string();
        let stored = StoredUser {
            id,
            name: username.clone(),
            username,
            email: email.to_string(),
            password: password.to_string(),
        };
        state.users.insert(id, stored.clone());
        for rid in role_ids {
            state.user_roles.insert((id, *rid));
        }
        state.assemble_user(&stored)
    }

    /// Adds a permission link behind the console's back, as another operator would.
    pub async fn link_role_permission(&self, role_id: EntityId, permission_id: EntityId) {
        self.state
            .write()
            .await
            .role_permissions
            .insert((role_id, permission_id));
    }

    /// Signs `user_id` in without a login call.
    pub async fn set_session(&self, user_id: Option<EntityId>) {
        self.state.write().await.session = user_id;
    }
}

#[async_trait]
impl MutationGateway for InMemoryGateway {
    async fn list_permissions(&self) -> ConsoleResult<Vec<Permission>> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::ListPermissions)?;
        Ok(state.permissions.values().cloned().collect())
    }

    async fn create_permission(&self, req: &PermissionCreateRequest) -> ConsoleResult<Permission> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::CreatePermission(req.clone()))?;

        let path = req.path.trim();
        if path.is_empty() {
            return Err(ConsoleError::validation([required("path")]));
        }
        let verb = req.verb.as_str();
        if state
            .permissions
            .values()
            .any(|p| p.path == path && p.verb == verb)
        {
            return Err(ConsoleError::validation([ValidationItem::new(
                "duplicate",
                serde_json::json!({ "verb": verb, "path": path }),
            )]));
        }

        let id = state.allocate_id();
        let permission = Permission::new(id, verb, path);
        state.permissions.insert(id, permission.clone());
        tracing::debug!(permission_id = id, "permission created");
        Ok(permission)
    }

    async fn delete_permission(&self, id: EntityId) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::DeletePermission(id))?;
        state
            .permissions
            .remove(&id)
            .ok_or_else(|| not_found::<Permission>(id))?;
        state.role_permissions.retain(|(_, p)| *p != id);
        Ok(())
    }

    async fn list_roles(&self) -> ConsoleResult<Vec<Role>> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::ListRoles)?;
        Ok(state.roles.values().map(|r| state.assemble_role(r)).collect())
    }

    async fn get_role(&self, id: EntityId) -> ConsoleResult<Role> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::GetRole(id))?;
        let stored = state.role(id)?;
        Ok(state.assemble_role(stored))
    }

    async fn create_role(&self, req: &RoleCreateRequest) -> ConsoleResult<Role> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::CreateRole(req.clone()))?;

        // Duplicate names are accepted; nothing upstream enforces uniqueness.
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ConsoleError::validation([required("name")]));
        }

        let id = state.allocate_id();
        let stored = StoredRole {
            id,
            name: name.to_string(),
            description: req.description.clone().filter(|d| !d.trim().is_empty()),
        };
        state.roles.insert(id, stored.clone());
        tracing::debug!(role_id = id, "role created");
        Ok(state.assemble_role(&stored))
    }

    async fn update_role(&self, req: &RoleUpdateRequest) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::UpdateRole(req.clone()))?;
        state.role(req.id)?;

        let missing: Vec<EntityId> = req
            .permissions
            .iter()
            .copied()
            .filter(|pid| !state.permissions.contains_key(pid))
            .collect();
        if !missing.is_empty() {
            return Err(unknown_ids("unknown_permission", &missing));
        }

        state.role_permissions.retain(|(r, _)| *r != req.id);
        for pid in &req.permissions {
            state.role_permissions.insert((req.id, *pid));
        }
        Ok(())
    }

    async fn delete_role(&self, id: EntityId) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::DeleteRole(id))?;
        state.roles.remove(&id).ok_or_else(|| not_found::<Role>(id))?;
        state.role_permissions.retain(|(r, _)| *r != id);
        state.user_roles.retain(|(_, r)| *r != id);
        Ok(())
    }

    async fn delete_role_permission(&self, link: &RolePermissionLink) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::DeleteRolePermission(*link))?;
        if !state
            .role_permissions
            .remove(&(link.role_id, link.permission_id))
        {
            return Err(ConsoleError::unknown(format!(
                "404: role {} has no permission {}",
                link.role_id, link.permission_id
            )));
        }
        Ok(())
    }

    async fn list_users(&self) -> ConsoleResult<Vec<User>> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::ListUsers)?;
        Ok(state.users.values().map(|u| state.assemble_user(u)).collect())
    }

    async fn get_user(&self, id: EntityId) -> ConsoleResult<User> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::GetUser(id))?;
        let stored = state.user(id)?;
        Ok(state.assemble_user(stored))
    }

    async fn create_user(&self, req: &UserCreateRequest) -> ConsoleResult<User> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::CreateUser(req.clone()))?;

        let mut problems = Vec::new();
        for (field, value) in [
            ("name", &req.name),
            ("username", &req.username),
            ("email", &req.email),
            ("password", &req.password),
        ] {
            if value.trim().is_empty() {
                problems.push(required(field));
            }
        }
        let email = req.email.trim();
        let malformed = email
            .split_once('@')
            .map_or(true, |(local, domain)| local.is_empty() || domain.is_empty());
        if !email.is_empty() && malformed {
            problems.push(ValidationItem::for_field("invalid_email", "email"));
        }
        if !problems.is_empty() {
            return Err(ConsoleError::Validation(problems));
        }

        let id = state.allocate_id();
        let stored = StoredUser {
            id,
            name: req.name.trim().to_string(),
            username: req.username.trim().to_string(),
            email: req.email.trim().to_string(),
            password: req.password.clone(),
        };
        state.users.insert(id, stored.clone());
        tracing::debug!(user_id = id, "user created");
        Ok(state.assemble_user(&stored))
    }

    async fn update_user(&self, req: &UserUpdateRequest) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::UpdateUser(req.clone()))?;
        state.user(req.id)?;

        let missing: Vec<EntityId> = req
            .roles
            .iter()
            .copied()
            .filter(|rid| !state.roles.contains_key(rid))
            .collect();
        if !missing.is_empty() {
            return Err(unknown_ids("unknown_role", &missing));
        }

        state.user_roles.retain(|(u, _)| *u != req.id);
        for rid in &req.roles {
            state.user_roles.insert((req.id, *rid));
        }
        Ok(())
    }

    async fn delete_user(&self, id: EntityId) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::DeleteUser(id))?;
        state.users.remove(&id).ok_or_else(|| not_found::<User>(id))?;
        state.user_roles.retain(|(u, _)| *u != id);
        if state.session == Some(id) {
            state.session = None;
        }
        Ok(())
    }

    async fn delete_user_role(&self, link: &UserRoleLink) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::DeleteUserRole(*link))?;
        if !state.user_roles.remove(&(link.user_id, link.role_id)) {
            return Err(ConsoleError::unknown(format!(
                "404: user {} does not hold role {}",
                link.user_id, link.role_id
            )));
        }
        Ok(())
    }

    async fn login(&self, req: &LoginRequest) -> ConsoleResult<User> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::Login(req.email.clone()))?;

        let stored = state
            .users
            .values()
            .find(|u| u.email == req.email && u.password == req.password)
            .cloned()
            .ok_or_else(|| ConsoleError::auth("invalid credentials"))?;
        state.session = Some(stored.id);
        Ok(state.assemble_user(&stored))
    }

    async fn logout(&self, user_id: EntityId) -> ConsoleResult<()> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::Logout(user_id))?;
        state.session = None;
        Ok(())
    }

    async fn current_user(&self) -> ConsoleResult<User> {
        let mut state = self.state.write().await;
        state.begin(RecordedCall::CurrentUser)?;
        let id = state
            .session
            .ok_or_else(|| ConsoleError::auth("no session"))?;
        let stored = state.user(id)?;
        Ok(state.assemble_user(stored))
    }
}
