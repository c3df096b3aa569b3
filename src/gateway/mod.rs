//! Mutation Gateway: the only way to read or write entities.
//!
//! The remote service owns every entity and every relationship. Callers treat
//! whatever they get back as a snapshot for the current render and re-read after
//! each write. Role and user updates carry the complete target id list, so two
//! writers racing on the same aggregate resolve as last-write-wins.

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{InMemoryGateway, RecordedCall};

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ConsoleResult;
use crate::models::{
    EntityId, LoginRequest, Permission, PermissionCreateRequest, Role, RoleCreateRequest,
    RolePermissionLink, RoleUpdateRequest, User, UserCreateRequest, UserRoleLink,
    UserUpdateRequest,
};

#[async_trait]
pub trait MutationGateway: Send + Sync {
    // Permissions
    async fn list_permissions(&self) -> ConsoleResult<Vec<Permission>>;
    async fn create_permission(&self, req: &PermissionCreateRequest) -> ConsoleResult<Permission>;
    async fn delete_permission(&self, id: EntityId) -> ConsoleResult<()>;

    // Roles
    async fn list_roles(&self) -> ConsoleResult<Vec<Role>>;
    async fn get_role(&self, id: EntityId) -> ConsoleResult<Role>;
    async fn create_role(&self, req: &RoleCreateRequest) -> ConsoleResult<Role>;
    async fn update_role(&self, req: &RoleUpdateRequest) -> ConsoleResult<()>;
    async fn delete_role(&self, id: EntityId) -> ConsoleResult<()>;
    async fn delete_role_permission(&self, link: &RolePermissionLink) -> ConsoleResult<()>;

    // Users
    async fn list_users(&self) -> ConsoleResult<Vec<User>>;
    async fn get_user(&self, id: EntityId) -> ConsoleResult<User>;
    async fn create_user(&self, req: &UserCreateRequest) -> ConsoleResult<User>;
    async fn update_user(&self, req: &UserUpdateRequest) -> ConsoleResult<()>;
    async fn delete_user(&self, id: EntityId) -> ConsoleResult<()>;
    async fn delete_user_role(&self, link: &UserRoleLink) -> ConsoleResult<()>;

    // Session
    async fn login(&self, req: &LoginRequest) -> ConsoleResult<User>;
    async fn logout(&self, user_id: EntityId) -> ConsoleResult<()>;
    async fn current_user(&self) -> ConsoleResult<User>;
}

pub type SharedGateway = Arc<dyn MutationGateway>;
