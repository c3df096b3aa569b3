pub mod rbac;
pub mod user;

use serde::{Deserialize, Serialize};

pub use rbac::{
    Permission, PermissionCreateRequest, Role, RoleCreateRequest, RolePermissionLink,
    RoleUpdateRequest, Verb,
};
pub use user::{
    display_key, LoginRequest, RoleMember, User, UserCreateRequest, UserRoleLink,
    UserUpdateRequest,
};

/// Surrogate identifier assigned by the remote service.
pub type EntityId = i64;

/// Every successful response body is wrapped as `{ "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Body for deletes and logout, which only carry an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: EntityId,
}

/// Persisted entities owned by the remote service.
pub trait Entity {
    /// The entity type name (e.g. "role"), used in log fields and error messages.
    fn entity_type() -> &'static str;

    fn entity_id(&self) -> EntityId;
}
