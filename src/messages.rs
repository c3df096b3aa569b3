//! Message keys handed to the text lookup layer.
//!
//! Nothing in this crate renders translated strings. Notifications, confirmation
//! prompts and inline errors carry one of these keys and the presentation layer
//! resolves it.

// Shared
pub const SUCCESS: &str = "shared:success";
pub const FAIL: &str = "shared:fail";
pub const INTERNAL_ERROR: &str = "shared:internalError";
pub const INVALID_INPUT: &str = "shared:invalidInput";
pub const UNAUTHORIZED: &str = "unauthorized";

// Assignment
pub const NO_PERMISSION_ADDED: &str = "noPermissionAdded";
pub const NO_ROLE_ADDED: &str = "noRoleAdded";
pub const CONFIRM_ASSIGN_PERMISSION: &str = "confirmAssignPerm";
pub const CONFIRM_ASSIGN_PERMISSIONS: &str = "confirmAssignPerms";
pub const CONFIRM_ASSIGN_ROLE: &str = "confirmAssignRole";
pub const CONFIRM_ASSIGN_ROLES: &str = "confirmAssignRoles";

// Deletion
pub const CONFIRM_DELETE: &str = "confirmDel";
pub const CONFIRM_DELETE_ROLE_LINK: &str = "confirmDelRole";
pub const CONFIRM_ROLE_DELETE: &str = "confirmRoleDelete";
pub const CONFIRM_USER_DELETE: &str = "confirmUserDelete";
