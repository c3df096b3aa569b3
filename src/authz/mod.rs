//! Authorization module - Capability Evaluator
//!
//! Decides which console actions a user may attempt, based on the
//! (verb, path) permissions carried by the user's roles:
//! - no user, or no permissions at all -> deny
//! - exact, case-sensitive path and verb match -> allow
//! - no verb hierarchy; GET does not imply anything else
//!
//! The result only drives what the interface shows. The remote service
//! enforces the real policy.

mod evaluator;
mod principal;

pub use evaluator::{can_perform, can_view, CapabilityEvaluator, DefaultCapabilityEvaluator};
pub use principal::Principal;

use crate::models::{User, Verb};

/// Well-known resource paths
pub mod paths {
    pub const PERMISSIONS: &str = "/api/permissions";
    pub const ROLES: &str = "/api/roles";
    pub const ROLE_PERMISSIONS: &str = "/api/rolepermissions";
    pub const USER_ROLES: &str = "/api/userroles";
    pub const USERS: &str = "/api/users";
    pub const LOGIN: &str = "/auth/login";
    pub const LOGOUT: &str = "/auth/logout";
    pub const PAGES: &str = "/pages";
    pub const CURRENT_USER: &str = "/auth/currentUser";
}

/// A (path, verb) pair guarding one console action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub path: &'static str,
    pub verb: Verb,
}

impl Gate {
    pub const fn new(path: &'static str, verb: Verb) -> Self {
        Self { path, verb }
    }

    pub fn allows(&self, user: Option<&User>) -> bool {
        can_perform(user, self.path, Some(self.verb.as_str()))
    }
}

/// Gates used by the console views
pub mod gates {
    use super::{paths, Gate};
    use crate::models::Verb;

    // Permission catalog
    pub const VIEW_PERMISSIONS: Gate = Gate::new(paths::PERMISSIONS, Verb::Get);
    pub const CREATE_PERMISSION: Gate = Gate::new(paths::PERMISSIONS, Verb::Post);
    pub const DELETE_PERMISSION: Gate = Gate::new(paths::PERMISSIONS, Verb::Delete);

    // Role and user directories
    pub const VIEW_DIRECTORY: Gate = Gate::new(paths::PAGES, Verb::Get);
    pub const MANAGE_DIRECTORY: Gate = Gate::new(paths::PAGES, Verb::Post);

    // Role detail
    pub const VIEW_ROLE: Gate = Gate::new(paths::ROLES, Verb::Get);
    pub const ASSIGN_PERMISSIONS: Gate = Gate::new(paths::ROLES, Verb::Post);
    pub const REMOVE_ROLE_PERMISSION: Gate = Gate::new(paths::ROLES, Verb::Delete);

    // User detail
    pub const VIEW_USER: Gate = Gate::new(paths::USERS, Verb::Get);
    pub const ASSIGN_ROLES: Gate = Gate::new(paths::USERS, Verb::Post);
    pub const REMOVE_USER_ROLE: Gate = Gate::new(paths::USERS, Verb::Delete);
}
