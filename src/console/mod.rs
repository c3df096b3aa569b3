//! Console views
//!
//! Each view owns the snapshot it last fetched and a `refresh()` that re-reads it
//! from the gateway. Operations catch every gateway error themselves and turn it
//! into a notification or an inline form error, so a failed call always leaves
//! the view usable.

pub mod permissions;
pub mod roles;
pub mod users;

pub use permissions::{PermissionCatalog, PermissionForm};
pub use roles::{RoleDetail, RoleDirectory, RoleForm};
pub use users::{UserDetail, UserDirectory, UserForm};

use crate::authz::Gate;
use crate::gateway::SharedGateway;
use crate::messages;
use crate::models::{EntityId, User};
use crate::notifications::{notify, NotificationBus, NotificationKind};

/// Collaborators shared by every view.
#[derive(Clone)]
pub struct ConsoleContext {
    pub gateway: SharedGateway,
    pub notifications: NotificationBus,
}

impl ConsoleContext {
    pub fn new(gateway: SharedGateway, notifications: NotificationBus) -> Self {
        Self {
            gateway,
            notifications,
        }
    }

    pub(crate) fn success(&self) {
        notify(&self.notifications, NotificationKind::Success, messages::SUCCESS);
    }
}

/// Result of loading a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// The session user may not see this view; nothing was fetched.
    Unauthorized,
    /// The fetch failed and was reported; the previous snapshot is kept.
    Failed,
    Ready,
}

/// A delete waiting for the operator's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: EntityId,
    pub prompt: &'static str,
}

/// Case-insensitive substring match used by the list filters.
pub fn matches_search(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn request_delete(
    gate: Gate,
    user: Option<&User>,
    id: EntityId,
    prompt: &'static str,
) -> Option<PendingDelete> {
    if !gate.allows(user) {
        tracing::debug!(path = gate.path, verb = %gate.verb, "delete not available");
        return None;
    }
    Some(PendingDelete { id, prompt })
}
