//! Assignment Workflow
//!
//! One state machine per assignment widget:
//!
//! ```text
//! Idle -> Selecting -> Confirming -> Submitting -> Idle       (success)
//!                          |              \------> Selecting  (failure, selection kept)
//!                          \-> Selecting                      (dismissed, nothing sent)
//! ```
//!
//! A submission sends the complete target id list for the owning role or user:
//! the ids of the snapshot the operator is looking at, followed by the selected
//! ids. A grant added elsewhere after that snapshot was fetched is dropped by the
//! write. The workflow never patches local state; the owning view refreshes after
//! a `Submitted` or any finished removal.

use std::collections::HashSet;

use crate::authz::{gates, Gate};
use crate::differ::{selected_ids, CandidateOption};
use crate::errors::ConsoleResult;
use crate::gateway::MutationGateway;
use crate::messages;
use crate::models::{EntityId, RolePermissionLink, RoleUpdateRequest, User, UserRoleLink, UserUpdateRequest};
use crate::notifications::{notify, report, NotificationBus, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Selecting,
    Confirming,
    Submitting,
}

/// What is being assigned to what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    /// Permissions onto a role
    RolePermissions,
    /// Roles onto a user
    UserRoles,
}

impl AssignmentKind {
    pub fn gate(&self) -> Gate {
        match self {
            AssignmentKind::RolePermissions => gates::ASSIGN_PERMISSIONS,
            AssignmentKind::UserRoles => gates::ASSIGN_ROLES,
        }
    }

    /// Prompt key; singular and plural selections read differently.
    pub fn confirm_key(&self, count: usize) -> &'static str {
        match (self, count) {
            (AssignmentKind::RolePermissions, 1) => messages::CONFIRM_ASSIGN_PERMISSION,
            (AssignmentKind::RolePermissions, _) => messages::CONFIRM_ASSIGN_PERMISSIONS,
            (AssignmentKind::UserRoles, 1) => messages::CONFIRM_ASSIGN_ROLE,
            (AssignmentKind::UserRoles, _) => messages::CONFIRM_ASSIGN_ROLES,
        }
    }

    pub fn empty_selection_key(&self) -> &'static str {
        match self {
            AssignmentKind::RolePermissions => messages::NO_PERMISSION_ADDED,
            AssignmentKind::UserRoles => messages::NO_ROLE_ADDED,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            AssignmentKind::RolePermissions => "update_role",
            AssignmentKind::UserRoles => "update_user",
        }
    }

    async fn submit(
        &self,
        gateway: &dyn MutationGateway,
        owner_id: EntityId,
        ids: Vec<EntityId>,
    ) -> ConsoleResult<()> {
        match self {
            AssignmentKind::RolePermissions => {
                gateway
                    .update_role(&RoleUpdateRequest { id: owner_id, permissions: ids })
                    .await
            }
            AssignmentKind::UserRoles => {
                gateway
                    .update_user(&UserUpdateRequest { id: owner_id, roles: ids })
                    .await
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The write went through; the owner must be refetched.
    Submitted,
    /// The write failed and was reported; the selection is still there.
    Failed,
    /// Nothing was sent.
    NotSubmitted,
}

/// Full target id list: `assigned` first, then new selections, without repeats.
pub fn target_ids(assigned: &[EntityId], selection: &[CandidateOption]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    assigned
        .iter()
        .copied()
        .chain(selected_ids(selection))
        .filter(|id| seen.insert(*id))
        .collect()
}

pub struct AssignmentWorkflow {
    kind: AssignmentKind,
    state: WorkflowState,
    selection: Vec<CandidateOption>,
    notifications: NotificationBus,
}

impl AssignmentWorkflow {
    pub fn new(kind: AssignmentKind, notifications: NotificationBus) -> Self {
        Self {
            kind,
            state: WorkflowState::Idle,
            selection: Vec::new(),
            notifications,
        }
    }

    pub fn kind(&self) -> AssignmentKind {
        self.kind
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn selection(&self) -> &[CandidateOption] {
        &self.selection
    }

    /// Replaces the selection. Ignored while a confirmation or submission is open.
    pub fn select(&mut self, options: Vec<CandidateOption>) {
        if matches!(self.state, WorkflowState::Confirming | WorkflowState::Submitting) {
            tracing::debug!(state = ?self.state, "selection change ignored");
            return;
        }
        self.selection = options;
        self.state = if self.selection.is_empty() {
            WorkflowState::Idle
        } else {
            WorkflowState::Selecting
        };
    }

    /// Whether the submit control is enabled for `user`.
    pub fn can_submit(&self, user: Option<&User>) -> bool {
        self.state == WorkflowState::Selecting
            && !self.selection.is_empty()
            && self.kind.gate().allows(user)
    }

    /// Moves to `Confirming` and returns the prompt key, or stays put and
    /// returns `None` when there is nothing to submit or the user lacks the
    /// capability.
    pub fn request_submit(&mut self, user: Option<&User>) -> Option<&'static str> {
        if self.selection.is_empty() {
            notify(
                &self.notifications,
                NotificationKind::Info,
                self.kind.empty_selection_key(),
            );
            self.state = WorkflowState::Idle;
            return None;
        }
        if !self.can_submit(user) {
            tracing::debug!(kind = ?self.kind, state = ?self.state, "submit not available");
            return None;
        }
        self.state = WorkflowState::Confirming;
        self.prompt()
    }

    pub fn prompt(&self) -> Option<&'static str> {
        match self.state {
            WorkflowState::Confirming => Some(self.kind.confirm_key(self.selection.len())),
            _ => None,
        }
    }

    /// The operator closed the prompt without confirming.
    pub fn dismiss(&mut self) {
        if self.state == WorkflowState::Confirming {
            self.state = WorkflowState::Selecting;
        }
    }

    /// Sends the confirmed assignment for `owner_id`, whose current assignment
    /// snapshot is `assigned`.
    pub async fn confirm(
        &mut self,
        gateway: &dyn MutationGateway,
        owner_id: EntityId,
        assigned: &[EntityId],
    ) -> SubmitOutcome {
        if self.state != WorkflowState::Confirming {
            return SubmitOutcome::NotSubmitted;
        }

        self.state = WorkflowState::Submitting;
        let ids = target_ids(assigned, &self.selection);
        tracing::info!(
            kind = ?self.kind,
            owner_id,
            selected = self.selection.len(),
            total = ids.len(),
            "submitting assignment"
        );

        match self.kind.submit(gateway, owner_id, ids).await {
            Ok(()) => {
                self.selection.clear();
                self.state = WorkflowState::Idle;
                notify(&self.notifications, NotificationKind::Success, messages::SUCCESS);
                SubmitOutcome::Submitted
            }
            Err(err) => {
                report(&self.notifications, self.kind.operation(), &err);
                self.state = WorkflowState::Selecting;
                SubmitOutcome::Failed
            }
        }
    }
}

// =============================================================================
// RELATIONSHIP REMOVAL
// =============================================================================

/// A single relationship row pending removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRemoval {
    RolePermission(RolePermissionLink),
    UserRole(UserRoleLink),
}

impl PendingRemoval {
    pub fn gate(&self) -> Gate {
        match self {
            PendingRemoval::RolePermission(_) => gates::REMOVE_ROLE_PERMISSION,
            PendingRemoval::UserRole(_) => gates::REMOVE_USER_ROLE,
        }
    }

    pub fn confirm_key(&self) -> &'static str {
        match self {
            PendingRemoval::RolePermission(_) => messages::CONFIRM_DELETE,
            PendingRemoval::UserRole(_) => messages::CONFIRM_DELETE_ROLE_LINK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    Failed,
    NotRequested,
}

impl RemovalOutcome {
    /// Removal refetches the owner whether or not the delete went through.
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, RemovalOutcome::NotRequested)
    }
}

/// Two-state removal flow: `Idle -> Confirming -> Idle`.
pub struct RelationshipRemoval {
    pending: Option<PendingRemoval>,
    notifications: NotificationBus,
}

impl RelationshipRemoval {
    pub fn new(notifications: NotificationBus) -> Self {
        Self {
            pending: None,
            notifications,
        }
    }

    pub fn pending(&self) -> Option<PendingRemoval> {
        self.pending
    }

    pub fn is_confirming(&self) -> bool {
        self.pending.is_some()
    }

    pub fn request(&mut self, user: Option<&User>, removal: PendingRemoval) -> Option<&'static str> {
        if !removal.gate().allows(user) {
            tracing::debug!(removal = ?removal, "removal not available");
            return None;
        }
        self.pending = Some(removal);
        Some(removal.confirm_key())
    }

    pub fn dismiss(&mut self) {
        self.pending = None;
    }

    pub async fn confirm(&mut self, gateway: &dyn MutationGateway) -> RemovalOutcome {
        let Some(removal) = self.pending.take() else {
            return RemovalOutcome::NotRequested;
        };

        let (operation, result) = match &removal {
            PendingRemoval::RolePermission(link) => {
                ("delete_role_permission", gateway.delete_role_permission(link).await)
            }
            PendingRemoval::UserRole(link) => ("delete_user_role", gateway.delete_user_role(link).await),
        };

        match result {
            Ok(()) => {
                tracing::info!(removal = ?removal, "relationship removed");
                notify(&self.notifications, NotificationKind::Success, messages::SUCCESS);
                RemovalOutcome::Removed
            }
            Err(err) => {
                report(&self.notifications, operation, &err);
                RemovalOutcome::Failed
            }
        }
    }
}
