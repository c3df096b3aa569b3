use super::{matches_search, request_delete, ConsoleContext, PendingDelete, ViewStatus};
use crate::authz::gates;
use crate::differ::{unassigned_permissions, CandidateOption};
use crate::errors::{ErrorSurface, ValidationItem};
use crate::messages;
use crate::models::{EntityId, Permission, Role, RoleCreateRequest, RolePermissionLink, User};
use crate::notifications::report;
use crate::workflow::{
    AssignmentKind, AssignmentWorkflow, PendingRemoval, RelationshipRemoval, RemovalOutcome,
    SubmitOutcome,
};

// =============================================================================
// ROLE DIRECTORY
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleForm {
    pub name: String,
    pub description: String,
    pub errors: Vec<ValidationItem>,
}

impl RoleForm {
    fn request(&self) -> RoleCreateRequest {
        let description = self.description.trim();
        RoleCreateRequest {
            name: self.name.clone(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }
}

/// The role list page.
pub struct RoleDirectory {
    ctx: ConsoleContext,
    roles: Vec<Role>,
    loading: bool,
    search: String,
    pub form: RoleForm,
    pending_delete: Option<PendingDelete>,
}

impl RoleDirectory {
    pub fn new(ctx: ConsoleContext) -> Self {
        Self {
            ctx,
            roles: Vec::new(),
            loading: false,
            search: String::new(),
            form: RoleForm::default(),
            pending_delete: None,
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_manage(&self, user: Option<&User>) -> bool {
        gates::MANAGE_DIRECTORY.allows(user)
    }

    pub async fn refresh(&mut self, user: Option<&User>) -> ViewStatus {
        if !gates::VIEW_DIRECTORY.allows(user) {
            return ViewStatus::Unauthorized;
        }

        self.loading = true;
        let status = match self.ctx.gateway.list_roles().await {
            Ok(roles) => {
                self.roles = roles;
                ViewStatus::Ready
            }
            Err(err) => {
                report(&self.ctx.notifications, "list_roles", &err);
                ViewStatus::Failed
            }
        };
        self.loading = false;
        status
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn visible(&self) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| matches_search(&r.name, &self.search))
            .collect()
    }

    pub async fn create(&mut self, user: Option<&User>) -> bool {
        if !self.can_manage(user) {
            return false;
        }

        self.form.errors.clear();
        match self.ctx.gateway.create_role(&self.form.request()).await {
            Ok(role) => {
                tracing::info!(role_id = role.id, "role created");
                self.form = RoleForm::default();
                self.ctx.success();
                self.refresh(user).await;
                true
            }
            Err(err) => {
                match err.surface() {
                    ErrorSurface::Inline(items) => self.form.errors = items,
                    ErrorSurface::Notification(_) => report(&self.ctx.notifications, "create_role", &err),
                }
                false
            }
        }
    }

    pub fn request_delete(&mut self, user: Option<&User>, id: EntityId) -> Option<&'static str> {
        self.pending_delete =
            request_delete(gates::MANAGE_DIRECTORY, user, id, messages::CONFIRM_ROLE_DELETE);
        self.pending_delete.map(|p| p.prompt)
    }

    pub fn pending_delete(&self) -> Option<PendingDelete> {
        self.pending_delete
    }

    pub fn dismiss_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(&mut self, user: Option<&User>) -> bool {
        let Some(pending) = self.pending_delete.take() else {
            return false;
        };

        match self.ctx.gateway.delete_role(pending.id).await {
            Ok(()) => {
                tracing::info!(role_id = pending.id, "role deleted");
                self.ctx.success();
                self.refresh(user).await;
                true
            }
            Err(err) => {
                report(&self.ctx.notifications, "delete_role", &err);
                false
            }
        }
    }
}

// =============================================================================
// ROLE DETAIL
// =============================================================================

/// One role with its permissions, the permission catalog, and the widgets
/// for assigning and removing permissions.
pub struct RoleDetail {
    ctx: ConsoleContext,
    role_id: EntityId,
    role: Option<Role>,
    catalog: Vec<Permission>,
    loading: bool,
    pub assignment: AssignmentWorkflow,
    pub removal: RelationshipRemoval,
}

impl RoleDetail {
    pub fn new(ctx: ConsoleContext, role_id: EntityId) -> Self {
        let assignment = AssignmentWorkflow::new(AssignmentKind::RolePermissions, ctx.notifications.clone());
        let removal = RelationshipRemoval::new(ctx.notifications.clone());
        Self {
            ctx,
            role_id,
            role: None,
            catalog: Vec::new(),
            loading: false,
            assignment,
            removal,
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn catalog(&self) -> &[Permission] {
        &self.catalog
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Loads the role and the permission catalog.
    pub async fn load(&mut self, user: Option<&User>) -> ViewStatus {
        let status = self.refresh(user).await;
        if status == ViewStatus::Ready {
            self.refresh_catalog().await;
        }
        status
    }

    /// Re-reads the role aggregate.
    pub async fn refresh(&mut self, user: Option<&User>) -> ViewStatus {
        if !gates::VIEW_ROLE.allows(user) {
            return ViewStatus::Unauthorized;
        }

        self.loading = true;
        let status = match self.ctx.gateway.get_role(self.role_id).await {
            Ok(role) => {
                self.role = Some(role);
                ViewStatus::Ready
            }
            Err(err) => {
                report(&self.ctx.notifications, "get_role", &err);
                ViewStatus::Failed
            }
        };
        self.loading = false;
        status
    }

    pub async fn refresh_catalog(&mut self) {
        match self.ctx.gateway.list_permissions().await {
            Ok(catalog) => self.catalog = catalog,
            Err(err) => report(&self.ctx.notifications, "list_permissions", &err),
        }
    }

    /// Permissions the role does not hold yet. Empty when either side is
    /// not loaded.
    pub fn candidates(&self) -> Vec<CandidateOption> {
        match &self.role {
            Some(role) => unassigned_permissions(&self.catalog, &role.permissions),
            None => Vec::new(),
        }
    }

    /// The assignment widget is hidden while the catalog is empty.
    pub fn shows_assignment(&self) -> bool {
        !self.catalog.is_empty()
    }

    pub async fn confirm_assignment(&mut self, user: Option<&User>) -> SubmitOutcome {
        let Some(role) = &self.role else {
            return SubmitOutcome::NotSubmitted;
        };
        let assigned = role.permission_ids();
        let outcome = self
            .assignment
            .confirm(self.ctx.gateway.as_ref(), self.role_id, &assigned)
            .await;
        if outcome == SubmitOutcome::Submitted {
            self.refresh(user).await;
        }
        outcome
    }

    pub fn request_removal(&mut self, user: Option<&User>, permission_id: EntityId) -> Option<&'static str> {
        self.removal.request(
            user,
            PendingRemoval::RolePermission(RolePermissionLink {
                role_id: self.role_id,
                permission_id,
            }),
        )
    }

    pub async fn confirm_removal(&mut self, user: Option<&User>) -> RemovalOutcome {
        let outcome = self.removal.confirm(self.ctx.gateway.as_ref()).await;
        if outcome.needs_refresh() {
            self.refresh(user).await;
        }
        outcome
    }
}
