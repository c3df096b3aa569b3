use super::{matches_search, request_delete, ConsoleContext, PendingDelete, ViewStatus};
use crate::authz::gates;
use crate::errors::{ErrorSurface, ValidationItem};
use crate::messages;
use crate::models::{EntityId, Permission, PermissionCreateRequest, User, Verb};
use crate::notifications::report;

/// Create-permission form state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionForm {
    pub verb: Verb,
    pub path: String,
    pub errors: Vec<ValidationItem>,
    pub saving: bool,
}

impl PermissionForm {
    fn reset(&mut self) {
        self.verb = Verb::Get;
        self.path.clear();
    }
}

/// The permission catalog page.
pub struct PermissionCatalog {
    ctx: ConsoleContext,
    permissions: Vec<Permission>,
    loading: bool,
    search: String,
    pub form: PermissionForm,
    pending_delete: Option<PendingDelete>,
}

impl PermissionCatalog {
    pub fn new(ctx: ConsoleContext) -> Self {
        Self {
            ctx,
            permissions: Vec::new(),
            loading: false,
            search: String::new(),
            form: PermissionForm::default(),
            pending_delete: None,
        }
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_create(&self, user: Option<&User>) -> bool {
        gates::CREATE_PERMISSION.allows(user)
    }

    pub fn can_delete(&self, user: Option<&User>) -> bool {
        gates::DELETE_PERMISSION.allows(user)
    }

    /// Reloads the catalog, sorted by path.
    pub async fn refresh(&mut self, user: Option<&User>) -> ViewStatus {
        if !gates::VIEW_PERMISSIONS.allows(user) {
            return ViewStatus::Unauthorized;
        }

        self.loading = true;
        let status = match self.ctx.gateway.list_permissions().await {
            Ok(mut permissions) => {
                permissions.sort_by(|a, b| a.path.cmp(&b.path));
                self.permissions = permissions;
                ViewStatus::Ready
            }
            Err(err) => {
                report(&self.ctx.notifications, "list_permissions", &err);
                ViewStatus::Failed
            }
        };
        self.loading = false;
        status
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    /// Permissions whose verb or path contains the search text.
    pub fn visible(&self) -> Vec<&Permission> {
        self.permissions
            .iter()
            .filter(|p| matches_search(&p.verb, &self.search) || matches_search(&p.path, &self.search))
            .collect()
    }

    /// Submits the form. Validation problems stay on the form; anything else
    /// becomes a notification.
    pub async fn create(&mut self, user: Option<&User>) -> bool {
        if !self.can_create(user) {
            return false;
        }

        self.form.errors.clear();
        self.form.saving = true;
        let req = PermissionCreateRequest {
            verb: self.form.verb,
            path: self.form.path.clone(),
        };

        let created = match self.ctx.gateway.create_permission(&req).await {
            Ok(permission) => {
                tracing::info!(permission_id = permission.id, "permission created");
                self.form.reset();
                self.ctx.success();
                true
            }
            Err(err) => {
                match err.surface() {
                    ErrorSurface::Inline(items) => self.form.errors = items,
                    ErrorSurface::Notification(_) => {
                        report(&self.ctx.notifications, "create_permission", &err)
                    }
                }
                false
            }
        };
        self.form.saving = false;

        if created {
            self.refresh(user).await;
        }
        created
    }

    pub fn request_delete(&mut self, user: Option<&User>, id: EntityId) -> Option<&'static str> {
        self.pending_delete = request_delete(gates::DELETE_PERMISSION, user, id, messages::CONFIRM_DELETE);
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

        match self.ctx.gateway.delete_permission(pending.id).await {
            Ok(()) => {
                tracing::info!(permission_id = pending.id, "permission deleted");
                self.ctx.success();
                self.refresh(user).await;
                true
            }
            Err(err) => {
                report(&self.ctx.notifications, "delete_permission", &err);
                false
            }
        }
    }
}
