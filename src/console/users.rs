use super::{matches_search, request_delete, ConsoleContext, PendingDelete, ViewStatus};
use crate::authz::gates;
use crate::differ::{unassigned_roles, CandidateOption};
use crate::errors::{ErrorSurface, ValidationItem};
use crate::messages;
use crate::models::{EntityId, Role, User, UserCreateRequest, UserRoleLink};
use crate::notifications::report;
use crate::workflow::{
    AssignmentKind, AssignmentWorkflow, PendingRemoval, RelationshipRemoval, RemovalOutcome,
    SubmitOutcome,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub errors: Vec<ValidationItem>,
}

impl UserForm {
    fn request(&self) -> UserCreateRequest {
        UserCreateRequest {
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

pub struct UserDirectory {
    ctx: ConsoleContext,
    users: Vec<User>,
    loading: bool,
    search: String,
    pub form: UserForm,
    pending_delete: Option<PendingDelete>,
}

impl UserDirectory {
    pub fn new(ctx: ConsoleContext) -> Self {
        Self {
            ctx,
            users: Vec::new(),
            loading: false,
            search: String::new(),
            form: UserForm::default(),
            pending_delete: None,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
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
        let status = match self.ctx.gateway.list_users().await {
            Ok(users) => {
                self.users = users;
                ViewStatus::Ready
            }
            Err(err) => {
                report(&self.ctx.notifications, "list_users", &err);
                ViewStatus::Failed
            }
        };
        self.loading = false;
        status
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    /// Users whose email contains the search text.
    pub fn visible(&self) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| matches_search(u.email.as_deref().unwrap_or_default(), &self.search))
            .collect()
    }

    pub async fn create(&mut self, user: Option<&User>) -> bool {
        if !self.can_manage(user) {
            return false;
        }

        self.form.errors.clear();
        match self.ctx.gateway.create_user(&self.form.request()).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, "user created");
                self.form = UserForm::default();
                self.ctx.success();
                self.refresh(user).await;
                true
            }
            Err(err) => {
                match err.surface() {
                    ErrorSurface::Inline(items) => self.form.errors = items,
                    ErrorSurface::Notification(_) => report(&self.ctx.notifications, "create_user", &err),
                }
                false
            }
        }
    }

    pub fn request_delete(&mut self, user: Option<&User>, id: EntityId) -> Option<&'static str> {
        self.pending_delete =
            request_delete(gates::MANAGE_DIRECTORY, user, id, messages::CONFIRM_USER_DELETE);
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

        match self.ctx.gateway.delete_user(pending.id).await {
            Ok(()) => {
                tracing::info!(user_id = pending.id, "user deleted");
                self.ctx.success();
                self.refresh(user).await;
                true
            }
            Err(err) => {
                report(&self.ctx.notifications, "delete_user", &err);
                false
            }
        }
    }
}

pub struct UserDetail {
    ctx: ConsoleContext,
    user_id: EntityId,
    user: Option<User>,
    catalog: Vec<Role>,
    loading: bool,
    pub assignment: AssignmentWorkflow,
    pub removal: RelationshipRemoval,
}

impl UserDetail {
    pub fn new(ctx: ConsoleContext, user_id: EntityId) -> Self {
        let assignment = AssignmentWorkflow::new(AssignmentKind::UserRoles, ctx.notifications.clone());
        let removal = RelationshipRemoval::new(ctx.notifications.clone());
        Self {
            ctx,
            user_id,
            user: None,
            catalog: Vec::new(),
            loading: false,
            assignment,
            removal,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn catalog(&self) -> &[Role] {
        &self.catalog
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub async fn load(&mut self, session_user: Option<&User>) -> ViewStatus {
        let status = self.refresh(session_user).await;
        if status == ViewStatus::Ready {
            self.refresh_catalog().await;
        }
        status
    }

    pub async fn refresh(&mut self, session_user: Option<&User>) -> ViewStatus {
        if !gates::VIEW_USER.allows(session_user) {
            return ViewStatus::Unauthorized;
        }

        self.loading = true;
        let status = match self.ctx.gateway.get_user(self.user_id).await {
            Ok(user) => {
                self.user = Some(user);
                ViewStatus::Ready
            }
            Err(err) => {
                report(&self.ctx.notifications, "get_user", &err);
                ViewStatus::Failed
            }
        };
        self.loading = false;
        status
    }

    pub async fn refresh_catalog(&mut self) {
        match self.ctx.gateway.list_roles().await {
            Ok(catalog) => self.catalog = catalog,
            Err(err) => report(&self.ctx.notifications, "list_roles", &err),
        }
    }

    /// Roles the user does not hold yet, matched by name.
    pub fn candidates(&self) -> Vec<CandidateOption> {
        match &self.user {
            Some(user) => unassigned_roles(&self.catalog, &user.roles),
            None => Vec::new(),
        }
    }

    pub fn shows_assignment(&self) -> bool {
        !self.catalog.is_empty()
    }

    pub async fn confirm_assignment(&mut self, session_user: Option<&User>) -> SubmitOutcome {
        let Some(user) = &self.user else {
            return SubmitOutcome::NotSubmitted;
        };
        let assigned = user.role_ids();
        let outcome = self
            .assignment
            .confirm(self.ctx.gateway.as_ref(), self.user_id, &assigned)
            .await;
        if outcome == SubmitOutcome::Submitted {
            self.refresh(session_user).await;
        }
        outcome
    }

    pub fn request_removal(&mut self, session_user: Option<&User>, role_id: EntityId) -> Option<&'static str> {
        self.removal.request(
            session_user,
            PendingRemoval::UserRole(UserRoleLink {
                user_id: self.user_id,
                role_id,
            }),
        )
    }

    pub async fn confirm_removal(&mut self, session_user: Option<&User>) -> RemovalOutcome {
        let outcome = self.removal.confirm(self.ctx.gateway.as_ref()).await;
        if outcome.needs_refresh() {
            self.refresh(session_user).await;
        }
        outcome
    }
}
