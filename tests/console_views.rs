use std::sync::Arc;

use anyhow::Result;

use rbac_console::authz::paths;
use rbac_console::console::{ConsoleContext, PermissionCatalog, RoleDirectory, UserDirectory, ViewStatus};
use rbac_console::errors::ConsoleError;
use rbac_console::gateway::{MutationGateway, RecordedCall};
use rbac_console::messages;
use rbac_console::models::{Permission, Role, User, Verb};
use rbac_console::notifications::{drain, init_notification_bus, NotificationKind};
use rbac_console::{InMemoryGateway, SharedGateway};

fn operator(grants: &[(&str, &str)]) -> User {
    let permissions = grants
        .iter()
        .enumerate()
        .map(|(i, (verb, path))| Permission::new(500 + i as i64, *verb, *path));
    User::new(500).with_roles(vec![Role::new(500, "Operator").with_permissions(permissions)])
}

fn full_operator() -> User {
    operator(&[
        ("GET", paths::PERMISSIONS),
        ("POST", paths::PERMISSIONS),
        ("DELETE", paths::PERMISSIONS),
        ("GET", paths::PAGES),
        ("POST", paths::PAGES),
    ])
}

#[tokio::test]
async fn permission_catalog_sorts_filters_and_creates() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_permission("GET", "/api/users").await;
    gateway.seed_permission("DELETE", "/api/roles").await;
    gateway.seed_permission("POST", "/api/permissions").await;
    let (bus, mut rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut catalog = PermissionCatalog::new(ConsoleContext::new(shared, bus));
    let user = full_operator();

    assert_eq!(catalog.refresh(Some(&user)).await, ViewStatus::Ready);
    let sorted: Vec<&str> = catalog.permissions().iter().map(|p| p.path.as_str()).collect();
    assert_eq!(sorted, vec!["/api/permissions", "/api/roles", "/api/users"]);

    catalog.set_search("delete");
    assert_eq!(catalog.visible().len(), 1);
    catalog.set_search("API/");
    assert_eq!(catalog.visible().len(), 3);

    catalog.form.verb = Verb::Patch;
    catalog.form.path = "/api/roles".into();
    assert!(catalog.create(Some(&user)).await);
    assert_eq!(catalog.permissions().len(), 4);
    assert_eq!(catalog.form.verb, Verb::Get);
    assert!(catalog.form.path.is_empty());
    assert_eq!(drain(&mut rx)[0].key, messages::SUCCESS);
    Ok(())
}

#[tokio::test]
async fn permission_validation_stays_on_the_form() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    let (bus, mut rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut catalog = PermissionCatalog::new(ConsoleContext::new(shared, bus));
    let user = full_operator();

    catalog.form.path = "   ".into();
    assert!(!catalog.create(Some(&user)).await);
    assert_eq!(catalog.form.errors.len(), 1);
    assert_eq!(catalog.form.errors[0].code, "required");
    assert!(!catalog.form.saving);
    assert!(drain(&mut rx).is_empty());

    gateway.fail_next(ConsoleError::auth("session expired")).await;
    catalog.form.path = "/api/x".into();
    assert!(!catalog.create(Some(&user)).await);
    assert!(catalog.form.errors.is_empty());
    assert_eq!(drain(&mut rx)[0].key, messages::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn permission_delete_needs_confirmation_and_capability() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    let target = gateway.seed_permission("GET", "/a").await;
    let (bus, _rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut catalog = PermissionCatalog::new(ConsoleContext::new(shared, bus));

    let reader = operator(&[("GET", paths::PERMISSIONS)]);
    assert!(!catalog.can_delete(Some(&reader)));
    assert_eq!(catalog.request_delete(Some(&reader), target.id), None);
    assert!(!catalog.confirm_delete(Some(&reader)).await);

    let user = full_operator();
    assert_eq!(catalog.request_delete(Some(&user), target.id), Some(messages::CONFIRM_DELETE));
    catalog.dismiss_delete();
    assert!(!catalog.confirm_delete(Some(&user)).await);
    assert!(gateway.calls().await.is_empty());

    catalog.request_delete(Some(&user), target.id);
    assert!(catalog.confirm_delete(Some(&user)).await);
    assert!(catalog.permissions().is_empty());
    assert_eq!(
        gateway.calls().await,
        vec![RecordedCall::DeletePermission(target.id), RecordedCall::ListPermissions]
    );
    Ok(())
}

#[tokio::test]
async fn role_directory_creates_searches_and_deletes() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_role("Viewer", &[]).await;
    let (bus, _rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut directory = RoleDirectory::new(ConsoleContext::new(shared, bus));
    let user = full_operator();

    directory.form.name = "Editor".into();
    directory.form.description = "  ".into();
    assert!(directory.create(Some(&user)).await);
    assert_eq!(directory.roles().len(), 2);
    let editor = directory
        .roles()
        .iter()
        .find(|r| r.name == "Editor")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("editor missing"))?;
    assert_eq!(editor.description, None);

    directory.set_search("EDIT");
    assert_eq!(directory.visible().len(), 1);

    assert_eq!(
        directory.request_delete(Some(&user), editor.id),
        Some(messages::CONFIRM_ROLE_DELETE)
    );
    assert!(directory.confirm_delete(Some(&user)).await);
    assert_eq!(directory.roles().len(), 1);
    assert!(gateway.get_role(editor.id).await.is_err());
    Ok(())
}

#[tokio::test]
async fn role_directory_keeps_snapshot_on_failed_refresh() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_role("Viewer", &[]).await;
    let (bus, mut rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut directory = RoleDirectory::new(ConsoleContext::new(shared, bus));
    let user = full_operator();

    assert_eq!(directory.refresh(Some(&user)).await, ViewStatus::Ready);
    gateway.fail_next(ConsoleError::transport("timed out")).await;
    assert_eq!(directory.refresh(Some(&user)).await, ViewStatus::Failed);
    assert_eq!(directory.roles().len(), 1);
    assert!(!directory.is_loading());

    let notes = drain(&mut rx);
    assert_eq!(notes[0].kind, NotificationKind::Error);
    assert_eq!(notes[0].key, messages::INTERNAL_ERROR);
    Ok(())
}

#[tokio::test]
async fn user_directory_search_and_create_validation() -> Result<()> {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_user("ada@example.com", "pw", &[]).await;
    gateway.seed_user("grace@navy.mil", "pw", &[]).await;
    let (bus, _rx) = init_notification_bus();
    let shared: SharedGateway = gateway.clone();
    let mut directory = UserDirectory::new(ConsoleContext::new(shared, bus));
    let user = full_operator();

    assert_eq!(directory.refresh(Some(&user)).await, ViewStatus::Ready);
    directory.set_search("NAVY");
    let visible: Vec<String> = directory.visible().iter().map(|u| u.display_key()).collect();
    assert_eq!(visible, vec!["grace@navy.mil".to_string()]);

    directory.form.name = "Linus".into();
    directory.form.username = "linus".into();
    directory.form.email = "not-an-email".into();
    assert!(!directory.create(Some(&user)).await);
    let codes: Vec<&str> = directory.form.errors.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["required", "invalid_email"]);

    directory.form.email = "linus@example.com".into();
    directory.form.password = "secret".into();
    assert!(directory.create(Some(&user)).await);
    assert!(directory.form.errors.is_empty());
    assert_eq!(directory.users().len(), 3);

    let reader = operator(&[("GET", paths::PAGES)]);
    assert!(!directory.can_manage(Some(&reader)));
    assert_eq!(directory.request_delete(Some(&reader), 1), None);
    assert!(!directory.confirm_delete(Some(&reader)).await);

    let calls = gateway.calls().await;
    assert_eq!(calls.iter().filter(|c| c.is_mutation()).count(), 2);
    Ok(())
}
