use rbac_console::authz::{gates, paths, CapabilityEvaluator, DefaultCapabilityEvaluator, Principal};
use rbac_console::models::{Permission, Role, User};
use rbac_console::{can_perform, can_view};

fn editor() -> User {
    User::new(7).with_email("editor@example.com").with_roles(vec![Role::new(2, "Editor")
        .with_permissions(vec![
            Permission::new(10, "GET", paths::ROLES),
            Permission::new(11, "POST", paths::PAGES),
        ])])
}

#[test]
fn editor_reads_roles_but_cannot_delete_them() {
    let user = editor();

    assert!(can_perform(Some(&user), paths::ROLES, Some("GET")));
    assert!(can_view(Some(&user), paths::ROLES));
    assert!(!can_perform(Some(&user), paths::ROLES, Some("DELETE")));
    assert!(!can_perform(Some(&user), paths::USERS, None));
}

#[test]
fn no_user_or_no_grants_denies_everything() {
    let roleless = User::new(1);
    let empty_roles = User::new(2).with_roles(vec![Role::new(1, "Viewer"), Role::new(2, "Guest")]);

    for path in [paths::PERMISSIONS, paths::ROLES, paths::USERS, paths::PAGES] {
        for verb in ["GET", "POST", "DELETE", "PATCH"] {
            assert!(!can_perform(None, path, Some(verb)));
            assert!(!can_perform(Some(&roleless), path, Some(verb)));
            assert!(!can_perform(Some(&empty_roles), path, Some(verb)));
        }
    }
}

#[test]
fn matching_is_exact_and_case_sensitive() {
    let user = User::new(3).with_roles(vec![Role::new(1, "Odd")
        .with_permissions(vec![Permission::new(1, "get", paths::USERS)])]);

    assert!(!can_perform(Some(&user), paths::USERS, Some("GET")));
    assert!(can_perform(Some(&user), paths::USERS, Some("get")));
    assert!(!can_perform(Some(&user), "/api/users/", Some("get")));
    assert!(!can_perform(Some(&user), "/API/USERS", Some("get")));
}

#[test]
fn grants_from_every_role_count() {
    let user = User::new(4).with_roles(vec![
        Role::new(1, "Readers").with_permissions(vec![Permission::new(1, "GET", paths::USERS)]),
        Role::new(2, "Writers").with_permissions(vec![Permission::new(2, "POST", paths::USERS)]),
    ]);

    assert!(gates::VIEW_USER.allows(Some(&user)));
    assert!(gates::ASSIGN_ROLES.allows(Some(&user)));
    assert!(!gates::REMOVE_USER_ROLE.allows(Some(&user)));
}

#[test]
fn principal_evaluation_agrees_with_user_evaluation() {
    let user = editor();
    let principal = Principal::from_user(&user);
    let evaluator = DefaultCapabilityEvaluator::new();

    for (path, verb) in [
        (paths::ROLES, "GET"),
        (paths::ROLES, "DELETE"),
        (paths::PAGES, "POST"),
        (paths::PAGES, "GET"),
    ] {
        assert_eq!(
            evaluator.can(Some(&principal), path, verb),
            can_perform(Some(&user), path, Some(verb)),
            "{verb} {path}"
        );
    }
    assert!(!evaluator.can(None, paths::ROLES, "GET"));
}
