//! Relationship Differ: catalog minus already-assigned, as multi-select options.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{EntityId, Permission, Role};

/// One assignable candidate: the target's surrogate id and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateOption {
    pub value: EntityId,
    pub label: String,
}

impl CandidateOption {
    pub fn new(value: EntityId, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

impl From<&Permission> for CandidateOption {
    fn from(permission: &Permission) -> Self {
        Self::new(permission.id, permission.label())
    }
}

impl From<&Role> for CandidateOption {
    fn from(role: &Role) -> Self {
        Self::new(role.id, role.name.clone())
    }
}

/// Permissions in `catalog` whose (path, verb) pair is not already in `assigned`.
/// Catalog order is kept.
pub fn unassigned_permissions(catalog: &[Permission], assigned: &[Permission]) -> Vec<CandidateOption> {
    let taken: HashSet<(&str, &str)> = assigned
        .iter()
        .map(|p| (p.path.as_str(), p.verb.as_str()))
        .collect();

    catalog
        .iter()
        .filter(|p| !taken.contains(&(p.path.as_str(), p.verb.as_str())))
        .map(CandidateOption::from)
        .collect()
}

/// Roles in `catalog` whose name is not already in `assigned`.
///
/// Matching is by name, not id: a role sharing its name with an assigned role
/// is hidden as well.
pub fn unassigned_roles(catalog: &[Role], assigned: &[Role]) -> Vec<CandidateOption> {
    let taken: HashSet<&str> = assigned.iter().map(|r| r.name.as_str()).collect();

    catalog
        .iter()
        .filter(|r| !taken.contains(r.name.as_str()))
        .map(CandidateOption::from)
        .collect()
}

/// Ids of a selection, in selection order.
pub fn selected_ids(options: &[CandidateOption]) -> Vec<EntityId> {
    options.iter().map(|o| o.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_exclude_matching_pair_only() {
        let catalog = vec![Permission::new(1, "GET", "/a"), Permission::new(2, "POST", "/a")];
        let assigned = vec![Permission::new(77, "GET", "/a")];

        assert_eq!(
            unassigned_permissions(&catalog, &assigned),
            vec![CandidateOption::new(2, "POST /a")]
        );
    }

    #[test]
    fn empty_assignment_offers_whole_catalog_in_order() {
        let catalog = vec![
            Permission::new(3, "DELETE", "/z"),
            Permission::new(1, "GET", "/a"),
            Permission::new(2, "POST", "/m"),
        ];

        let options = unassigned_permissions(&catalog, &[]);
        assert_eq!(selected_ids(&options), vec![3, 1, 2]);
        assert_eq!(options[0].label, "DELETE /z");
    }

    #[test]
    fn roles_match_by_name() {
        let catalog = vec![Role::new(1, "Editor"), Role::new(2, "Viewer")];
        let assigned = vec![Role::new(99, "Editor")];

        assert_eq!(
            unassigned_roles(&catalog, &assigned),
            vec![CandidateOption::new(2, "Viewer")]
        );
    }

    #[test]
    fn duplicate_role_names_hide_both_roles() {
        let catalog = vec![
            Role::new(1, "Auditor"),
            Role::new(2, "Auditor"),
            Role::new(3, "Viewer"),
        ];
        let assigned = vec![Role::new(1, "Auditor")];

        let options = unassigned_roles(&catalog, &assigned);
        assert_eq!(selected_ids(&options), vec![3]);
    }
}
