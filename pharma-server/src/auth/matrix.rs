//! Role-Permission Matrix
//!
//! Static mapping from role to the set of permissions it grants. The
//! table is built once at startup and never mutated afterwards, so
//! request handlers cannot grant themselves new permissions.
//!
//! A role with no entry yields the empty set rather than an error
//! (fail-closed).

use std::collections::{HashMap, HashSet};

use crate::auth::role::{Permission, Role};

/// Immutable role → permission-set table
#[derive(Debug)]
pub struct RolePermissionMatrix {
    grants: HashMap<Role, HashSet<Permission>>,
    empty: HashSet<Permission>,
}

impl RolePermissionMatrix {
    /// Build a matrix from explicit grants
    pub fn new(grants: HashMap<Role, HashSet<Permission>>) -> Self {
        Self {
            grants,
            empty: HashSet::new(),
        }
    }

    /// The default pharmacy permission table
    ///
    /// | Role | Permissions |
    /// |------|-------------|
    /// | ADMIN | everything |
    /// | PHARMACIST | clients + inventory read/write, reports |
    /// | TECHNICIAN | clients + inventory read only |
    pub fn pharmacy_defaults() -> Self {
        use Permission::*;

        let mut grants = HashMap::new();
        grants.insert(
            Role::Admin,
            HashSet::from([
                ViewClients,
                EditClients,
                ViewInventory,
                EditInventory,
                ManageUsers,
                ViewReports,
                ManageSystem,
            ]),
        );
        grants.insert(
            Role::Pharmacist,
            HashSet::from([
                ViewClients,
                EditClients,
                ViewInventory,
                EditInventory,
                ViewReports,
            ]),
        );
        grants.insert(
            Role::Technician,
            HashSet::from([ViewClients, ViewInventory]),
        );

        Self::new(grants)
    }

    /// Permissions granted to `role`; empty set for a role with no entry
    pub fn permissions_of(&self, role: Role) -> &HashSet<Permission> {
        self.grants.get(&role).unwrap_or(&self.empty)
    }

    /// Whether `role` grants `permission`
    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.permissions_of(role).contains(&permission)
    }

    /// True when no role grants anything (treated as fatal at startup)
    pub fn is_empty(&self) -> bool {
        self.grants.values().all(|set| set.is_empty())
    }
}
