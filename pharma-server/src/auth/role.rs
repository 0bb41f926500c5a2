//! Role and Permission Definitions
//!
//! Both are closed enumerations. Roles and permissions arrive from
//! clients as strings; parsing is fail-closed, so an unknown string is
//! an error and never silently becomes an authority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Coarse-grained identity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Pharmacist,
    Technician,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Pharmacist => "PHARMACIST",
            Role::Technician => "TECHNICIAN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "PHARMACIST" => Ok(Role::Pharmacist),
            "TECHNICIAN" => Ok(Role::Technician),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Fine-grained capability identifier granted to one or more roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ViewClients,
    EditClients,
    ViewInventory,
    EditInventory,
    ManageUsers,
    ViewReports,
    ManageSystem,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewClients => "VIEW_CLIENTS",
            Permission::EditClients => "EDIT_CLIENTS",
            Permission::ViewInventory => "VIEW_INVENTORY",
            Permission::EditInventory => "EDIT_INVENTORY",
            Permission::ManageUsers => "MANAGE_USERS",
            Permission::ViewReports => "VIEW_REPORTS",
            Permission::ManageSystem => "MANAGE_SYSTEM",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
