//! User directory and role-assignment records.

use serde::Serialize;
use serde_json::{Value, json};

use libreria_core::{PrincipalId, RoleId};

/// Seeded role documents.
///
/// The role collection was seeded once in the backend project and these
/// opaque ids are referenced from user documents ever since. They are
/// constants of the deployment, not values this application invents.
pub mod roles {
    use libreria_core::{Role, RoleId};

    /// Role-assignment document id carrying administrator privileges.
    pub const ADMINISTRATOR: &str = "NAkhkUa3UOP4mBFLFHkz";
    /// Role-assignment document id for staff.
    pub const EMPLOYEE: &str = "rBJKFTiLjLVw8yk1QH9A";
    /// Role-assignment document id for standard customers.
    pub const STANDARD: &str = "ZyodP6z0e1Gq8wVsVPB9";

    /// Map a role-assignment id to a [`Role`].
    ///
    /// Unknown ids resolve to the baseline customer tier rather than an
    /// error: role documents gate privilege escalation, not access.
    #[must_use]
    pub fn resolve(role_id: &RoleId) -> Role {
        match role_id.as_str() {
            ADMINISTRATOR => Role::Admin,
            EMPLOYEE => Role::Employee,
            _ => Role::User,
        }
    }

    /// Role-assignment id for a [`Role`], used when staff reassign roles.
    #[must_use]
    pub const fn id_for(role: Role) -> &'static str {
        match role {
            Role::Admin => ADMINISTRATOR,
            Role::Employee => EMPLOYEE,
            Role::User | Role::Guest => STANDARD,
        }
    }
}

/// A seeded role definition, for the admin roles console.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub id: RoleId,
    pub name: &'static str,
    pub description: &'static str,
}

impl RoleDefinition {
    /// The three seeded role definitions, in privilege order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            Self {
                id: RoleId::new(roles::ADMINISTRATOR),
                name: "Administrator",
                description: "Full administrative privileges",
            },
            Self {
                id: RoleId::new(roles::EMPLOYEE),
                name: "Employee",
                description: "Staff role",
            },
            Self {
                id: RoleId::new(roles::STANDARD),
                name: "User",
                description: "Standard customer role",
            },
        ]
    }
}

/// A user directory document, as listed in the admin roles console.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    /// Directory document id (distinct from the principal id).
    pub doc_id: String,
    pub uid: PrincipalId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Role-assignment document id; `None` resolves to baseline `User`.
    pub role: Option<RoleId>,
}

impl DirectoryEntry {
    /// Patch payload for a role reassignment.
    #[must_use]
    pub fn role_patch(role_id: &RoleId) -> Value {
        json!({ "role": role_id.as_str() })
    }
}

/// Extended profile fields stored alongside the identity-provider profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfile {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

impl UserProfile {
    /// Document payload for a profile save.
    #[must_use]
    pub fn to_fields(&self) -> Value {
        json!({
            "phone": self.phone,
            "address": self.address,
            "city": self.city,
            "postal_code": self.postal_code,
        })
    }
}
