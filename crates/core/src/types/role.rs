//! Access roles.

use serde::{Deserialize, Serialize};

/// Coarse access tier for a visitor or signed-in principal.
///
/// Ordered by privilege so that route guards can express "at least this
/// tier" checks as comparisons where a floor is what they mean.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous visitor; may browse public routes only.
    #[default]
    Guest,
    /// Signed-in customer.
    User,
    /// Staff member; manages reservations and views the catalog back office.
    Employee,
    /// Administrator; full catalog, reservation, role, and content control.
    Admin,
}

impl Role {
    /// Whether this role is a signed-in (non-guest) tier.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        !matches!(self, Self::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::User => write!(f, "user"),
            Self::Employee => write!(f, "employee"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_privilege() {
        assert!(Role::Guest < Role::User);
        assert!(Role::User < Role::Employee);
        assert!(Role::Employee < Role::Admin);
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::Guest, Role::User, Role::Employee, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
    }
}
