//! Reservation status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a reservation record.
///
/// Transitions are staff-initiated and deliberately unguarded: any status
/// may be set from any other. Callers suppress same-status writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Created at checkout, awaiting staff review.
    #[default]
    Pending,
    /// Fulfilled by staff.
    Completed,
    /// Cancelled by staff.
    Cancelled,
}

impl ReservationStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Completed, Self::Cancelled];
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Remote documents are not schema-enforced; accept any casing.
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid reservation status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("Pending".parse::<ReservationStatus>(), Ok(ReservationStatus::Pending));
        assert_eq!("COMPLETED".parse::<ReservationStatus>(), Ok(ReservationStatus::Completed));
        assert!("unknown".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ReservationStatus::Cancelled).expect("serialize");
        assert_eq!(json, "\"cancelled\"");
    }
}
