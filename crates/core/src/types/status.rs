//! Status enums for orders and staff.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of an order.
///
/// Persisted as a `SMALLINT` with the codes below; the codes are part of the
/// schema and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, waiting for staff approval (code 0).
    #[default]
    Pending,
    /// Approved by a staff member (code 1).
    Approved,
    /// Delivered to the customer (code 2).
    Completed,
    /// Cancelled; stock has been returned (code 3).
    Cancelled,
}

impl OrderStatus {
    /// All statuses in code order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Numeric code stored in the database.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    /// Parse a numeric status code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Completed),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Human-readable label shown in order lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Chờ duyệt",
            Self::Approved => "Đã duyệt",
            Self::Completed => "Đã giao",
            Self::Cancelled => "Đã hủy",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Permission tier of a staff member, resolved from their role name at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffTier {
    /// May administer staff and customer accounts in addition to staff work.
    Manager,
    /// Catalog and order work only.
    Staff,
}

impl StaffTier {
    /// Role names that grant the manager tier.
    pub const MANAGER_ROLES: [&'static str; 2] = ["manager", "quản lý"];

    /// Resolve the tier for a role name (case-insensitive).
    #[must_use]
    pub fn for_role(role_name: &str) -> Self {
        let name = role_name.trim().to_lowercase();
        if Self::MANAGER_ROLES.contains(&name.as_str()) {
            Self::Manager
        } else {
            Self::Staff
        }
    }
}

impl fmt::Display for StaffTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Staff => write!(f, "staff"),
        }
    }
}
