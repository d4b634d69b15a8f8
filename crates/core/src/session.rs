//! Per-visitor session state.
//!
//! The web layer loads a [`SessionContext`] from the session store, hands it
//! to cart and checkout operations, and writes it back afterwards. A visitor
//! is signed in as at most one identity: logging in as a customer clears the
//! staff slot and vice versa.

use serde::{Deserialize, Serialize};

use crate::account::{Customer, Staff};
use crate::cart::Cart;
use crate::types::{CustomerId, Email, StaffId, StaffTier};

/// Session keys.
pub mod keys {
    /// Signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
    /// Signed-in staff member with their role claim.
    pub const CURRENT_STAFF: &str = "current_staff";
    /// The cart.
    pub const CART: &str = crate::cart::CART_KEY;
    /// One-shot message for the next view.
    pub const FLASH: &str = "flash";
}

/// Customer identity stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: Email,
}

impl From<&Customer> for CurrentCustomer {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
        }
    }
}

/// Staff identity stored in the session, with the role resolved at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub id: StaffId,
    pub name: String,
    pub email: Email,
    pub role: String,
    pub tier: StaffTier,
}

impl CurrentStaff {
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.tier == StaffTier::Manager
    }
}

impl From<&Staff> for CurrentStaff {
    fn from(staff: &Staff) -> Self {
        Self {
            id: staff.id,
            name: staff.name.clone(),
            email: staff.email.clone(),
            role: staff.role.name.clone(),
            tier: staff.role.tier(),
        }
    }
}

/// Access checks that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("sign in required")]
    Unauthenticated,
    #[error("manager role required")]
    Forbidden,
}

/// Everything the session carries for one visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub customer: Option<CurrentCustomer>,
    pub staff: Option<CurrentStaff>,
    pub cart: Cart,
}

impl SessionContext {
    pub fn login_customer(&mut self, customer: CurrentCustomer) {
        self.staff = None;
        self.customer = Some(customer);
    }

    pub fn login_staff(&mut self, staff: CurrentStaff) {
        self.customer = None;
        self.staff = Some(staff);
    }

    /// Clear both identities. The cart survives.
    pub fn logout(&mut self) {
        self.customer = None;
        self.staff = None;
    }

    /// Replace the staff claim if `staff` is the signed-in staff member.
    ///
    /// Returns whether the claim changed.
    pub fn refresh_staff(&mut self, staff: &Staff) -> bool {
        match &mut self.staff {
            Some(current) if current.id == staff.id => {
                let refreshed = CurrentStaff::from(staff);
                let changed = *current != refreshed;
                *current = refreshed;
                changed
            }
            _ => false,
        }
    }

    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] if no customer is signed in.
    pub fn require_customer(&self) -> Result<&CurrentCustomer, AccessError> {
        self.customer.as_ref().ok_or(AccessError::Unauthenticated)
    }

    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] if no staff member is signed in.
    pub fn require_staff(&self) -> Result<&CurrentStaff, AccessError> {
        self.staff.as_ref().ok_or(AccessError::Unauthenticated)
    }

    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] without a staff session and
    /// [`AccessError::Forbidden`] if the staff member is not a manager.
    pub fn require_manager(&self) -> Result<&CurrentStaff, AccessError> {
        let staff = self.require_staff()?;
        if staff.is_manager() {
            Ok(staff)
        } else {
            Err(AccessError::Forbidden)
        }
    }
}
