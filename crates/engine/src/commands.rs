//! Command structs for engine write operations.
//!
//! These types group parameters for user registration, organization setup and
//! withdrawal requests, keeping call sites readable and avoiding long argument
//! lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Kobo, Role, ShareRole};

/// Register a user account.
#[derive(Clone, Debug)]
pub struct RegisterUserCmd {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nin: Option<String>,
    pub password: String,
    pub role: Role,
    pub cooperative_id: Option<Uuid>,
}

impl RegisterUserCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            nin: None,
            password: password.into(),
            role,
            cooperative_id: None,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn nin(mut self, nin: impl Into<String>) -> Self {
        self.nin = Some(nin.into());
        self
    }

    #[must_use]
    pub fn cooperative_id(mut self, cooperative_id: Uuid) -> Self {
        self.cooperative_id = Some(cooperative_id);
        self
    }
}

/// Create a cooperative, optionally bound to its `COOPERATIVE` account.
#[derive(Clone, Debug)]
pub struct CreateCooperativeCmd {
    pub name: String,
    pub registration_number: Option<String>,
    pub parent_organization_id: Option<Uuid>,
    pub account_user_id: Option<Uuid>,
}

impl CreateCooperativeCmd {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_number: None,
            parent_organization_id: None,
            account_user_id: None,
        }
    }

    #[must_use]
    pub fn registration_number(mut self, number: impl Into<String>) -> Self {
        self.registration_number = Some(number.into());
        self
    }

    #[must_use]
    pub fn parent_organization_id(mut self, id: Uuid) -> Self {
        self.parent_organization_id = Some(id);
        self
    }

    #[must_use]
    pub fn account_user_id(mut self, id: Uuid) -> Self {
        self.account_user_id = Some(id);
        self
    }
}

/// Ask for a payout from a role's allocation.
#[derive(Clone, Debug)]
pub struct RequestWithdrawalCmd {
    pub user_id: Uuid,
    pub share_role: ShareRole,
    pub amount: Kobo,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

impl RequestWithdrawalCmd {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        share_role: ShareRole,
        amount: Kobo,
        reason: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            share_role,
            amount,
            reason: reason.into(),
            requested_at,
        }
    }
}
