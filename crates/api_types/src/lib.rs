//! JSON request and response bodies of the HTTP API.
//!
//! Money travels as naira (`f64`, two decimals) here; the engine works in
//! kobo and the server converts at the edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub name: String,
        pub email: String,
        pub phone: Option<String>,
        /// `SUPER_ADMIN`, `COOPERATIVE`, `MEMBER`, ...
        pub role: String,
        pub cooperative_id: Option<Uuid>,
    }
}

pub mod auth {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        /// Email, phone number or NIN.
        #[serde(alias = "email", alias = "phone", alias = "nin")]
        pub identifier: String,
        pub password: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
        pub expires_at: DateTime<Utc>,
        pub user: user::UserView,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ForgotPasswordRequest {
        pub email: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ResetPasswordRequest {
        pub token: String,
        pub password: String,
    }
}

pub mod allocation {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct RecentAllocation {
        pub reference: String,
        pub amount: f64,
        /// `member`, `cooperative` or `null` for unclassified fees.
        pub registration_kind: Option<String>,
        pub description: Option<String>,
        pub allocation: f64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct MonthlyAllocation {
        /// `YYYY-MM`.
        pub month: String,
        pub raw_total: f64,
        pub member_registrations: u64,
        pub cooperative_registrations: u64,
        pub super_admin_carve_out: f64,
        pub allocation: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct AllocationResponse {
        pub share_role: String,
        pub percentage: f64,
        pub raw_total: f64,
        pub member_registrations: u64,
        pub cooperative_registrations: u64,
        pub super_admin_carve_out: f64,
        pub total_allocation: f64,
        pub recent: Vec<RecentAllocation>,
        pub monthly: Vec<MonthlyAllocation>,
    }

    /// Back-office lookup of any scope.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AllocationQuery {
        /// `cooperative`, `leader` or `parent_organization`.
        pub share_role: String,
        /// Cooperative id for cooperative/leader shares, parent organization
        /// id otherwise.
        pub scope_id: Uuid,
    }
}

pub mod withdrawal {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct WithdrawalRequest {
        pub amount: f64,
        pub reason: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Withdrawal {
        pub id: Uuid,
        pub user_id: Uuid,
        pub share_role: String,
        pub amount: f64,
        pub reason: String,
        pub status: String,
        pub requested_at: DateTime<Utc>,
        pub processed_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct WithdrawalOverview {
        pub available_balance: f64,
        pub total_allocation: f64,
        pub pending: f64,
        pub withdrawals: Vec<Withdrawal>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct WithdrawalListQuery {
        /// `PENDING`, `APPROVED` or `REJECTED`.
        pub status: Option<String>,
    }
}

pub mod admin {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CreateMemberRequest {
        pub name: String,
        pub email: String,
        pub phone: Option<String>,
        pub nin: Option<String>,
        pub password: String,
        /// Required for super admins; ignored for cooperative and leader
        /// callers unless it names their own cooperative.
        pub cooperative_id: Option<Uuid>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ImpersonationRequest {
        pub user_id: Uuid,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ImpersonationResponse {
        /// Send back in the `x-impersonation-token` header.
        pub token: String,
        pub expires_at: DateTime<Utc>,
        pub user: user::UserView,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SettingUpdate {
        pub value: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Setting {
        pub key: String,
        pub value: String,
        pub stored: bool,
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct AuditEntry {
        pub id: Uuid,
        pub actor_id: Uuid,
        pub action: String,
        pub subject: String,
        pub created_at: DateTime<Utc>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct StartPaymentRequest {
        /// `member` or `cooperative`.
        pub kind: String,
        pub amount: f64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct VerifyQuery {
        pub reference: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Payment {
        pub reference: String,
        pub amount: f64,
        pub status: String,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}
