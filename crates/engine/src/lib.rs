//! Domain engine for the cooperative platform: users and organizations,
//! registration-fee payments, the allocation of those fees to cooperatives,
//! leaders and parent organizations, and withdrawals against allocations.

pub use allocation::{
    AllocationRates, AllocationScope, AllocationSummary, BREAKDOWN_MONTHS, MonthWindow,
    MonthlyAllocation, REGISTRATION_REFERENCE_PREFIX, RECENT_LIMIT, RecentAllocation,
    RegistrationFee, RegistrationKind, RegistrationTally, ShareRole, available_balance,
    share_of_remainder, trailing_months,
};
pub use audit_log::{AuditAction, AuditEntry};
pub use commands::{CreateCooperativeCmd, RegisterUserCmd, RequestWithdrawalCmd};
pub use cooperatives::Cooperative;
pub use error::EngineError;
pub use identity::{LoginIdentifier, Role};
pub use money::{Kobo, Percentage};
pub use ops::{Engine, EngineBuilder, GatewayVerification, WithdrawalOverview};
pub use parent_organizations::ParentOrganization;
pub use settings::{
    COOPERATIVE_CARVE_OUT_KEY, MEMBER_CARVE_OUT_KEY, Setting, SettingKey, SettingsProvider,
    SettingsSnapshot,
};
pub use transactions::{Transaction, TransactionStatus, TransactionType};
pub use users::User;
pub use withdrawals::{Withdrawal, WithdrawalStatus};

mod allocation;
mod audit_log;
mod commands;
mod cooperatives;
mod error;
mod identity;
mod leaders;
mod money;
mod ops;
mod parent_organizations;
mod password_resets;
mod settings;
mod transactions;
mod users;
mod util;
mod withdrawals;

pub type ResultEngine<T> = Result<T, EngineError>;
