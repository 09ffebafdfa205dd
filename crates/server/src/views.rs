//! Engine values rendered as API bodies. Kobo becomes naira here.

use api_types::{
    admin::{AuditEntry, Setting},
    allocation::{AllocationResponse, MonthlyAllocation, RecentAllocation},
    payment::Payment,
    user::UserView,
    withdrawal::{Withdrawal, WithdrawalOverview},
};

pub(crate) fn user(user: &engine::User) -> UserView {
    UserView {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        role: user.role.as_str().to_string(),
        cooperative_id: user.cooperative_id,
    }
}

pub(crate) fn allocation(summary: engine::AllocationSummary) -> AllocationResponse {
    AllocationResponse {
        share_role: summary.share_role.as_str().to_string(),
        percentage: summary.percentage.as_percent(),
        raw_total: summary.tally.raw_total.to_naira(),
        member_registrations: summary.tally.member_count,
        cooperative_registrations: summary.tally.cooperative_count,
        super_admin_carve_out: summary.super_admin_carve_out.to_naira(),
        total_allocation: summary.total_allocation.to_naira(),
        recent: summary
            .recent
            .into_iter()
            .map(|recent| RecentAllocation {
                reference: recent.fee.reference,
                amount: recent.fee.amount.to_naira(),
                registration_kind: recent.fee.kind.map(|kind| kind.as_str().to_string()),
                description: recent.fee.description,
                allocation: recent.allocation.to_naira(),
                created_at: recent.fee.created_at,
            })
            .collect(),
        monthly: summary
            .monthly
            .into_iter()
            .map(|month| MonthlyAllocation {
                month: month.window.label(),
                raw_total: month.tally.raw_total.to_naira(),
                member_registrations: month.tally.member_count,
                cooperative_registrations: month.tally.cooperative_count,
                super_admin_carve_out: month.super_admin_carve_out.to_naira(),
                allocation: month.allocation.to_naira(),
            })
            .collect(),
    }
}

pub(crate) fn withdrawal(withdrawal: engine::Withdrawal) -> Withdrawal {
    Withdrawal {
        id: withdrawal.id,
        user_id: withdrawal.user_id,
        share_role: withdrawal.share_role.as_str().to_string(),
        amount: withdrawal.amount.to_naira(),
        reason: withdrawal.reason,
        status: withdrawal.status.as_str().to_string(),
        requested_at: withdrawal.requested_at,
        processed_at: withdrawal.processed_at,
    }
}

pub(crate) fn withdrawal_overview(overview: engine::WithdrawalOverview) -> WithdrawalOverview {
    WithdrawalOverview {
        available_balance: overview.available.to_naira(),
        total_allocation: overview.allocation.to_naira(),
        pending: overview.pending.to_naira(),
        withdrawals: overview.recent.into_iter().map(withdrawal).collect(),
    }
}

pub(crate) fn setting(setting: engine::Setting) -> Setting {
    Setting {
        key: setting.key,
        value: setting.value,
        stored: setting.stored,
        updated_at: setting.updated_at,
    }
}

pub(crate) fn audit_entry(entry: engine::AuditEntry) -> AuditEntry {
    AuditEntry {
        id: entry.id,
        actor_id: entry.actor_id,
        action: entry.action,
        subject: entry.subject,
        created_at: entry.created_at,
    }
}

pub(crate) fn payment(tx: engine::Transaction) -> Payment {
    Payment {
        reference: tx.reference,
        amount: tx.amount.to_naira(),
        status: tx.status.as_str().to_string(),
        description: tx.description,
        created_at: tx.created_at,
    }
}
