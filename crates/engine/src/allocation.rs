//! Registration-fee allocation arithmetic.
//!
//! Every successful registration fee in a scope is split as follows:
//!
//! 1. the super admin takes a fixed carve-out per registration, depending on
//!    whether it was a member or a cooperative registration;
//! 2. the remainder (floored at zero) is multiplied by the share percentage
//!    of the role asking (cooperative, leader or parent organization).
//!
//! Nothing in here touches the database: the engine loads fees and rates and
//! hands them to [`AllocationSummary::build`].

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Kobo, Percentage, Role};

/// Reference prefix of registration-fee transactions.
pub const REGISTRATION_REFERENCE_PREFIX: &str = "REG_";

/// Months covered by the breakdown series.
pub const BREAKDOWN_MONTHS: usize = 12;

/// Entries in the recent-transactions list.
pub const RECENT_LIMIT: usize = 10;

const MEMBER_DESCRIPTION_MARKER: &str = "Member registration";
const COOPERATIVE_DESCRIPTION_MARKER: &str = "Cooperative registration";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Member,
    Cooperative,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Cooperative => "cooperative",
        }
    }

    /// Description written on new fee transactions. It still carries the
    /// legacy marker so older readers keep classifying it correctly.
    pub fn fee_description(self) -> &'static str {
        match self {
            Self::Member => "Member registration fee",
            Self::Cooperative => "Cooperative registration fee",
        }
    }

    /// Legacy classification for rows without an explicit kind: a plain
    /// substring match on the description.
    pub fn from_description(description: &str) -> Option<Self> {
        if description.contains(MEMBER_DESCRIPTION_MARKER) {
            Some(Self::Member)
        } else if description.contains(COOPERATIVE_DESCRIPTION_MARKER) {
            Some(Self::Cooperative)
        } else {
            None
        }
    }

    /// The role that pays this kind of fee.
    pub fn payer_role(self) -> Role {
        match self {
            Self::Member => Role::Member,
            Self::Cooperative => Role::Cooperative,
        }
    }
}

impl TryFrom<&str> for RegistrationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "member" => Ok(Self::Member),
            "cooperative" => Ok(Self::Cooperative),
            other => Err(EngineError::InvalidInput(format!(
                "invalid registration kind: {other}"
            ))),
        }
    }
}

/// The role whose share of the registration fees is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareRole {
    Cooperative,
    Leader,
    ParentOrganization,
}

impl ShareRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cooperative => "cooperative",
            Self::Leader => "leader",
            Self::ParentOrganization => "parent_organization",
        }
    }

    /// Setting row holding the share percentage.
    pub fn setting_key(self) -> &'static str {
        match self {
            Self::Cooperative => "cooperative_allocation_percentage",
            Self::Leader => "leader_allocation_percentage",
            Self::ParentOrganization => "parent_organization_allocation_percentage",
        }
    }

    /// Share used when the setting row is missing or unreadable.
    pub fn default_percentage(self) -> Percentage {
        let basis_points = match self {
            Self::Cooperative => 2_000,
            Self::Leader => 1_500,
            Self::ParentOrganization => 500,
        };
        Percentage::from_basis_points(basis_points).unwrap_or_default()
    }

    /// Role a caller must hold to read or withdraw this share.
    pub fn required_role(self) -> Role {
        match self {
            Self::Cooperative => Role::Cooperative,
            Self::Leader => Role::Leader,
            Self::ParentOrganization => Role::ParentOrganization,
        }
    }
}

impl TryFrom<&str> for ShareRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cooperative" => Ok(Self::Cooperative),
            "leader" => Ok(Self::Leader),
            "parent_organization" => Ok(Self::ParentOrganization),
            other => Err(EngineError::InvalidInput(format!("invalid share role: {other}"))),
        }
    }
}

/// Which users' fees feed an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AllocationScope {
    /// Users attached to one cooperative.
    Cooperative(Uuid),
    /// Users of every cooperative under a parent organization.
    ParentOrganization(Uuid),
}

impl AllocationScope {
    pub fn id(self) -> Uuid {
        match self {
            Self::Cooperative(id) | Self::ParentOrganization(id) => id,
        }
    }
}

/// Fixed carve-outs and the share percentage for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationRates {
    pub member_carve_out: Kobo,
    pub cooperative_carve_out: Kobo,
    pub share: Percentage,
}

impl AllocationRates {
    pub fn carve_out_for(&self, kind: Option<RegistrationKind>) -> Kobo {
        match kind {
            Some(RegistrationKind::Member) => self.member_carve_out,
            Some(RegistrationKind::Cooperative) => self.cooperative_carve_out,
            None => Kobo::ZERO,
        }
    }

    /// Total super admin carve-out for a tally.
    pub fn super_admin_carve_out(&self, tally: &RegistrationTally) -> Kobo {
        let members = self
            .member_carve_out
            .checked_mul(tally.member_count)
            .unwrap_or(Kobo::new(i64::MAX));
        let cooperatives = self
            .cooperative_carve_out
            .checked_mul(tally.cooperative_count)
            .unwrap_or(Kobo::new(i64::MAX));
        members.saturating_add(cooperatives)
    }

    pub fn allocate(&self, tally: &RegistrationTally) -> Kobo {
        share_of_remainder(tally.raw_total, self.super_admin_carve_out(tally), self.share)
    }

    /// Allocation attributable to a single fee.
    pub fn allocate_fee(&self, fee: &RegistrationFee) -> Kobo {
        share_of_remainder(fee.amount, self.carve_out_for(fee.kind), self.share)
    }
}

/// `max(0, raw − carve_out) × share`.
pub fn share_of_remainder(raw: Kobo, carve_out: Kobo, share: Percentage) -> Kobo {
    share.apply(raw.saturating_sub(carve_out).floor_zero())
}

/// A successful registration-fee transaction, reduced to what the allocation
/// needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationFee {
    pub id: Uuid,
    pub reference: String,
    pub amount: Kobo,
    pub kind: Option<RegistrationKind>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationTally {
    pub raw_total: Kobo,
    pub member_count: u64,
    pub cooperative_count: u64,
}

impl RegistrationTally {
    pub fn record(&mut self, fee: &RegistrationFee) {
        self.raw_total = self.raw_total.saturating_add(fee.amount);
        match fee.kind {
            Some(RegistrationKind::Member) => self.member_count += 1,
            Some(RegistrationKind::Cooperative) => self.cooperative_count += 1,
            None => {}
        }
    }

    pub fn from_fees<'a>(fees: impl IntoIterator<Item = &'a RegistrationFee>) -> Self {
        let mut tally = Self::default();
        for fee in fees {
            tally.record(fee);
        }
        tally
    }
}

/// One calendar month, `[start, end)` in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn month_from_index(index: i32) -> (i32, u32) {
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// The `count` calendar months ending with the month of `now`, oldest first.
pub fn trailing_months(now: DateTime<Utc>, count: usize) -> Vec<MonthWindow> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let (year, month) = month_from_index(index);
            let (next_year, next_month) = month_from_index(index + 1);
            MonthWindow {
                year,
                month,
                start: month_start(year, month),
                end: month_start(next_year, next_month),
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlyAllocation {
    pub window: MonthWindow,
    pub tally: RegistrationTally,
    pub super_admin_carve_out: Kobo,
    pub allocation: Kobo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentAllocation {
    pub fee: RegistrationFee,
    pub allocation: Kobo,
}

/// Everything a dashboard needs about one role's share in one scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationSummary {
    pub share_role: ShareRole,
    pub scope: AllocationScope,
    pub percentage: Percentage,
    pub tally: RegistrationTally,
    pub super_admin_carve_out: Kobo,
    pub total_allocation: Kobo,
    pub recent: Vec<RecentAllocation>,
    pub monthly: Vec<MonthlyAllocation>,
}

impl AllocationSummary {
    /// Builds the summary from every successful fee in the scope.
    ///
    /// `fees` may be in any order; the recent list is sorted newest first.
    pub fn build(
        share_role: ShareRole,
        scope: AllocationScope,
        rates: &AllocationRates,
        fees: &[RegistrationFee],
        now: DateTime<Utc>,
    ) -> Self {
        let tally = RegistrationTally::from_fees(fees);

        let mut newest: Vec<&RegistrationFee> = fees.iter().collect();
        newest.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let recent = newest
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|fee| RecentAllocation {
                fee: fee.clone(),
                allocation: rates.allocate_fee(fee),
            })
            .collect();

        let monthly = trailing_months(now, BREAKDOWN_MONTHS)
            .into_iter()
            .map(|window| {
                let tally =
                    RegistrationTally::from_fees(fees.iter().filter(|f| window.contains(f.created_at)));
                MonthlyAllocation {
                    window,
                    super_admin_carve_out: rates.super_admin_carve_out(&tally),
                    allocation: rates.allocate(&tally),
                    tally,
                }
            })
            .collect();

        Self {
            share_role,
            scope,
            percentage: rates.share,
            super_admin_carve_out: rates.super_admin_carve_out(&tally),
            total_allocation: rates.allocate(&tally),
            tally,
            recent,
            monthly,
        }
    }
}

/// `allocation − pending`, the amount a role-holder may still request.
pub fn available_balance(allocation: Kobo, pending: Kobo) -> Kobo {
    allocation.saturating_sub(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(member: i64, cooperative: i64, percent: u32) -> AllocationRates {
        AllocationRates {
            member_carve_out: Kobo::new(member),
            cooperative_carve_out: Kobo::new(cooperative),
            share: Percentage::from_percent(percent).unwrap(),
        }
    }

    fn fee(amount: i64, kind: Option<RegistrationKind>, at: DateTime<Utc>) -> RegistrationFee {
        RegistrationFee {
            id: Uuid::new_v4(),
            reference: format!("REG_{}", Uuid::new_v4().simple()),
            amount: Kobo::new(amount),
            kind,
            description: kind.map(|k| k.fee_description().to_string()),
            created_at: at,
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn share_of_remainder_is_never_negative() {
        let twenty = Percentage::from_percent(20).unwrap();
        assert_eq!(share_of_remainder(Kobo::new(1_000), Kobo::new(5_000), twenty), Kobo::ZERO);
        assert_eq!(share_of_remainder(Kobo::new(5_000), Kobo::new(5_000), twenty), Kobo::ZERO);
        assert_eq!(
            share_of_remainder(Kobo::new(15_000), Kobo::new(5_000), twenty),
            Kobo::new(2_000)
        );
    }

    #[test]
    fn carve_out_is_count_times_configured_amount() {
        let rates = rates(50_000, 500_000, 20);
        let tally = RegistrationTally {
            raw_total: Kobo::new(10_000_000),
            member_count: 7,
            cooperative_count: 3,
        };
        assert_eq!(
            rates.super_admin_carve_out(&tally),
            Kobo::new(7 * 50_000 + 3 * 500_000)
        );
        assert_eq!(
            rates.allocate(&tally),
            Kobo::new((10_000_000 - 1_850_000) / 5)
        );
    }

    #[test]
    fn description_fallback_matches_legacy_markers() {
        assert_eq!(
            RegistrationKind::from_description("Member registration fee for Ada"),
            Some(RegistrationKind::Member)
        );
        assert_eq!(
            RegistrationKind::from_description("Cooperative registration - Ikeja"),
            Some(RegistrationKind::Cooperative)
        );
        assert_eq!(RegistrationKind::from_description("member registration"), None);
        assert_eq!(RegistrationKind::from_description("Annual dues"), None);
    }

    #[test]
    fn unclassified_fee_counts_in_sum_without_carve_out() {
        let now = at(2026, 10, 19);
        let rates = rates(1_000, 10_000, 10);
        let fees = vec![fee(5_000, None, now), fee(3_000, Some(RegistrationKind::Member), now)];
        let tally = RegistrationTally::from_fees(&fees);
        assert_eq!(tally.raw_total, Kobo::new(8_000));
        assert_eq!(tally.member_count, 1);
        assert_eq!(tally.cooperative_count, 0);
        assert_eq!(rates.allocate(&tally), Kobo::new(700));
    }

    #[test]
    fn trailing_months_cross_year_boundary() {
        let months = trailing_months(at(2026, 2, 10), 12);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label(), "2025-03");
        assert_eq!(months[9].label(), "2025-12");
        assert_eq!(months[11].label(), "2026-02");
        assert_eq!(months[9].end, months[10].start);
        assert_eq!(months[11].end, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_breakdown_is_consistent_with_total() {
        let now = at(2026, 10, 19);
        let rates = rates(1_000, 10_000, 20);
        let fees = vec![
            fee(20_000, Some(RegistrationKind::Member), at(2026, 10, 1)),
            fee(20_000, Some(RegistrationKind::Member), at(2026, 9, 30)),
            fee(50_000, Some(RegistrationKind::Cooperative), at(2026, 1, 15)),
            // Older than the series: counted in the total only.
            fee(20_000, Some(RegistrationKind::Member), at(2025, 10, 31)),
        ];
        let summary = AllocationSummary::build(
            ShareRole::Cooperative,
            AllocationScope::Cooperative(Uuid::new_v4()),
            &rates,
            &fees,
            now,
        );

        assert_eq!(summary.monthly.len(), BREAKDOWN_MONTHS);
        assert_eq!(summary.monthly[11].window.label(), "2026-10");
        assert_eq!(summary.monthly[11].tally.member_count, 1);
        assert_eq!(summary.monthly[10].tally.member_count, 1);
        assert_eq!(summary.monthly[2].tally.cooperative_count, 1);

        let monthly_sum: Kobo = summary.monthly.iter().map(|m| m.allocation).sum();
        assert!(monthly_sum <= summary.total_allocation);
        assert_eq!(
            summary.total_allocation,
            monthly_sum + rates.allocate(&RegistrationTally::from_fees(&fees[3..]))
        );
    }

    #[test]
    fn recent_list_is_newest_first_and_capped() {
        let now = at(2026, 10, 19);
        let rates = rates(1_000, 10_000, 20);
        let fees: Vec<RegistrationFee> = (1..=12)
            .map(|day| fee(11_000, Some(RegistrationKind::Member), at(2026, 9, day)))
            .collect();
        let summary = AllocationSummary::build(
            ShareRole::Leader,
            AllocationScope::Cooperative(Uuid::new_v4()),
            &rates,
            &fees,
            now,
        );
        assert_eq!(summary.recent.len(), RECENT_LIMIT);
        assert_eq!(summary.recent[0].fee.created_at, at(2026, 9, 12));
        assert!(summary.recent.iter().all(|r| r.allocation == Kobo::new(2_000)));
    }

    #[test]
    fn available_balance_subtracts_pending() {
        assert_eq!(available_balance(Kobo::new(10_000), Kobo::new(2_500)), Kobo::new(7_500));
        assert_eq!(available_balance(Kobo::new(1_000), Kobo::new(2_500)), Kobo::new(-1_500));
    }
}
