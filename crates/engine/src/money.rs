use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer kobo** (1 naira = 100 kobo).
///
/// Use this type for **all** monetary values in the engine (fees,
/// allocations, withdrawals) to avoid floating-point drift. Conversion to
/// naira happens only at the API boundary.
///
/// # Examples
///
/// ```rust
/// use engine::Kobo;
///
/// let amount = Kobo::new(12_34);
/// assert_eq!(amount.kobo(), 1234);
/// assert_eq!(amount.to_string(), "₦12.34");
/// ```
///
/// Parsing naira from user input (accepts `.` or `,` as decimal separator;
/// rejects > 2 decimals):
///
/// ```rust
/// use engine::Kobo;
///
/// assert_eq!("10".parse::<Kobo>().unwrap().kobo(), 1000);
/// assert_eq!("10,5".parse::<Kobo>().unwrap().kobo(), 1050);
/// assert!("12.345".parse::<Kobo>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Kobo(i64);

impl Kobo {
    pub const ZERO: Kobo = Kobo(0);

    /// Creates a new amount from integer kobo.
    #[must_use]
    pub const fn new(kobo: i64) -> Self {
        Self(kobo)
    }

    /// Returns the raw value in kobo.
    #[must_use]
    pub const fn kobo(self) -> i64 {
        self.0
    }

    /// Converts a naira amount coming from a client into kobo, rounding to
    /// the nearest kobo (`round(naira * 100)`).
    pub fn from_naira(naira: f64) -> Result<Self, EngineError> {
        if !naira.is_finite() {
            return Err(EngineError::InvalidAmount("amount must be a number".to_string()));
        }
        let kobo = (naira * 100.0).round();
        if kobo.abs() >= i64::MAX as f64 {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Self(kobo as i64))
    }

    /// Naira value for display in API responses.
    #[must_use]
    pub fn to_naira(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    #[must_use]
    pub const fn floor_zero(self) -> Self {
        if self.0 < 0 { Self::ZERO } else { self }
    }

    /// Checked multiplication by a count (returns `None` on overflow).
    #[must_use]
    pub fn checked_mul(self, count: u64) -> Option<Kobo> {
        i64::try_from(count)
            .ok()
            .and_then(|count| self.0.checked_mul(count))
            .map(Kobo)
    }

    /// Saturating addition, used when folding large aggregates.
    #[must_use]
    pub const fn saturating_add(self, rhs: Kobo) -> Kobo {
        Kobo(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Kobo) -> Kobo {
        Kobo(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Kobo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let naira = abs / 100;
        let kobo = abs % 100;
        write!(f, "{sign}₦{naira}.{kobo:02}")
    }
}

impl From<i64> for Kobo {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Kobo> for i64 {
    fn from(value: Kobo) -> Self {
        value.0
    }
}

impl Add for Kobo {
    type Output = Kobo;

    fn add(self, rhs: Kobo) -> Self::Output {
        Kobo(self.0 + rhs.0)
    }
}

impl AddAssign for Kobo {
    fn add_assign(&mut self, rhs: Kobo) {
        self.0 += rhs.0;
    }
}

impl Sub for Kobo {
    type Output = Kobo;

    fn sub(self, rhs: Kobo) -> Self::Output {
        Kobo(self.0 - rhs.0)
    }
}

impl SubAssign for Kobo {
    fn sub_assign(&mut self, rhs: Kobo) {
        self.0 -= rhs.0;
    }
}

impl Neg for Kobo {
    type Output = Kobo;

    fn neg(self) -> Self::Output {
        Kobo(-self.0)
    }
}

impl std::iter::Sum for Kobo {
    fn sum<I: Iterator<Item = Kobo>>(iter: I) -> Self {
        iter.fold(Kobo::ZERO, Kobo::saturating_add)
    }
}

impl FromStr for Kobo {
    type Err = EngineError;

    /// Parses a naira decimal string into kobo.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Kobo)
    }
}

/// A share percentage stored as basis points (hundredths of a percent).
///
/// `Percentage` parses the same decimal syntax as [`Kobo`], so `"20"` is
/// 20 % and `"12.5"` is 12.5 %. Values outside `0..=100` are rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(u32);

impl Percentage {
    const FULL: u32 = 100 * 100;

    /// Creates a percentage from whole percent points.
    pub fn from_percent(percent: u32) -> Result<Self, EngineError> {
        Self::from_basis_points(percent.saturating_mul(100))
    }

    pub fn from_basis_points(basis_points: u32) -> Result<Self, EngineError> {
        if basis_points > Self::FULL {
            return Err(EngineError::InvalidSetting(
                "percentage must be between 0 and 100".to_string(),
            ));
        }
        Ok(Self(basis_points))
    }

    #[must_use]
    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Percent value for display (`12.5` for 1250 basis points).
    #[must_use]
    pub fn as_percent(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Applies the percentage to an amount, rounding towards zero.
    #[must_use]
    pub fn apply(self, amount: Kobo) -> Kobo {
        let scaled = i128::from(amount.kobo()) * i128::from(self.0) / i128::from(Self::FULL);
        // |scaled| <= |amount| because the percentage is capped at 100 %.
        Kobo(scaled as i64)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}

impl FromStr for Percentage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hundredths = parse_hundredths(s.trim().trim_end_matches('%'))
            .map_err(|err| EngineError::InvalidSetting(format!("invalid percentage: {err}")))?;
        let basis_points = u32::try_from(hundredths).map_err(|_| {
            EngineError::InvalidSetting("percentage must be between 0 and 100".to_string())
        })?;
        Self::from_basis_points(basis_points)
    }
}

/// Parses a signed decimal with at most two fractional digits into
/// hundredths (`"12.3"` -> `1230`).
fn parse_hundredths(s: &str) -> Result<i64, EngineError> {
    let empty = || EngineError::InvalidAmount("empty amount".to_string());
    let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
    let overflow = || EngineError::InvalidAmount("amount too large".to_string());

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(empty());
    }

    let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (-1i64, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (1i64, stripped)
    } else {
        (1i64, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(empty());
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let whole_str = parts.next().ok_or_else(invalid)?;
    let frac_str = parts.next();

    if parts.next().is_some() {
        return Err(invalid());
    }

    if whole_str.is_empty() || !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: i64 = whole_str.parse().map_err(|_| overflow())?;

    let frac: i64 = match frac_str {
        None | Some("") => 0,
        Some(frac) => {
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            match frac.len() {
                1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                2 => frac.parse::<i64>().map_err(|_| invalid())?,
                _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
            }
        }
    };

    let total = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)?;

    if sign < 0 {
        total.checked_neg().ok_or_else(overflow)
    } else {
        Ok(total)
    }
}
