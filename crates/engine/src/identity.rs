//! Roles, login identifiers and password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

const MIN_PASSWORD_LEN: usize = 8;

/// Role held by a user account. A user has exactly one role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Apex,
    Leader,
    Cooperative,
    Member,
    ParentOrganization,
    Finance,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Apex => "APEX",
            Self::Leader => "LEADER",
            Self::Cooperative => "COOPERATIVE",
            Self::Member => "MEMBER",
            Self::ParentOrganization => "PARENT_ORGANIZATION",
            Self::Finance => "FINANCE",
        }
    }

    /// Roles allowed to look at any scope and to process withdrawals.
    pub fn is_back_office(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Apex | Self::Finance)
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "APEX" => Ok(Self::Apex),
            "LEADER" => Ok(Self::Leader),
            "COOPERATIVE" => Ok(Self::Cooperative),
            "MEMBER" => Ok(Self::Member),
            "PARENT_ORGANIZATION" => Ok(Self::ParentOrganization),
            "FINANCE" => Ok(Self::Finance),
            other => Err(EngineError::InvalidRole(format!("unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a user typed in the login field, already normalised for lookup.
///
/// Dispatch rules:
/// - anything containing `@` is an email (lowercased)
/// - `+234…` / `234…` international numbers become local `0…` phone numbers
/// - 10 digits starting with 7, 8 or 9 are phone numbers missing the leading `0`
/// - 11 digits starting with `0` are phone numbers
/// - any other 11-digit string is a NIN
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Phone(String),
    Nin(String),
}

impl LoginIdentifier {
    pub fn parse(raw: &str) -> ResultEngine<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidInput(
                "email, phone number or NIN is required".to_string(),
            ));
        }
        if trimmed.contains('@') {
            return normalize_email(trimmed).map(Self::Email);
        }

        let compact: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        let (international, digits) = match compact.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, compact.as_str()),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::InvalidInput(format!(
                "unrecognised login identifier: {trimmed}"
            )));
        }

        if let Some(local) = digits.strip_prefix("234")
            && local.len() == 10
        {
            return Ok(Self::Phone(format!("0{local}")));
        }
        if international {
            return Err(EngineError::InvalidInput(
                "only Nigerian (+234) phone numbers are supported".to_string(),
            ));
        }

        match digits.len() {
            10 if digits.starts_with(['7', '8', '9']) => Ok(Self::Phone(format!("0{digits}"))),
            11 if digits.starts_with('0') => Ok(Self::Phone(digits.to_string())),
            11 => Ok(Self::Nin(digits.to_string())),
            _ => Err(EngineError::InvalidInput(format!(
                "unrecognised login identifier: {trimmed}"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
            Self::Nin(_) => "nin",
        }
    }
}

pub(crate) fn normalize_email(raw: &str) -> ResultEngine<String> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(EngineError::InvalidInput(format!("invalid email: {raw}")));
    }
    Ok(email)
}

/// Normalises a phone number to the local `0XXXXXXXXXX` form.
pub(crate) fn normalize_phone(raw: &str) -> ResultEngine<String> {
    match LoginIdentifier::parse(raw)? {
        LoginIdentifier::Phone(phone) => Ok(phone),
        _ => Err(EngineError::InvalidInput(format!("invalid phone number: {raw}"))),
    }
}

/// A NIN is exactly 11 digits.
pub(crate) fn normalize_nin(raw: &str) -> ResultEngine<String> {
    let nin = raw.trim();
    if nin.len() != 11 || !nin.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::InvalidInput(
            "NIN must be exactly 11 digits".to_string(),
        ));
    }
    Ok(nin.to_string())
}

pub(crate) fn hash_password(password: &str) -> ResultEngine<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::InvalidInput(format!("cannot hash password: {err}")))
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleven_digits_route_to_nin() {
        assert_eq!(
            LoginIdentifier::parse("12345678901").unwrap(),
            LoginIdentifier::Nin("12345678901".to_string())
        );
    }

    #[test]
    fn local_phone_is_kept() {
        assert_eq!(
            LoginIdentifier::parse("08012345678").unwrap(),
            LoginIdentifier::Phone("08012345678".to_string())
        );
    }

    #[test]
    fn international_and_short_phones_normalise() {
        let expected = LoginIdentifier::Phone("08012345678".to_string());
        assert_eq!(LoginIdentifier::parse("+2348012345678").unwrap(), expected);
        assert_eq!(LoginIdentifier::parse("2348012345678").unwrap(), expected);
        assert_eq!(LoginIdentifier::parse("8012345678").unwrap(), expected);
        assert_eq!(LoginIdentifier::parse("0801 234 5678").unwrap(), expected);
    }

    #[test]
    fn email_uses_email_branch() {
        assert_eq!(
            LoginIdentifier::parse("a@b.com").unwrap(),
            LoginIdentifier::Email("a@b.com".to_string())
        );
        assert_eq!(
            LoginIdentifier::parse(" Ada@Coop.NG ").unwrap(),
            LoginIdentifier::Email("ada@coop.ng".to_string())
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(LoginIdentifier::parse("").is_err());
        assert!(LoginIdentifier::parse("12345").is_err());
        assert!(LoginIdentifier::parse("abc").is_err());
        assert!(LoginIdentifier::parse("+447911123456").is_err());
        assert!(LoginIdentifier::parse("foo@bar").is_err());
    }

    #[test]
    fn role_round_trips_through_storage_string() {
        for role in [
            Role::SuperAdmin,
            Role::Apex,
            Role::Leader,
            Role::Cooperative,
            Role::Member,
            Role::ParentOrganization,
            Role::Finance,
        ] {
            assert_eq!(Role::try_from(role.as_str()).unwrap(), role);
        }
        assert!(Role::try_from("ADMIN").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(hash_password("short").is_err());
    }
}
