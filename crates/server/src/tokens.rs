//! Signed bearer tokens.
//!
//! A token is `v1.<payload>.<sig>`: the payload is base64url JSON claims and
//! the signature is base64url HMAC-SHA256 over `v1.<payload>`. Two kinds of
//! claims exist: login sessions and impersonation delegations. A delegation
//! is never accepted where a session is expected and vice versa.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone, Utc};
use engine::Role;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION_V1: &str = "v1";
const MAX_TOKEN_LEN: usize = 2048;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token version")]
    UnsupportedVersion,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("unexpected token kind")]
    WrongKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
}

/// A super admin (`actor`) acting as `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationClaims {
    pub actor: Uuid,
    pub target: Uuid,
    pub target_role: Role,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
enum Claims {
    Session(SessionClaims),
    Delegation(DelegationClaims),
}

impl Claims {
    fn exp(&self) -> i64 {
        match self {
            Self::Session(claims) => claims.exp,
            Self::Delegation(claims) => claims.exp,
        }
    }
}

pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self { secret })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::WeakSecret)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let signed = format!("{TOKEN_VERSION_V1}.{payload_part}");
        let mut mac = self.mac()?;
        mac.update(signed.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signed}.{sig_part}"))
    }

    fn open(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let mut parts = token.split('.');
        let (Some(version), Some(payload_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if version != TOKEN_VERSION_V1 {
            return Err(TokenError::UnsupportedVersion);
        }

        let mut mac = self.mac()?;
        mac.update(version.as_bytes());
        mac.update(b".");
        mac.update(payload_part.as_bytes());
        let sig = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| TokenError::Malformed)?;
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if claims.exp() <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    pub fn issue_session(
        &self,
        user_id: Uuid,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&Claims::Session(SessionClaims {
            sub: user_id,
            role,
            exp: expires_at.timestamp(),
        }))
    }

    pub fn verify_session(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        match self.open(token, now)? {
            Claims::Session(claims) => Ok(claims),
            Claims::Delegation(_) => Err(TokenError::WrongKind),
        }
    }

    pub fn issue_delegation(
        &self,
        actor: Uuid,
        target: Uuid,
        target_role: Role,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&Claims::Delegation(DelegationClaims {
            actor,
            target,
            target_role,
            exp: expires_at.timestamp(),
        }))
    }

    pub fn verify_delegation(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DelegationClaims, TokenError> {
        match self.open(token, now)? {
            Claims::Delegation(claims) => Ok(claims),
            Claims::Session(_) => Err(TokenError::WrongKind),
        }
    }
}

/// `exp` as a timestamp, for responses.
pub(crate) fn expiry(exp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(exp, 0).single().unwrap_or(DateTime::<Utc>::MAX_UTC)
}
