use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    AuditAction, EngineError, LoginIdentifier, ResultEngine, Role, User, audit_log,
    commands::RegisterUserCmd,
    cooperatives,
    identity::{hash_password, normalize_email, normalize_nin, normalize_phone, verify_password},
    leaders, password_resets, users,
    util::{display_name, optional_text},
};

use super::{Engine, with_tx};

/// Lifetime of a password reset token.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Roles allowed to add members.
const MEMBER_CREATORS: [Role; 3] = [Role::SuperAdmin, Role::Cooperative, Role::Leader];

fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Engine {
    /// Reject the command early when its email, phone or NIN is taken, so the
    /// caller gets the specific message. The unique indexes still back this up.
    async fn ensure_unique_identity(
        &self,
        db: &DatabaseTransaction,
        user: &User,
    ) -> ResultEngine<()> {
        if users::Entity::find()
            .filter(users::Column::Email.eq(user.email.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(
                "A user with this email already exists".to_string(),
            ));
        }
        if let Some(nin) = &user.nin
            && users::Entity::find()
                .filter(users::Column::Nin.eq(nin.clone()))
                .one(db)
                .await?
                .is_some()
        {
            return Err(EngineError::ExistingKey(
                "A user with this NIN already exists".to_string(),
            ));
        }
        if let Some(phone) = &user.phone
            && users::Entity::find()
                .filter(users::Column::Phone.eq(phone.clone()))
                .one(db)
                .await?
                .is_some()
        {
            return Err(EngineError::ExistingKey(
                "A user with this phone number already exists".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_user(
        &self,
        db: &DatabaseTransaction,
        cmd: RegisterUserCmd,
    ) -> ResultEngine<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: display_name(&cmd.name, "name")?,
            email: normalize_email(&cmd.email)?,
            phone: optional_text(cmd.phone.as_deref())
                .map(|phone| normalize_phone(&phone))
                .transpose()?,
            nin: optional_text(cmd.nin.as_deref())
                .map(|nin| normalize_nin(&nin))
                .transpose()?,
            role: cmd.role,
            cooperative_id: cmd.cooperative_id,
            created_at: Utc::now(),
        };
        let password_hash = hash_password(&cmd.password)?;

        if let Some(cooperative_id) = user.cooperative_id
            && cooperatives::Entity::find_by_id(cooperative_id)
                .one(db)
                .await?
                .is_none()
        {
            return Err(EngineError::KeyNotFound("cooperative not exists".to_string()));
        }
        self.ensure_unique_identity(db, &user).await?;

        user.active_model(password_hash)
            .insert(db)
            .await
            .map_err(EngineError::from_insert)?;
        Ok(user)
    }

    /// Create a user account with any role.
    pub async fn register_user(&self, cmd: RegisterUserCmd) -> ResultEngine<User> {
        with_tx!(self, |db_tx| self.insert_user(&db_tx, cmd).await)
    }

    /// Add a `MEMBER` on behalf of `actor_id`.
    ///
    /// Cooperative accounts and leaders may only add members to their own
    /// cooperative; a super admin must name the cooperative.
    pub async fn create_member(
        &self,
        actor_id: Uuid,
        mut cmd: RegisterUserCmd,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let actor = self.require_role(&db_tx, actor_id, &MEMBER_CREATORS).await?;
            let own_cooperative = match actor.role {
                Role::Cooperative => cooperatives::Entity::find()
                    .filter(cooperatives::Column::UserId.eq(actor.id))
                    .one(&db_tx)
                    .await?
                    .map(|coop| coop.id),
                Role::Leader => leaders::Entity::find()
                    .filter(leaders::Column::UserId.eq(actor.id))
                    .one(&db_tx)
                    .await?
                    .map(|leader| leader.cooperative_id),
                _ => None,
            };

            let cooperative_id = match (actor.role, own_cooperative, cmd.cooperative_id) {
                (Role::SuperAdmin, _, Some(id)) => id,
                (Role::SuperAdmin, _, None) => {
                    return Err(EngineError::InvalidInput(
                        "cooperative_id is required".to_string(),
                    ));
                }
                (_, None, _) => {
                    return Err(EngineError::MissingScope(
                        "no cooperative is linked to this account".to_string(),
                    ));
                }
                (_, Some(own), Some(requested)) if own != requested => {
                    return Err(EngineError::Forbidden(
                        "members can only be added to your own cooperative".to_string(),
                    ));
                }
                (_, Some(own), _) => own,
            };

            cmd.role = Role::Member;
            cmd.cooperative_id = Some(cooperative_id);
            let member = self.insert_user(&db_tx, cmd).await?;
            tracing::info!(%actor_id, member_id = %member.id, %cooperative_id, "member created");
            Ok(member)
        })
    }

    /// Check credentials. Every failure is reported the same way.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> ResultEngine<User> {
        let invalid = || EngineError::Unauthorized("invalid credentials".to_string());
        let identifier = LoginIdentifier::parse(identifier).map_err(|_| invalid())?;
        with_tx!(self, |db_tx| {
            let query = match &identifier {
                LoginIdentifier::Email(email) => {
                    users::Entity::find().filter(users::Column::Email.eq(email.clone()))
                }
                LoginIdentifier::Phone(phone) => {
                    users::Entity::find().filter(users::Column::Phone.eq(phone.clone()))
                }
                LoginIdentifier::Nin(nin) => {
                    users::Entity::find().filter(users::Column::Nin.eq(nin.clone()))
                }
            };
            let Some(model) = query.one(&db_tx).await? else {
                tracing::debug!(kind = identifier.kind(), "login for unknown identifier");
                return Err(invalid());
            };
            if !verify_password(password, &model.password_hash) {
                return Err(invalid());
            }
            User::try_from(model)
        })
    }

    /// Issue a password reset token for `email`.
    ///
    /// Returns `None` when no account uses that address; callers must answer
    /// both cases identically.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<String>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        with_tx!(self, |db_tx| {
            let Some(user) = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
            else {
                return Ok(None);
            };
            let token = generate_reset_token();
            password_resets::ActiveModel {
                token_hash: ActiveValue::Set(hash_reset_token(&token)),
                user_id: ActiveValue::Set(user.id),
                expires_at: ActiveValue::Set(now + Duration::minutes(RESET_TOKEN_TTL_MINUTES)),
                used_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user_id = %user.id, "password reset token issued");
            Ok(Some(token))
        })
    }

    /// Consume a reset token and set a new password.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let invalid = || EngineError::InvalidInput("invalid or expired reset token".to_string());
        let password_hash = hash_password(new_password)?;
        with_tx!(self, |db_tx| {
            let reset = password_resets::Entity::find_by_id(hash_reset_token(token.trim()))
                .one(&db_tx)
                .await?
                .ok_or_else(invalid)?;
            if reset.used_at.is_some() || reset.expires_at <= now {
                return Err(invalid());
            }

            users::ActiveModel {
                id: ActiveValue::Unchanged(reset.user_id),
                password_hash: ActiveValue::Set(password_hash),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            password_resets::ActiveModel {
                token_hash: ActiveValue::Unchanged(reset.token_hash.clone()),
                used_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            audit_log::ActiveModel::record(
                reset.user_id,
                AuditAction::PasswordReset,
                format!("user:{}", reset.user_id),
                now,
            )
            .insert(&db_tx)
            .await?;
            Ok(())
        })
    }
}
