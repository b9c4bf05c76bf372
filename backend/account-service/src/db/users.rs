/// User database operations for account-service
use crate::error::{AccountError, Result};
use crate::models::{CredentialState, LockState, NewUser, ProfileChanges, User, Wallet};
use sqlx::PgPool;
use uuid::Uuid;

use super::wallets;

/// Find an active user by phone number
pub async fn find_active_by_phone(pool: &PgPool, phone: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE phone_number = $1 AND is_active = true",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Read only the lockout columns of an active user
pub async fn find_lock_state(pool: &PgPool, phone: &str) -> Result<Option<LockState>> {
    let state = sqlx::query_as::<_, LockState>(
        "SELECT id, quota, locked FROM users WHERE phone_number = $1 AND is_active = true",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(state)
}

/// Read the lockout columns and PIN hash of an active user
pub async fn find_credential_state(pool: &PgPool, phone: &str) -> Result<Option<CredentialState>> {
    let state = sqlx::query_as::<_, CredentialState>(
        "SELECT id, pin, quota, locked FROM users WHERE phone_number = $1 AND is_active = true",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(state)
}

pub async fn phone_exists(pool: &PgPool, phone: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE phone_number = $1 AND is_active = true)",
    )
    .bind(phone)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Create a user and its wallet in one transaction
pub async fn create_with_wallet(
    pool: &PgPool,
    new_user: &NewUser,
    currency: &str,
) -> Result<(User, Wallet)> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, first_name, last_name, phone_number, pin, device_token)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.phone_number)
    .bind(&new_user.pin_hash)
    .bind(&new_user.device_token)
    .fetch_one(tx.as_mut())
    .await
    .map_err(|e| match e {
        // Lost a registration race on the active-phone index
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AccountError::AlreadyRegistered,
        other => AccountError::from(other),
    })?;

    let wallet = wallets::insert(&mut tx, user.id, currency).await?;

    tx.commit().await?;

    Ok((user, wallet))
}

/// Count one failed attempt. Matches nothing once the account is locked or
/// the counter has reached `max_attempts`.
pub async fn increment_quota(pool: &PgPool, phone: &str, max_attempts: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET quota = quota + 1, updated_at = NOW()
        WHERE phone_number = $1
          AND is_active = true
          AND locked = false
          AND quota < $2
        "#,
    )
    .bind(phone)
    .bind(max_attempts)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lock a user and its wallet. Returns true only for the call that flipped
/// `locked`, so exactly one caller sends the lockout notice.
pub async fn lock(pool: &PgPool, user_id: Uuid, max_attempts: i32) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET locked = true, updated_at = NOW()
        WHERE id = $1
          AND is_active = true
          AND locked = false
          AND quota >= $2
        "#,
    )
    .bind(user_id)
    .bind(max_attempts)
    .execute(tx.as_mut())
    .await?;

    let newly_locked = result.rows_affected() > 0;
    if newly_locked {
        wallets::set_locked(&mut tx, user_id, true).await?;
    }

    tx.commit().await?;

    Ok(newly_locked)
}

pub async fn reset_quota(pool: &PgPool, phone: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET quota = 0, updated_at = NOW()
        WHERE phone_number = $1
          AND is_active = true
          AND locked = false
        "#,
    )
    .bind(phone)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_device_token(pool: &PgPool, phone: &str, device_token: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET device_token = $2, updated_at = NOW()
        WHERE phone_number = $1 AND is_active = true
        "#,
    )
    .bind(phone)
    .bind(device_token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Change the PIN of a clean account (active, unlocked, no pending failures)
pub async fn update_pin(pool: &PgPool, phone: &str, pin_hash: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET pin = $2, updated_at = NOW()
        WHERE phone_number = $1
          AND is_active = true
          AND locked = false
          AND quota = 0
        "#,
    )
    .bind(phone)
    .bind(pin_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// OTP-gated reset: replace the PIN, clear the counter and unlock the user
/// and wallet together
pub async fn reset_pin(pool: &PgPool, phone: &str, pin_hash: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let user_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET pin = $2, quota = 0, locked = false, updated_at = NOW()
        WHERE phone_number = $1 AND is_active = true
        RETURNING id
        "#,
    )
    .bind(phone)
    .bind(pin_hash)
    .fetch_optional(tx.as_mut())
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        return Ok(false);
    };

    wallets::set_locked(&mut tx, user_id, false).await?;
    tx.commit().await?;

    Ok(true)
}

/// Partial profile update; absent fields keep their value
pub async fn update_profile(
    pool: &PgPool,
    phone: &str,
    changes: &ProfileChanges,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            photo = COALESCE($4, photo),
            face_id = COALESCE($5, face_id),
            finger_print = COALESCE($6, finger_print),
            updated_at = NOW()
        WHERE phone_number = $1 AND is_active = true
        RETURNING *
        "#,
    )
    .bind(phone)
    .bind(changes.first_name.as_deref())
    .bind(changes.last_name.as_deref())
    .bind(changes.photo.as_deref())
    .bind(changes.face_id)
    .bind(changes.finger_print)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Soft-delete: deactivate and lock the user and every wallet it owns
pub async fn deactivate(pool: &PgPool, user_id: Uuid, max_attempts: i32) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_active = false, locked = true, quota = $2, updated_at = NOW()
        WHERE id = $1 AND is_active = true
        "#,
    )
    .bind(user_id)
    .bind(max_attempts)
    .execute(tx.as_mut())
    .await?;

    wallets::deactivate_for_user(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}
