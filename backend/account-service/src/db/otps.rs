/// OTP database operations
use crate::error::Result;
use crate::models::{NewOtp, Otp};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn insert(pool: &PgPool, otp: &NewOtp) -> Result<Otp> {
    let otp = sqlx::query_as::<_, Otp>(
        r#"
        INSERT INTO otps (id, code, phone_number, key_uid, expiry_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&otp.code)
    .bind(&otp.phone_number)
    .bind(otp.key_uid)
    .bind(otp.expiry_at)
    .fetch_one(pool)
    .await?;

    Ok(otp)
}

pub async fn find_by_key_uid(pool: &PgPool, key_uid: Uuid) -> Result<Option<Otp>> {
    let otp = sqlx::query_as::<_, Otp>("SELECT * FROM otps WHERE key_uid = $1")
        .bind(key_uid)
        .fetch_optional(pool)
        .await?;

    Ok(otp)
}

/// Flip `is_used`. Of two concurrent callers only one sees `true`.
pub async fn mark_used(pool: &PgPool, otp_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE otps
        SET is_used = true, updated_at = $2
        WHERE id = $1
          AND is_used = false
          AND expiry_at > $2
        "#,
    )
    .bind(otp_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
