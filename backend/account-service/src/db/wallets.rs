/// Wallet database operations. Balance mutation lives elsewhere; this module
/// only creates wallets and keeps their flags in step with the owner.
use crate::error::Result;
use crate::models::Wallet;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Active wallet of the active user holding `phone`
pub async fn find_active_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Wallet>> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT w.*
        FROM wallets w
        JOIN users u ON u.id = w.user_id
        WHERE u.phone_number = $1
          AND u.is_active = true
          AND w.is_active = true
        "#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(wallet)
}

pub(crate) async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    currency: &str,
) -> Result<Wallet> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (id, user_id, balance, currency)
        VALUES ($1, $2, 0, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(currency)
    .fetch_one(tx.as_mut())
    .await?;

    Ok(wallet)
}

pub(crate) async fn set_locked(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    locked: bool,
) -> Result<()> {
    sqlx::query(
        "UPDATE wallets SET locked = $2, updated_at = NOW() WHERE user_id = $1 AND is_active = true",
    )
    .bind(user_id)
    .bind(locked)
    .execute(tx.as_mut())
    .await?;

    Ok(())
}

pub(crate) async fn deactivate_for_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET is_active = false, locked = true, updated_at = NOW()
        WHERE user_id = $1 AND is_active = true
        "#,
    )
    .bind(user_id)
    .execute(tx.as_mut())
    .await?;

    Ok(())
}
