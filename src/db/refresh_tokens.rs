//! Database operations for refresh tokens.
//!
//! Tokens are opaque random strings; only their SHA-256 hashes are stored.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entity::refresh_token::{self, Entity as RefreshToken};
use crate::error::AppResult;

/// Generate a new opaque refresh token.
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

/// Hash a refresh token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Store a new refresh token hash for a user.
pub async fn insert(
    db: &DatabaseConnection,
    user_id: Uuid,
    token_hash: &str,
    ttl_secs: u64,
) -> AppResult<()> {
    let now = Utc::now();

    let model = refresh_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        token_hash: Set(token_hash.to_string()),
        expires_at: Set(now + Duration::seconds(ttl_secs as i64)),
        revoked_at: Set(None),
        created_at: Set(now),
    };

    RefreshToken::insert(model).exec(db).await?;
    Ok(())
}

/// Find the owning user of a valid (unrevoked, unexpired) refresh token hash.
pub async fn find_valid_by_hash(
    db: &DatabaseConnection,
    token_hash: &str,
) -> AppResult<Option<Uuid>> {
    let row = RefreshToken::find()
        .filter(refresh_token::Column::TokenHash.eq(token_hash))
        .filter(refresh_token::Column::RevokedAt.is_null())
        .filter(refresh_token::Column::ExpiresAt.gt(Utc::now()))
        .one(db)
        .await?;

    Ok(row.map(|r| r.user_id))
}

/// Revoke a refresh token by hash (rotation and logout).
pub async fn revoke_by_hash(db: &DatabaseConnection, token_hash: &str) -> AppResult<()> {
    RefreshToken::update_many()
        .col_expr(
            refresh_token::Column::RevokedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(refresh_token::Column::TokenHash.eq(token_hash))
        .filter(refresh_token::Column::RevokedAt.is_null())
        .exec(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_hex_and_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_eq!(t1.len(), 64);
        assert!(t1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_hash_token_is_stable() {
        let token = "abc123";
        assert_eq!(hash_token(token), hash_token(token));
        assert_eq!(hash_token(token).len(), 64);
        assert_ne!(hash_token(token), hash_token("abc124"));
    }
}
