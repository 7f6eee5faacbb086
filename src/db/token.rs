//! Token record storage.
//!
//! Records are looked up by the exact token string. Validity is never stored
//! here beyond the `is_active` flag; the authority recomputes it on every check.

use base64::Engine;
use sqlx::sqlite::SqlitePool;

/// A persisted session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: i64,
    pub token: String,
    pub subject_id: String,
    /// Unix seconds after which the token is invalid regardless of `is_active`.
    pub expires_at: i64,
    /// Once false the token is permanently invalid.
    pub is_active: bool,
    pub last_used_at: Option<i64>,
    pub created_at: i64,
    /// Token that replaced this one when it was rotated out by a refresh.
    pub replaced_by: Option<String>,
}

type TokenRow = (
    i64,
    String,
    String,
    i64,
    bool,
    Option<i64>,
    i64,
    Option<String>,
);

fn from_row(
    (id, token, subject_id, expires_at, is_active, last_used_at, created_at, replaced_by): TokenRow,
) -> TokenRecord {
    TokenRecord {
        id,
        token,
        subject_id,
        expires_at,
        is_active,
        last_used_at,
        created_at,
        replaced_by,
    }
}

/// Generate a fresh opaque token: 32 random bytes as unpadded base64url.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Store for managing token records.
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new active token record.
    pub async fn create(
        &self,
        token: &str,
        subject_id: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO tokens (token, subject_id, expires_at, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(token)
        .bind(subject_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a token record by exact token match.
    pub async fn get(&self, token: &str) -> Result<Option<TokenRecord>, sqlx::Error> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT id, token, subject_id, expires_at, is_active, last_used_at, created_at, replaced_by FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Mark a token inactive.
    ///
    /// Returns true only if this call flipped the flag. Concurrent callers
    /// racing on the same token converge on the same final state.
    pub async fn deactivate(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tokens SET is_active = 0 WHERE token = ? AND is_active = 1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful use of the token.
    pub async fn touch(&self, token: &str, now: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tokens SET last_used_at = ? WHERE token = ?")
            .bind(now)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace `old_token` with a new record in a single transaction.
    ///
    /// Returns false, without inserting anything, if `old_token` was no longer
    /// active when the transaction ran (another refresh already rotated it).
    pub async fn rotate(
        &self,
        old_token: &str,
        new_token: &str,
        subject_id: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let retired = sqlx::query(
            "UPDATE tokens SET is_active = 0, replaced_by = ? WHERE token = ? AND is_active = 1",
        )
        .bind(new_token)
        .bind(old_token)
        .execute(&mut *tx)
        .await?;

        if retired.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO tokens (token, subject_id, expires_at, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(new_token)
        .bind(subject_id)
        .bind(expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Delete records that expired before `cutoff`.
    pub async fn purge_expired_before(&self, cutoff: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
