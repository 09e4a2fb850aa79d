use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

// Database repository for identity records. Deliberately separate from the
// ledger store: authentication is a collaborator of the ledger, not part of it.
pub struct AuthRepository {
    pool: PgPool,
}

impl AuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<(Uuid, String), sqlx::Error> {
        sqlx::query_as::<_, (Uuid, String)>(
            "INSERT INTO users (email, password_hash, full_name) \
             VALUES ($1, $2, $3) RETURNING id, email",
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Uuid, String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Role of an active user, used to gate the platform-wide admin views.
    pub async fn find_user_role(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT role FROM users WHERE id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn verify_refresh_token(&self, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT u.id FROM users u \
             INNER JOIN refresh_tokens rt ON rt.user_id = u.id \
             WHERE rt.token = $1 AND rt.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }
}
