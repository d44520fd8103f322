use crate::auth::auth::AuthUser;
use crate::auth::identity_cache::{IdentityCache, MokaIdentityCache, cache_key};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::{TokenType, UserSql};
use derive_more::Display;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Display, PartialEq)]
pub enum AuthError {
    #[display(fmt = "Invalid or expired token")]
    InvalidToken(String),
    #[display(fmt = "Access token required")]
    WrongTokenType,
    #[display(fmt = "Invalid role")]
    UnknownRole,
    #[display(fmt = "Account is inactive")]
    InactiveUser,
    #[display(fmt = "Identity provider unavailable")]
    Unavailable(String),
}

/// Source of truth for "who is behind this token".
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Verifies the JWT signature, then re-reads the user row so role and
/// school changes (or deactivation) apply at the next cache miss.
pub struct JwtIdentityProvider {
    pool: MySqlPool,
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(pool: MySqlPool, secret: impl Into<String>) -> Self {
        Self {
            pool,
            secret: secret.into(),
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = verify_token(token, &self.secret).map_err(AuthError::InvalidToken)?;

        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }

        let row = sqlx::query_as::<_, UserSql>(
            r#"
            SELECT id, username, password, role_id, school_id, teacher_id, student_id, is_active
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(claims.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = claims.user_id, "User lookup failed");
            AuthError::Unavailable(e.to_string())
        })?;

        let row = row.filter(|u| u.is_active).ok_or(AuthError::InactiveUser)?;
        let role = Role::from_id(row.role_id).ok_or(AuthError::UnknownRole)?;

        Ok(AuthUser {
            user_id: row.id,
            username: row.username,
            role,
            school_id: row.school_id,
            teacher_id: row.teacher_id,
            student_id: row.student_id,
        })
    }
}

pub async fn resolve_identity<P: IdentityProvider>(
    cache: &dyn IdentityCache,
    provider: &P,
    token: &str,
) -> Result<AuthUser, AuthError> {
    let key = cache_key(token);

    if let Some(user) = cache.get(key) {
        debug!(user_id = user.user_id, "Identity cache hit");
        return Ok(user);
    }

    let user = provider.verify(token).await?;
    debug!(user_id = user.user_id, ttl = ?cache.ttl(), "Identity cached");
    cache.set(key, user.clone());
    Ok(user)
}

/// Shared per-process authorization state handed to the middleware.
pub struct AuthService {
    cache: Arc<dyn IdentityCache>,
    provider: JwtIdentityProvider,
}

impl AuthService {
    pub fn new(config: &Config, pool: MySqlPool) -> Self {
        let cache = MokaIdentityCache::new(
            Duration::from_secs(config.identity_cache_ttl_secs),
            config.identity_cache_capacity,
        );
        Self::with_cache(Arc::new(cache), JwtIdentityProvider::new(pool, &config.jwt_secret))
    }

    pub fn with_cache(cache: Arc<dyn IdentityCache>, provider: JwtIdentityProvider) -> Self {
        Self { cache, provider }
    }

    pub async fn resolve(&self, token: &str) -> Result<AuthUser, AuthError> {
        resolve_identity(self.cache.as_ref(), &self.provider, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth::tests::user;
    use crate::auth::identity_cache::testing::ManualClockCache;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
        result: Result<AuthUser, AuthError>,
    }

    impl CountingProvider {
        fn ok(user: AuthUser) -> Self {
            Self {
                calls: Cell::new(0),
                result: Ok(user),
            }
        }
    }

    impl IdentityProvider for CountingProvider {
        async fn verify(&self, _token: &str) -> Result<AuthUser, AuthError> {
            self.calls.set(self.calls.get() + 1);
            match &self.result {
                Ok(u) => Ok(u.clone()),
                Err(_) => Err(AuthError::InactiveUser),
            }
        }
    }

    const TOKEN: &str = "header.payload.0123456789abcdefghijklmnopqrstuvwxyz";

    #[actix_web::test]
    async fn second_lookup_within_ttl_hits_cache() {
        let cache = ManualClockCache::new(Duration::from_secs(30));
        let provider = CountingProvider::ok(user(Role::Teacher, Some(1)));

        resolve_identity(&cache, &provider, TOKEN).await.unwrap();
        cache.advance(Duration::from_secs(10));
        let again = resolve_identity(&cache, &provider, TOKEN).await.unwrap();

        assert_eq!(again.teacher_id, Some(7));
        assert_eq!(provider.calls.get(), 1);
    }

    #[actix_web::test]
    async fn expired_entry_reverifies() {
        let cache = ManualClockCache::new(Duration::from_secs(30));
        let provider = CountingProvider::ok(user(Role::Teacher, Some(1)));

        resolve_identity(&cache, &provider, TOKEN).await.unwrap();
        cache.advance(Duration::from_secs(31));
        resolve_identity(&cache, &provider, TOKEN).await.unwrap();

        assert_eq!(provider.calls.get(), 2);
    }

    #[actix_web::test]
    async fn failures_are_not_cached() {
        let cache = ManualClockCache::new(Duration::from_secs(30));
        let provider = CountingProvider {
            calls: Cell::new(0),
            result: Err(AuthError::InactiveUser),
        };

        assert!(resolve_identity(&cache, &provider, TOKEN).await.is_err());
        assert!(resolve_identity(&cache, &provider, TOKEN).await.is_err());
        assert_eq!(provider.calls.get(), 2);
        assert!(cache.get(cache_key(TOKEN)).is_none());
    }
}
