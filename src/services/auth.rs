use crate::error::ServiceError;
use crate::models::{Profile, Session};
use crate::services::cache::{CacheError, CacheKey, CacheManager};
use crate::services::store::{decode_first, DataStore, Filter, Table};
use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims carried by access tokens the account service issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves the caller's session from a bearer token.
///
/// Identity comes from the token; the role is a follow-up lookup in
/// `profiles`, cached once found (roles never change after registration).
pub struct SessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    store: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl SessionResolver {
    pub fn new(
        jwt_secret: &str,
        audience: Option<&str>,
        store: Arc<dyn DataStore>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            store,
            cache,
        }
    }

    /// Validate a raw token and return its subject
    pub fn identity(&self, token: &str) -> Result<String, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServiceError::Unauthenticated(format!("invalid token: {}", e)))?;

        if data.claims.sub.is_empty() {
            return Err(ServiceError::Unauthenticated("token has no subject".into()));
        }

        Ok(data.claims.sub)
    }

    /// Look up the caller's profile, `None` when not registered yet
    pub async fn profile(&self, user_id: &str) -> Result<Option<Profile>, ServiceError> {
        let key = CacheKey::profile(user_id);
        match self.cache.get::<Profile>(&key).await {
            Ok(profile) => return Ok(Some(profile)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Profile cache read failed for {}, using the store: {}", user_id, e),
        }

        let rows = self
            .store
            .query(Table::Profiles, &[Filter::eq("id", user_id)])
            .await?;
        let profile: Option<Profile> = decode_first(Table::Profiles, rows)?;

        if let Some(profile) = &profile {
            if let Err(e) = self.cache.set(&key, profile).await {
                tracing::warn!("Failed to cache profile {}: {}", user_id, e);
            }
        }

        Ok(profile)
    }

    /// Resolve the session for a raw bearer token
    pub async fn resolve(&self, token: &str) -> Result<Session, ServiceError> {
        let user_id = self.identity(token)?;
        let role = self.profile(&user_id).await?.map(|p| p.role);

        tracing::debug!("Resolved session for {} (role: {:?})", user_id, role);

        Ok(Session::new(user_id, role))
    }

    /// Resolve the session from the request's `Authorization` header
    pub async fn from_request(&self, req: &HttpRequest) -> Result<Session, ServiceError> {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthenticated("missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthenticated("expected a Bearer token".into()))?;

        self.resolve(token.trim()).await
    }

    /// Drop the cached profile, e.g. right after registration
    pub async fn forget(&self, user_id: &str) {
        if let Err(e) = self.cache.delete(&CacheKey::profile(user_id)).await {
            tracing::warn!("Failed to invalidate profile cache for {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::MemoryStore;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn token(sub: &str, aud: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            aud: Some(aud.to_string()),
            email: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn resolver(store: Arc<MemoryStore>) -> SessionResolver {
        SessionResolver::new(
            SECRET,
            Some("authenticated"),
            store,
            Arc::new(CacheManager::in_memory(100, 60)),
        )
    }

    #[tokio::test]
    async fn test_unregistered_user_has_no_role() {
        let resolver = resolver(Arc::new(MemoryStore::new()));
        let session = resolver.resolve(&token("u1", "authenticated", SECRET)).await.unwrap();
        assert_eq!(session, Session::new("u1", None));
    }

    #[tokio::test]
    async fn test_role_comes_from_profile() {
        let store = Arc::new(MemoryStore::new());
        store
            .create(
                Table::Profiles,
                json!({
                    "id": "u2", "role": "tutor",
                    "created_at": chrono::Utc::now(), "updated_at": chrono::Utc::now(),
                }),
            )
            .await
            .unwrap();

        let resolver = resolver(store);
        let session = resolver.resolve(&token("u2", "authenticated", SECRET)).await.unwrap();
        assert!(session.has_role(Role::Tutor));
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_falls_back_to_store() {
        let store = Arc::new(MemoryStore::new());
        store
            .create(
                Table::Profiles,
                json!({
                    "id": "u3", "role": "parent",
                    "created_at": chrono::Utc::now(), "updated_at": chrono::Utc::now(),
                }),
            )
            .await
            .unwrap();

        let cache = Arc::new(CacheManager::in_memory(100, 60));
        cache.set(&CacheKey::profile("u3"), &"not a profile").await.unwrap();

        let resolver = SessionResolver::new(SECRET, Some("authenticated"), store, cache.clone());
        let session = resolver.resolve(&token("u3", "authenticated", SECRET)).await.unwrap();
        assert!(session.has_role(Role::Parent));

        // The stored profile replaced the unreadable entry
        let cached: Profile = cache.get(&CacheKey::profile("u3")).await.unwrap();
        assert_eq!(cached.role, Role::Parent);
    }

    #[tokio::test]
    async fn test_bad_tokens_rejected() {
        let resolver = resolver(Arc::new(MemoryStore::new()));

        let wrong_secret = resolver.resolve(&token("u1", "authenticated", "other")).await;
        assert!(matches!(wrong_secret, Err(ServiceError::Unauthenticated(_))));

        let wrong_audience = resolver.resolve(&token("u1", "anon", SECRET)).await;
        assert!(matches!(wrong_audience, Err(ServiceError::Unauthenticated(_))));

        let garbage = resolver.resolve("not-a-jwt").await;
        assert!(matches!(garbage, Err(ServiceError::Unauthenticated(_))));
    }
}
