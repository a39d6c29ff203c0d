//! HS256 bearer tokens issued against a [`CredentialStore`].

use super::credentials::{verify_password, CredentialStore, UserProfile};
use super::{AuthError, Permission};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub username: String,
    pub role: String,
    pub permissions: Vec<Permission>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
}

impl Claims {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                required: permission,
                granted: self.permissions.clone(),
            })
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

/// A freshly issued token and who it belongs to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenGrant {
    pub token: String,
    pub user: UserProfile,
    pub expires_in: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, secret: &str, ttl_hours: i64) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies a username/password pair and issues a token carrying the user's permissions.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let credential = self
            .store
            .lookup(username)
            .await
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &credential.password_hash) {
            debug!("Rejected password for user {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Issued token for user {}", username);
        self.issue(UserProfile {
            username: username.to_string(),
            role: credential.role,
            permissions: credential.permissions,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Re-issues a still-valid token with a fresh expiry.
    pub fn refresh(&self, token: &str) -> Result<TokenGrant, AuthError> {
        let claims = self.verify(token)?;
        self.issue(claims.profile())
    }

    pub async fn list_users(&self) -> Vec<UserProfile> {
        self.store.list().await
    }

    fn issue(&self, user: UserProfile) -> Result<TokenGrant, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            username: user.username.clone(),
            role: user.role.clone(),
            permissions: user.permissions.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = self.sign(&claims)?;
        Ok(TokenGrant {
            token,
            user,
            expires_in: format!("{} hours", self.ttl.num_hours()),
            expires_at,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}
