//! Credential lookup behind a trait, with an in-memory implementation for demo users.

use super::{AuthError, Permission};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Stored credential for one user. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone)]
pub struct Credential {
    pub password_hash: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

/// Public view of a user, safe to return from the API.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserProfile {
    pub username: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

/// Where credentials come from. The service only ever reads through this trait.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn lookup(&self, username: &str) -> Option<Credential>;

    async fn list(&self) -> Vec<UserProfile>;
}

// Light cost parameters: these hashes only protect fixed demo accounts.
const DEMO_M_COST_KIB: u32 = 4096;
const DEMO_T_COST: u32 = 2;

fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(DEMO_M_COST_KIB, DEMO_T_COST, 1, None)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Checks `password` against a PHC string. Cost parameters are read from the hash itself.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: BTreeMap<String, Credential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three demo accounts: `admin`, `scientist`, and `user`.
    pub fn with_demo_users() -> Result<Self, AuthError> {
        let mut store = Self::new();
        store.insert(
            "admin",
            "admin123",
            "admin",
            vec![Permission::Read, Permission::Write, Permission::Admin],
        )?;
        store.insert(
            "scientist",
            "science123",
            "data_scientist",
            vec![Permission::Read, Permission::Ml],
        )?;
        store.insert("user", "user123", "user", vec![Permission::Read])?;
        Ok(store)
    }

    pub fn insert(
        &mut self,
        username: &str,
        password: &str,
        role: &str,
        permissions: Vec<Permission>,
    ) -> Result<(), AuthError> {
        let credential = Credential {
            password_hash: hash_password(password)?,
            role: role.to_string(),
            permissions,
        };
        self.users.insert(username.to_string(), credential);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Option<Credential> {
        self.users.get(username).cloned()
    }

    async fn list(&self) -> Vec<UserProfile> {
        self.users
            .iter()
            .map(|(username, c)| UserProfile {
                username: username.clone(),
                role: c.role.clone(),
                permissions: c.permissions.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_right_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("guess", &hash));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn demo_store_lists_users_without_hashes() {
        let store = InMemoryCredentialStore::with_demo_users().unwrap();
        let users = store.list().await;
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["admin", "scientist", "user"]);

        let scientist = store.lookup("scientist").await.unwrap();
        assert_eq!(scientist.permissions, vec![Permission::Read, Permission::Ml]);
        assert!(store.lookup("nobody").await.is_none());
    }
}
