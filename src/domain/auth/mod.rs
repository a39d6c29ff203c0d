//! Authentication: credential lookup, password verification, and bearer tokens.

pub mod credentials;
pub mod tokens;

pub use credentials::{Credential, CredentialStore, InMemoryCredentialStore, UserProfile};
pub use tokens::{AuthService, Claims, TokenGrant};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Capability tags carried in a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Admin,
    Ml,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
            Permission::Ml => "ml",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token required (send `Authorization: Bearer <token>`)")]
    MissingToken,

    #[error("malformed authorization header (expected `Bearer <token>`)")]
    MalformedHeader,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("missing required permission: {required}")]
    Forbidden {
        required: Permission,
        granted: Vec<Permission>,
    },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable, machine-readable reason for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::Hashing(_) | AuthError::Signing(_) => "auth_internal",
        }
    }
}
