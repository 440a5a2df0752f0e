//! Bearer-token authentication
//!
//! The API authenticates with an opaque bearer token resolved through the
//! `TokenVerifier` seam. The bundled dev verifier accepts a base64 payload
//! of `user_id:role[:email[:name]]`, which is enough for local runs and the
//! integration tests; a production deployment swaps in a real verifier
//! behind the same trait.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

use crate::error::AppError;

/// Caller role, in increasing order of privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Victim,
    Officer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Victim => "victim",
            Role::Officer => "officer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "victim" => Ok(Role::Victim),
            "officer" => Ok(Role::Officer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Authenticated caller attached to each request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    /// Officers and admins review cases; victims only see their own
    pub fn is_reviewer(&self) -> bool {
        matches!(self.role, Role::Officer | Role::Admin)
    }
}

/// Seam between the HTTP layer and whatever issues tokens
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthUser, AppError>;
}

/// Development verifier: base64 of `user_id:role[:email[:name]]`
#[derive(Debug, Default, Clone)]
pub struct DevTokenVerifier;

impl TokenVerifier for DevTokenVerifier {
    fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let decoded = BASE64
            .decode(token)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

        let mut parts = decoded.splitn(4, ':');
        let id = parts
            .next()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;
        let role = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;
        let email = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let name = parts.next().filter(|s| !s.is_empty()).map(str::to_string);

        Ok(AuthUser {
            id,
            role,
            email,
            name,
        })
    }
}

/// Encode a dev token; used by tests and local tooling
pub fn encode_dev_token(id: Uuid, role: Role, email: Option<&str>) -> String {
    let payload = match email {
        Some(e) => format!("{}:{}:{}", id, role.as_str(), e),
        None => format!("{}:{}", id, role.as_str()),
    };
    BASE64.encode(payload)
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn TokenVerifier>: axum::extract::FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier: Arc<dyn TokenVerifier> = axum::extract::FromRef::from_ref(state);
        let token = bearer_token(parts)?;
        verifier.verify(token)
    }
}
