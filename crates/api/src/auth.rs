//! Token authentication and per-operation role checks.
//!
//! Every inbound call is checked once by [`authorize`]. Operations are keyed
//! `"<METHOD> <route template>"`, for example `"DELETE /transactions/{id}"`.
//! Operations missing from the [`AccessPolicy`] are public.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

/// Role of an administrator.
pub const ROLE_ADMIN: u32 = 1;

/// Role of a regular consumer-facing client.
pub const ROLE_USER: u32 = 2;

/// Errors raised while authenticating a call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingToken,

    #[error("authorization token is invalid")]
    MalformedHeader,

    #[error("access token has expired")]
    Expired,

    #[error("access token is invalid: {0}")]
    InvalidToken(String),

    #[error("no permission to access this operation")]
    Forbidden,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Credential (user name or client id) the token was issued to.
    pub cred: String,
    pub role: u32,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, token_duration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_duration,
        }
    }

    /// Issues a token for `cred` with `role`, valid for the configured duration.
    pub fn generate_token(&self, cred: &str, role: u32) -> Result<String, AuthError> {
        let exp = Utc::now().timestamp().max(0) as u64 + self.token_duration.as_secs();
        self.sign(&Claims {
            cred: cred.to_string(),
            role,
            exp,
        })
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

/// Immutable map from operation to the roles allowed to call it.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    roles: HashMap<String, HashSet<u32>>,
}

impl AccessPolicy {
    /// A policy under which every operation is public.
    pub fn public() -> Self {
        Self::default()
    }

    /// Administrative rollback is restricted to admins; everything else is public.
    pub fn default_policy() -> Self {
        Self::public().restrict("DELETE", "/transactions/{id}", [ROLE_ADMIN])
    }

    /// Restricts an operation to the given roles.
    pub fn restrict(
        mut self,
        method: &str,
        route: &str,
        roles: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.roles
            .insert(operation(method, route), roles.into_iter().collect());
        self
    }

    /// Returns the roles allowed for an operation, or `None` if it is public.
    pub fn allowed_roles(&self, method: &str, route: &str) -> Option<&HashSet<u32>> {
        self.roles.get(&operation(method, route))
    }
}

fn operation(method: &str, route: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), route)
}

/// State for the [`authorize`] middleware.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtManager>,
    pub policy: Arc<AccessPolicy>,
}

impl AuthState {
    pub fn new(jwt: JwtManager, policy: AccessPolicy) -> Self {
        Self {
            jwt: Arc::new(jwt),
            policy: Arc::new(policy),
        }
    }

    /// Checks a call against the policy, returning the caller's claims if a
    /// token was required.
    pub fn check(
        &self,
        method: &str,
        route: &str,
        authorization: Option<&str>,
    ) -> Result<Option<Claims>, AuthError> {
        let Some(allowed) = self.policy.allowed_roles(method, route) else {
            return Ok(None);
        };

        let header = authorization.ok_or(AuthError::MissingToken)?;
        let mut parts = header.split_whitespace();
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) => token,
            _ => return Err(AuthError::MalformedHeader),
        };

        let claims = self.jwt.verify(token)?;
        if !allowed.contains(&claims.role) {
            return Err(AuthError::Forbidden);
        }

        Ok(Some(claims))
    }
}

/// Middleware performing the authorization check once per inbound call.
///
/// Must be installed with `route_layer` so the matched route is known.
pub async fn authorize(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().as_str().to_string();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth.check(&method, &route, header) {
        Ok(claims) => {
            if let Some(claims) = claims {
                tracing::debug!(cred = %claims.cred, role = claims.role, %route, "caller authorized");
                request.extensions_mut().insert(claims);
            }
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::warn!(error = %e, %method, %route, "authorization failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthState {
        AuthState::new(
            JwtManager::new("test-secret", Duration::from_secs(60)),
            AccessPolicy::default_policy(),
        )
    }

    #[test]
    fn generated_token_verifies() {
        let jwt = JwtManager::new("test-secret", Duration::from_secs(60));
        let token = jwt.generate_token("alice", ROLE_ADMIN).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.cred, "alice");
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issuer = JwtManager::new("other-secret", Duration::from_secs(60));
        let token = issuer.generate_token("alice", ROLE_ADMIN).unwrap();

        let result = JwtManager::new("test-secret", Duration::from_secs(60)).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtManager::new("test-secret", Duration::from_secs(60));
        let token = jwt
            .sign(&Claims {
                cred: "alice".into(),
                role: ROLE_ADMIN,
                exp: (Utc::now().timestamp() - 10) as u64,
            })
            .unwrap();

        assert_eq!(jwt.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn unlisted_operations_are_public() {
        let result = auth().check("POST", "/transactions", None);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn restricted_operation_requires_bearer_token() {
        let auth = auth();
        assert_eq!(
            auth.check("DELETE", "/transactions/{id}", None),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            auth.check("DELETE", "/transactions/{id}", Some("Token abc")),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            auth.check("DELETE", "/transactions/{id}", Some("Bearer")),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn role_must_be_allowed() {
        let auth = auth();
        let user = auth.jwt.generate_token("bob", ROLE_USER).unwrap();
        let admin = auth.jwt.generate_token("root", ROLE_ADMIN).unwrap();

        assert_eq!(
            auth.check("DELETE", "/transactions/{id}", Some(&format!("Bearer {user}"))),
            Err(AuthError::Forbidden)
        );
        let claims = auth
            .check("delete", "/transactions/{id}", Some(&format!("Bearer {admin}")))
            .unwrap()
            .unwrap();
        assert_eq!(claims.cred, "root");
    }
}
