use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hyper::Body;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No bearer token present on request")]
    NoTokenGiven,
    #[error("Invalid bearer token provided")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Auth verification key could not be read - {0}")]
    KeyUnavailable(#[from] std::io::Error),
    #[error("Auth verification key is invalid - {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::KeyUnavailable(_) | Self::InvalidKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// Claims attached to authenticated requests. Absent claims deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserClaims {
    pub id: String,
    pub email: String,
    pub role: String,
    pub scope: String,
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// A PEM encoded RSA public key verifies RS256 tokens; anything else is used as an
    /// HS256 shared secret.
    pub fn from_key_material(material: &[u8]) -> Result<Self, AuthError> {
        let (key, algorithm) = if material.starts_with(b"-----BEGIN") {
            (
                DecodingKey::from_rsa_pem(material).map_err(AuthError::InvalidKey)?,
                Algorithm::RS256,
            )
        } else {
            let secret = std::str::from_utf8(material)
                .map(|text| text.trim().as_bytes())
                .unwrap_or(material);
            (DecodingKey::from_secret(secret), Algorithm::HS256)
        };

        let mut validation = Validation::new(algorithm);
        // `exp` is still checked when a token carries it.
        validation.required_spec_claims.clear();

        Ok(Self { key, validation })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let material = std::fs::read(path)?;
        Self::from_key_material(&material)
    }

    pub fn verify(&self, token: &str) -> Result<UserClaims, AuthError> {
        let data = decode::<UserClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

pub async fn require_bearer(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::NoTokenGiven)?;

    let claims = verifier.verify(token.trim()).map_err(|err| {
        log::debug!("Rejected bearer token: {err:?}");
        err
    })?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
