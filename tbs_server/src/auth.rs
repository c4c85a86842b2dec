//! Bearer-token validation for the booking routes.
//!
//! Token issuance lives in the auth service; this module only checks that the `Authorization`
//! header carries a JWT signed with the shared `JWT_SECRET` and lifts the user id out of it.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use tbs_common::Secret;

use crate::errors::ServerError;

#[derive(Clone)]
pub struct AuthConfig {
    secret: Secret<String>,
}

impl AuthConfig {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    pub fn decode_claims(&self, token: &str) -> Result<JwtClaims, ServerError> {
        let key = DecodingKey::from_secret(self.secret.reveal().as_bytes());
        let data = decode::<JwtClaims>(token, &key, &Validation::new(Algorithm::HS256)).map_err(|e| {
            debug!("🔐️ Token validation failed: {e}");
            ServerError::AuthenticationError("invalid token".to_string())
        })?;
        Ok(data.claims)
    }
}

/// Claims carried by the auth service's access tokens. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> i64 {
        self.sub
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| ServerError::ConfigurationError("AuthConfig is not registered".to_string()))?;
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::AuthenticationError("missing authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServerError::AuthenticationError("invalid authorization header".to_string()))?;
    config.decode_claims(token)
}
