/// Authentication extractors
use crate::{context::AppContext, error::AppError, token::AccessClaims};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use axum_extra::extract::cookie::CookieJar;

/// Authenticated context - verifies the access token on the request
///
/// The token may arrive as a bearer Authorization header or as the
/// `accessToken` cookie set at login.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub claims: AccessClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

        let claims = state.token_issuer.verify_access_token(&token)?;
        let account_id = claims.sub.clone();

        Ok(AuthContext { account_id, claims })
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = extract_access_token(&parts.headers).and_then(|token| {
            match state.token_issuer.verify_access_token(&token) {
                Ok(claims) => Some(AuthContext {
                    account_id: claims.sub.clone(),
                    claims,
                }),
                Err(_) => None,
            }
        });

        Ok(OptionalAuthContext { auth })
    }
}

/// Pull the access token from a bearer header or the accessToken cookie
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get("accessToken")
            .map(|c| c.value().to_string())
    })
}
