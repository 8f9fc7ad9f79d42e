/// Token issuing and verification
///
/// Access and refresh tokens are HS256 JWTs signed with distinct secrets so
/// the two kinds are never interchangeable. Secrets and expiries come from
/// the injected `TokenConfig`, never from ambient process state.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::TokenConfig,
    db::models::Account,
    error::{AppError, AppResult},
};

/// Access token payload: account id plus profile claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token payload: account id only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly minted access/refresh pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies the service's JWTs
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Mint a short-lived access token carrying profile claims
    pub fn issue_access_token(&self, account: &Account) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.access_ttl_secs)).timestamp(),
        };

        Self::sign(&claims, &self.config.access_secret)
    }

    /// Mint a long-lived refresh token carrying only the account id
    pub fn issue_refresh_token(&self, account_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.refresh_ttl_secs)).timestamp(),
        };

        Self::sign(&claims, &self.config.refresh_secret)
    }

    /// Mint a paired access and refresh token for an account
    pub fn issue_pair(&self, account: &Account) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(&account.id)?,
        })
    }

    /// Verify an access token signature and expiry
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        Self::verify(token, &self.config.access_secret)
    }

    /// Verify a refresh token signature and expiry
    pub fn verify_refresh_token(&self, token: &str) -> AppResult<RefreshClaims> {
        Self::verify(token, &self.config.refresh_secret)
    }

    fn sign<T: Serialize>(claims: &T, secret: &str) -> AppResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> AppResult<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::Unauthorized("Invalid token signature".to_string())
                    }
                    _ => AppError::Unauthorized(format!("Invalid token: {}", e)),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenConfig {
            access_secret: "access-secret-a".to_string(),
            refresh_secret: "refresh-secret-b".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864000,
        })
    }

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: "acct-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Example".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            avatar_url: None,
            cover_url: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_round_trip_carries_profile_claims() {
        let issuer = issuer();
        let token = issuer.issue_access_token(&account()).unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.full_name, "Alice Example");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_carries_only_account_id() {
        let issuer = issuer();
        let token = issuer.issue_refresh_token("acct-1").unwrap();
        let claims = issuer.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, "acct-1");
    }

    #[test]
    fn test_secret_domains_are_disjoint() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&account()).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);

        // A refresh token never verifies as an access token, and vice versa
        assert!(issuer.verify_access_token(&pair.refresh_token).is_err());
        assert!(issuer.verify_refresh_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let issuer = TokenIssuer::new(TokenConfig {
            access_secret: "access-secret-a".to_string(),
            refresh_secret: "refresh-secret-b".to_string(),
            access_ttl_secs: -60,
            refresh_ttl_secs: -60,
        });

        let token = issuer.issue_access_token(&account()).unwrap();
        match issuer.verify_access_token(&token) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("expired")),
            other => panic!("expected unauthorized, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_tampered_token_is_unauthorized() {
        let issuer = issuer();
        let token = issuer.issue_access_token(&account()).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });

        assert!(issuer.verify_access_token(&tampered).is_err());
    }

    #[test]
    fn test_wrong_secret_never_verifies() {
        let issuer = issuer();
        let other = TokenIssuer::new(TokenConfig {
            access_secret: "different-a".to_string(),
            refresh_secret: "different-b".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864000,
        });

        let token = issuer.issue_access_token(&account()).unwrap();
        assert!(other.verify_access_token(&token).is_err());
    }
}
