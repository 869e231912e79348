use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Bearer-token claims: the verified identity behind a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(uid: String, email: String, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: uid,
            email,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Identity extracted from a verified bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Verifies a bearer credential into an identity, or fails with a message
/// suitable for an unauthenticated response.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthUser, String>;
}

/// HMAC JWT verifier, the production implementation.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthUser, String> {
        if self.secret.is_empty() {
            return Err("JWT secret not configured".to_string());
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| format!("Invalid bearer token: {}", e))?;

        Ok(AuthUser { uid: token_data.claims.sub, email: token_data.claims.email })
    }
}

/// Mint a token for the given identity. Used by operator tooling and tests.
pub fn generate_token(secret: &str, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Administrative access to the identity provider, used for best-effort
/// account removal when a user is deleted.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn delete_account(&self, uid: &str) -> anyhow::Result<()>;
}

/// REST client for the identity provider's admin endpoint.
pub struct HttpAccountDirectory {
    http: reqwest::Client,
    admin_url: String,
    admin_key: String,
}

impl HttpAccountDirectory {
    pub fn new(http: reqwest::Client, admin_url: String, admin_key: String) -> Self {
        Self { http, admin_url, admin_key }
    }
}

#[async_trait]
impl AccountDirectory for HttpAccountDirectory {
    async fn delete_account(&self, uid: &str) -> anyhow::Result<()> {
        if self.admin_url.is_empty() {
            anyhow::bail!("identity admin endpoint not configured");
        }

        let url = format!("{}/v1/accounts/{}", self.admin_url.trim_end_matches('/'), uid);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.admin_key)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("identity provider returned {}", response.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_round_trips_through_verifier() {
        let secret = "test-secret";
        let claims = Claims::new("u1".into(), "u1@example.com".into(), 1);
        let token = generate_token(secret, &claims).unwrap();

        let user = JwtVerifier::new(secret).verify(&token).unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.email, "u1@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new("u1".into(), "u1@example.com".into(), 1);
        let token = generate_token("secret-a", &claims).unwrap();
        assert!(JwtVerifier::new("secret-b").verify(&token).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(JwtVerifier::new("").verify("whatever").is_err());
    }
}
