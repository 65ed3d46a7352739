// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// OAuth2 with a Google service account: sign a short-lived JWT with the
// account's RSA key, exchange it for a bearer token at the token endpoint,
// and cache the token until shortly before it expires.
//
// **Environment Variables:**
// - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to service account JSON file
// - `GOOGLE_SERVICE_ACCOUNT_JSON` - Service account JSON content (alternative)
//
// The service account needs access to the documents it updates (share them
// with the account's email, or install it with domain-wide access) and, for
// follow-up run scheduling, the Cloud Tasks enqueuer role on the queue.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;

/// Everything the updater touches: Drive listing and checkpoint storage,
/// slide and spreadsheet edits, and the Cloud Tasks queue.
pub const WORKSPACE_SCOPES: &str = "https://www.googleapis.com/auth/drive \
     https://www.googleapis.com/auth/presentations \
     https://www.googleapis.com/auth/spreadsheets \
     https://www.googleapis.com/auth/cloud-tasks";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid service account credentials: {0}")]
    Credentials(String),
    #[error("Token exchange failed: {0}")]
    Token(String),
}

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// The token URI (where to exchange JWT for an access token).
    token_uri: String,
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    /// Issuer (service account email).
    iss: String,

    /// Scope (what APIs we want access to).
    scope: String,

    /// Audience (token endpoint).
    aud: String,

    /// Issued at (Unix timestamp).
    iat: u64,

    /// Expiration (Unix timestamp, max 1 hour from iat).
    exp: u64,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: u64,
    #[allow(dead_code)]
    token_type: String,
}

/// Cached access token with expiration.
#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Authenticator that handles OAuth2 with service account credentials.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    scope: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(path: &str, scope: impl Into<String>) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::Credentials(format!("failed to read {}: {}", path, e)))?;
        Self::from_json(&content, scope)
    }

    /// Creates a new authenticator from JSON content.
    pub fn from_json(json: &str, scope: impl Into<String>) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials =
            serde_json::from_str(json).map_err(|e| AuthError::Credentials(e.to_string()))?;
        Ok(Self {
            credentials,
            client: Client::new(),
            scope: scope.into(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Creates from environment variables.
    pub async fn from_env(scope: impl Into<String>) -> Result<Self, AuthError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path, scope).await;
        }

        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json, scope);
        }

        Err(AuthError::Credentials(
            "Neither GOOGLE_SERVICE_ACCOUNT_KEY nor GOOGLE_SERVICE_ACCOUNT_JSON is set".to_string(),
        ))
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        // Check if we have a valid cached token
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + Duration::from_secs(60) {
                    return Ok(token.token.clone());
                }
            }
        }

        // Need to refresh the token
        let new_token = self.fetch_new_token().await?;

        // Cache it
        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: new_token.clone(),
                expires_at: SystemTime::now() + Duration::from_secs(55 * 60),
            });
        }

        Ok(new_token)
    }

    /// Fetches a new access token from Google.
    async fn fetch_new_token(&self) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Token(e.to_string()))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::Credentials(e.to_string()))?;
        let jwt = encode(&header, &claims, &key).map_err(|e| AuthError::Token(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| AuthError::Token(e.to_string()))?;
            return Err(AuthError::Token(format!("({}): {}", status, text)));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Token(e.to_string()))?;
        Ok(token_response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_credentials() {
        let err = ServiceAccountAuth::from_json("{not json", WORKSPACE_SCOPES).unwrap_err();
        assert!(matches!(err, AuthError::Credentials(_)));
    }

    #[test]
    fn workspace_scopes_cover_all_touched_apis() {
        for api in ["drive", "presentations", "spreadsheets", "cloud-tasks"] {
            assert!(
                WORKSPACE_SCOPES.contains(&format!("auth/{}", api)),
                "missing scope for {}",
                api
            );
        }
    }
}
