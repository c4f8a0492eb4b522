//! Service-account OAuth for Google APIs (JWT bearer grant).

use std::path::Path;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{EtlError, Result};

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields we need from a downloaded service-account JSON key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            EtlError::Config(msg) => {
                EtlError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(content)
            .map_err(|e| EtlError::Config(format!("Invalid service account key: {}", e)))?;

        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(EtlError::Config(format!(
                    "Credentials are of type '{}', expected 'service_account'",
                    kind
                )));
            }
        }
        Ok(key)
    }

    /// Signed RS256 assertion for the token endpoint, valid for one hour.
    pub fn assertion(&self, scope: &str, issued_at: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| EtlError::Config(format!("Invalid service account private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| EtlError::Config(format!("Failed to sign token assertion: {}", e)))
    }

    pub async fn access_token(&self, client: &reqwest::Client, scope: &str) -> Result<String> {
        let assertion = self.assertion(scope, chrono::Utc::now().timestamp())?;

        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| EtlError::Fetch(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EtlError::Fetch(format!(
                "Token endpoint error ({}): {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| EtlError::Fetch(format!("Failed to parse token response: {}", e)))?;

        debug!(
            client_email = %self.client_email,
            expires_in = ?token.expires_in,
            "Obtained Google access token"
        );
        Ok(token.access_token)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::api_clients::stub_server::{StubRoute, StubServer};
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::json;

    pub(crate) const TEST_PRIVATE_KEY: &str =
        include_str!("../../../tests/fixtures/test_service_account_key.pem");

    pub(crate) fn test_key(token_uri: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            key_type: Some("service_account".to_string()),
            client_email: "etl@project.iam.gserviceaccount.com".to_string(),
            private_key: TEST_PRIVATE_KEY.to_string(),
            token_uri: token_uri.to_string(),
        }
    }

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        scope: String,
        aud: String,
        iat: i64,
        exp: i64,
    }

    #[test]
    fn test_from_json_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            &json!({
                "type": "service_account",
                "client_email": "a@b.iam.gserviceaccount.com",
                "private_key": "pem"
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_from_json_rejects_user_credentials() {
        let err = ServiceAccountKey::from_json(
            &json!({
                "type": "authorized_user",
                "client_email": "a@b",
                "private_key": "pem"
            })
            .to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_from_missing_file_is_config_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/sa.json")).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/sa.json"));
    }

    #[test]
    fn test_assertion_claims() {
        let key = test_key("https://oauth2.googleapis.com/token");
        let jwt = key.assertion(ANALYTICS_READONLY_SCOPE, 1_700_000_000).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        let decoded =
            decode::<DecodedClaims>(&jwt, &DecodingKey::from_secret(&[]), &validation).unwrap();

        assert_eq!(decoded.claims.iss, "etl@project.iam.gserviceaccount.com");
        assert_eq!(decoded.claims.scope, ANALYTICS_READONLY_SCOPE);
        assert_eq!(decoded.claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }

    #[test]
    fn test_bad_private_key_is_config_error() {
        let mut key = test_key("https://oauth2.googleapis.com/token");
        key.private_key = "not a pem".to_string();
        let err = key.assertion(ANALYTICS_READONLY_SCOPE, 0).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[actix_web::test]
    async fn test_access_token_exchange() {
        let server = StubServer::start(vec![StubRoute::new(
            "POST",
            "/token",
            200,
            json!({"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}),
        )]);
        let key = test_key(&format!("{}/token", server.base_url));

        let token = key
            .access_token(&reqwest::Client::new(), ANALYTICS_READONLY_SCOPE)
            .await
            .unwrap();

        assert_eq!(token, "ya29.test");
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
        assert!(requests[0].body.contains("assertion="));
        server.stop().await;
    }

    #[actix_web::test]
    async fn test_access_token_rejected() {
        let server = StubServer::start(vec![StubRoute::new(
            "POST",
            "/token",
            400,
            json!({"error": "invalid_grant"}),
        )]);
        let key = test_key(&format!("{}/token", server.base_url));

        let err = key
            .access_token(&reqwest::Client::new(), ANALYTICS_READONLY_SCOPE)
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::Fetch(_)));
        assert!(err.to_string().contains("400"));
        server.stop().await;
    }
}
