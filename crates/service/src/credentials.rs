//! Access tokens for the data service.

use crate::config::Credentials;
use crate::error::{JobError, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

const AUTHORITY: &str = "https://login.microsoftonline.com";

/// Supplies bearer tokens for remote calls.
pub trait CredentialProvider: Send + Sync {
    /// A token valid for the next request.
    fn access_token(&self) -> Result<String>;
}

/// OAuth2 client-credentials grant against Microsoft Entra ID. Every call
/// requests a new token.
pub struct ClientCredentials {
    http: Client,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ClientCredentials {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", AUTHORITY, self.credentials.tenant_id)
    }

    /// The `.default` scope of the configured resource.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.credentials.resource.trim_end_matches('/'))
    }
}

impl CredentialProvider for ClientCredentials {
    fn access_token(&self) -> Result<String> {
        let scope = self.scope();
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .map_err(|e| JobError::remote("Token acquisition", e.to_string()))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .map_err(|e| JobError::remote("Token acquisition", format!("HTTP {}: {}", status, e)))?;

        match body.access_token {
            Some(token) if status.is_success() => Ok(token),
            _ => Err(JobError::remote(
                "Token acquisition",
                body.error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            )),
        }
    }
}
