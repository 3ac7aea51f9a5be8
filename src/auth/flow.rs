//! OAuth 2.0 installed-app flow: consent URL, code exchange and refresh.

use chrono::{Duration, Utc};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::secrets::ClientSecrets;
use super::token::StoredToken;
use crate::error::AuthError;

/// Token endpoint response (both grant types).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Manages the authorization-code flow for a desktop client.
pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    redirect_uri: String,
    client: reqwest::Client,
}

impl InstalledAppFlow {
    pub fn new(secrets: ClientSecrets, scopes: &[&str], port: u16) -> Self {
        Self {
            secrets,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            redirect_uri: format!("http://localhost:{port}/"),
            client: reqwest::Client::new(),
        }
    }

    /// Consent URL requesting offline access, always prompting.
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scopes.join(" ").as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::TokenEndpoint(format!("invalid auth_uri: {e}")))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange(&self, code: &str) -> Result<StoredToken, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.expose_secret()),
        ];
        let resp = self.post_token(&self.secrets.token_uri, &form).await?;

        Ok(StoredToken {
            token: SecretString::from(resp.access_token),
            refresh_token: resp.refresh_token.map(SecretString::from),
            token_uri: self.secrets.token_uri.clone(),
            client_id: self.secrets.client_id.clone(),
            client_secret: self.secrets.client_secret.clone(),
            scopes: self.scopes.clone(),
            expiry: expiry_from(resp.expires_in),
        })
    }

    async fn post_token(&self, url: &str, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        post_token(&self.client, url, form).await
    }
}

/// Refresh a stored token at its own `token_uri`.
///
/// Google omits `refresh_token` on refresh; the old one is kept.
pub async fn refresh(client: &reqwest::Client, token: &StoredToken) -> Result<StoredToken, AuthError> {
    let refresh_token = token
        .refresh_token
        .as_ref()
        .ok_or_else(|| AuthError::TokenEndpoint("no refresh token stored".into()))?;

    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.expose_secret()),
        ("client_id", token.client_id.as_str()),
        ("client_secret", token.client_secret.expose_secret()),
    ];
    let resp = post_token(client, &token.token_uri, &form).await?;

    Ok(StoredToken {
        token: SecretString::from(resp.access_token),
        refresh_token: resp
            .refresh_token
            .map(SecretString::from)
            .or_else(|| token.refresh_token.clone()),
        expiry: expiry_from(resp.expires_in),
        ..token.clone()
    })
}

async fn post_token(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let resp = client.post(url).form(form).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint(format!("{status}: {body}")));
    }
    Ok(resp.json::<TokenResponse>().await?)
}

fn expiry_from(expires_in: Option<i64>) -> Option<chrono::DateTime<Utc>> {
    expires_in.map(|secs| Utc::now() + Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockito::Matcher;

    use super::*;
    use crate::auth::token::tests::sample_token;

    fn secrets(token_uri: &str) -> ClientSecrets {
        ClientSecrets {
            client_id: "client-id".into(),
            client_secret: SecretString::from("client-secret"),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: token_uri.into(),
        }
    }

    #[test]
    fn authorization_url_requests_offline_consent() {
        let flow = InstalledAppFlow::new(
            secrets("https://oauth2.googleapis.com/token"),
            &["https://www.googleapis.com/auth/gmail.readonly"],
            8081,
        );
        let url = Url::parse(&flow.authorization_url("state-1").unwrap()).unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["redirect_uri"], "http://localhost:8081/");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "state-1");
        assert!(params["scope"].contains("gmail.readonly"));
    }

    #[tokio::test]
    async fn exchange_posts_code_and_builds_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "new-access", "refresh_token": "new-refresh", "expires_in": 3599}"#)
            .create_async()
            .await;

        let flow = InstalledAppFlow::new(
            secrets(&format!("{}/token", server.url())),
            &["scope-a"],
            8081,
        );
        let token = flow.exchange("auth-code").await.unwrap();

        assert_eq!(token.access_token(), "new-access");
        assert!(token.refresh_token.is_some());
        assert!(!token.is_expired());
        assert_eq!(token.scopes, vec!["scope-a"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_keeps_old_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "access-2", "expires_in": 3599}"#)
            .create_async()
            .await;

        let mut token = sample_token(Some(Utc::now() - Duration::seconds(10)));
        token.token_uri = format!("{}/token", server.url());

        let refreshed = refresh(&reqwest::Client::new(), &token).await.unwrap();

        assert_eq!(refreshed.access_token(), "access-2");
        assert_eq!(
            refreshed.refresh_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("refresh-1".to_string())
        );
        assert!(!refreshed.is_expired());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let mut token = sample_token(None);
        token.refresh_token = None;
        let err = refresh(&reqwest::Client::new(), &token).await.unwrap_err();
        assert!(err.to_string().contains("no refresh token"));
    }

    #[tokio::test]
    async fn token_endpoint_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let mut token = sample_token(None);
        token.token_uri = format!("{}/token", server.url());
        let err = refresh(&reqwest::Client::new(), &token).await.unwrap_err();

        assert!(err.to_string().contains("invalid_grant"));
    }
}
