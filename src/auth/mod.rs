//! OAuth credentials for the mail adapter.
//!
//! One token file per process. It is loaded when present, refreshed when
//! expired, and otherwise obtained interactively through the installed-app
//! flow with a local callback server.

pub mod callback_server;
pub mod flow;
pub mod secrets;
pub mod token;

pub use callback_server::CallbackServer;
pub use flow::InstalledAppFlow;
pub use secrets::ClientSecrets;
pub use token::{StoredToken, TokenStore};

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::GmailConfig;
use crate::error::AuthError;

/// Read-only Gmail scope.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// How long the interactive flow waits for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Produces a usable Gmail access token.
pub struct GmailAuthenticator {
    store: TokenStore,
    credentials_file: PathBuf,
    oauth_port: u16,
    client: reqwest::Client,
}

impl GmailAuthenticator {
    pub fn new(config: &GmailConfig) -> Self {
        Self {
            store: TokenStore::new(&config.token_file),
            credentials_file: config.credentials_file.clone(),
            oauth_port: config.oauth_port,
            client: reqwest::Client::new(),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return a valid credential.
    ///
    /// 1. Stored token, unless `force_reauth`
    /// 2. Refresh when expired and a refresh token exists
    /// 3. Interactive consent flow; the result replaces the token file
    pub async fn credentials(&self, force_reauth: bool) -> Result<StoredToken, AuthError> {
        if !force_reauth {
            if let Some(token) = self.store.load() {
                if !token.is_expired() {
                    info!("Using existing token file for authentication");
                    return Ok(token);
                }
                if token.refresh_token.is_some() {
                    match flow::refresh(&self.client, &token).await {
                        Ok(refreshed) => {
                            info!("Refreshed expired access token");
                            self.store.save(&refreshed)?;
                            return Ok(refreshed);
                        }
                        Err(e) => warn!("Token refresh failed, falling back to consent flow: {e}"),
                    }
                }
            }
        }

        self.run_consent_flow().await
    }

    async fn run_consent_flow(&self) -> Result<StoredToken, AuthError> {
        info!("No valid token found; running local server flow");
        let secrets = ClientSecrets::from_file(&self.credentials_file)?;
        let flow = InstalledAppFlow::new(secrets, &[GMAIL_READONLY_SCOPE], self.oauth_port);

        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = flow.authorization_url(&state)?;
        info!(port = self.oauth_port, "Open this URL to authorize Gmail access: {url}");
        eprintln!("Please visit this URL to authorize this application: {url}");

        let code = CallbackServer::wait_for_code(self.oauth_port, state, CALLBACK_TIMEOUT).await?;
        let token = flow.exchange(&code).await?;
        self.store.save(&token)?;
        info!("New token file created");
        Ok(token)
    }
}
