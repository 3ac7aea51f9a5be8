//! Google OAuth client secrets (`credentials.json`).

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::AuthError;

/// Client registration for the installed-app flow.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: SecretString,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// The downloaded file nests the registration under `installed` or `web`.
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|e| AuthError::ClientSecrets {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&data).map_err(|reason| AuthError::ClientSecrets {
            path: path.display().to_string(),
            reason,
        })
    }

    fn from_json(data: &str) -> Result<Self, String> {
        let file: SecretsFile = serde_json::from_str(data).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" section".to_string())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn parses_installed_section() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "id", "client_secret": "s",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "id");
        assert_eq!(secrets.client_secret.expose_secret(), "s");
    }

    #[test]
    fn web_section_gets_default_uris() {
        let secrets =
            ClientSecrets::from_json(r#"{"web": {"client_id": "w", "client_secret": "s"}}"#)
                .unwrap();
        assert_eq!(secrets.client_id, "w");
        assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = ClientSecrets::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(err.contains("installed"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ClientSecrets::from_file(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/credentials.json"));
    }
}
