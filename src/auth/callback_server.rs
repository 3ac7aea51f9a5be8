use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::Query, response::Html, routing::get};
use tokio::sync::oneshot;

use crate::error::AuthError;

/// Starts a local HTTP server to receive the OAuth redirect, then shuts down.
pub struct CallbackServer;

impl CallbackServer {
    /// Listen on `127.0.0.1:{port}` for a GET `/` carrying `code` and `state`.
    /// Validates `state` and returns the authorization code.
    pub async fn wait_for_code(
        port: u16,
        expected_state: String,
        timeout: Duration,
    ) -> Result<String, AuthError> {
        let (tx, rx) = oneshot::channel::<Result<String, String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let app = Router::new().route(
            "/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let tx = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                async move {
                    let result = check_callback(&params, &expected_state);
                    let page = callback_page(&result);
                    if let Some(tx) = tx {
                        let _ = tx.send(result);
                    }
                    Html(page)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        let server = axum::serve(listener, app);

        tokio::select! {
            result = rx => {
                result
                    .map_err(|_| AuthError::Callback("callback channel closed".into()))?
                    .map_err(AuthError::Callback)
            }
            _ = server.into_future() => {
                Err(AuthError::Callback("server exited unexpectedly".into()))
            }
            _ = tokio::time::sleep(timeout) => {
                Err(AuthError::CallbackTimeout(timeout))
            }
        }
    }
}

fn callback_page(result: &Result<String, String>) -> String {
    match result {
        Ok(_) => "<h1>Authentication successful!</h1><p>You can close this window.</p>".to_string(),
        Err(e) => format!("<h1>Authentication failed</h1><p>{}</p>", escape_html(e)),
    }
}

/// Query values are attacker-controlled; never reflect them raw.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn check_callback(params: &HashMap<String, String>, expected_state: &str) -> Result<String, String> {
    if let Some(error) = params.get("error") {
        return Err(format!("authorization denied: {error}"));
    }
    let state = params.get("state").ok_or("missing state")?;
    if state != expected_state {
        return Err("state mismatch".into());
    }
    params
        .get("code")
        .cloned()
        .ok_or_else(|| "missing code".into())
}
