//! Gmail OAuth2 authentication
//!
//! Tokens are kept in a Google "authorized user" JSON file, the same format
//! Google's client libraries write. The file is refreshed in place when the
//! access token is near expiry.
//!
//! [`GmailAuth::login`] runs the authorization code flow against a local
//! HTTP listener to create that file in the first place.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::GmailCredentials;

/// Authentication failures callers may want to distinguish
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token file does not grant the Gmail modify scope (granted: {0})")]
    MissingScope(String),
    #[error("Access token expired and the token file has no refresh token")]
    NoRefreshToken,
}

/// Google authorized-user token file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizedUser {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    client_id: String,
    client_secret: String,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    /// Access token usable for at least another five minutes
    fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref()?;
        match self.expiry {
            Some(expiry) if expiry <= now + Duration::seconds(GmailAuth::EXPIRY_BUFFER_SECS) => None,
            _ => Some(token),
        }
    }

    fn apply(&mut self, response: TokenResponse) {
        self.expiry = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));
        self.token = Some(response.access_token);
        // Google only returns a refresh token on first consent
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
    }
}

fn default_token_uri() -> String {
    GmailAuth::TOKEN_URL.to_string()
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: String,
}

/// OAuth2 token management for Gmail
pub struct GmailAuth {
    token_path: PathBuf,
    user: Mutex<AuthorizedUser>,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Required scope for Gmail access (modify allows read + label changes)
    pub const GMAIL_MODIFY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.modify";

    /// Full mailbox access; grants everything the modify scope does
    pub const GMAIL_FULL_SCOPE: &'static str = "https://mail.google.com/";

    /// Tokens expiring within this many seconds are refreshed first
    const EXPIRY_BUFFER_SECS: i64 = 300;

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Load credentials from an authorized-user token file
    ///
    /// Fails if the file names its scopes and neither the Gmail modify scope
    /// nor full mailbox access is among them.
    pub fn from_authorized_user_file(path: impl Into<PathBuf>) -> Result<Self> {
        let token_path = path.into();
        let user: AuthorizedUser = config::load_json_file(&token_path)?;

        if let Some(scopes) = &user.scopes
            && !scopes
                .iter()
                .any(|s| s == Self::GMAIL_MODIFY_SCOPE || s == Self::GMAIL_FULL_SCOPE)
        {
            return Err(AuthError::MissingScope(scopes.join(" ")).into());
        }

        Ok(Self {
            token_path,
            user: Mutex::new(user),
        })
    }

    /// Get the default token storage path (~/.config/sift/gmail-token.json)
    pub fn default_token_path() -> Option<PathBuf> {
        config::config_path("gmail-token.json")
    }

    /// Path of the token file backing this instance
    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Get a valid access token, refreshing it if it is about to expire
    pub fn access_token(&self) -> Result<String> {
        let mut user = self
            .user
            .lock()
            .map_err(|_| anyhow!("Gmail token cache lock poisoned"))?;

        if let Some(token) = user.valid_token(Utc::now()) {
            return Ok(token.to_string());
        }

        let refresh_token = user
            .refresh_token
            .clone()
            .ok_or(AuthError::NoRefreshToken)?;

        debug!("Refreshing Gmail access token");
        let response = Self::refresh_access_token(&user, &refresh_token)?;
        user.apply(response);
        save_authorized_user(&self.token_path, &user)?;

        user.token
            .clone()
            .context("Token refresh returned no access token")
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(user: &AuthorizedUser, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(user.token_uri.as_str())
            .send_form([
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")
    }

    /// Run the interactive authorization code flow and write a new token file
    ///
    /// # Arguments
    /// * `credentials` - OAuth2 client from Google Cloud Console
    /// * `token_path` - Where to write the authorized-user token file
    pub fn login(credentials: &GmailCredentials, token_path: impl Into<PathBuf>) -> Result<Self> {
        let token_path = token_path.into();

        // Step 1: Start local server to receive callback
        let (listener, port) = Self::start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        // Step 2: Build authorization URL
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&credentials.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(Self::GMAIL_MODIFY_SCOPE),
        );

        println!("\n=== Gmail Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        // Step 3: Wait for callback with authorization code
        println!("Waiting for authorization...");
        let code = Self::wait_for_callback(listener)?;

        // Step 4: Exchange code for tokens
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        let mut user = AuthorizedUser {
            token: None,
            refresh_token: None,
            token_uri: Self::TOKEN_URL.to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scopes: Some(vec![Self::GMAIL_MODIFY_SCOPE.to_string()]),
            expiry: None,
        };
        user.apply(token);
        save_authorized_user(&token_path, &user)?;

        info!("Saved Gmail token to {}", token_path.display());
        println!("Authentication successful!\n");

        Ok(Self {
            token_path,
            user: Mutex::new(user),
        })
    }

    /// Start a local TCP server on an available port
    fn start_local_server() -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for OAuth callback and extract authorization code
    fn wait_for_callback(listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        // Format: GET /?code=AUTH_CODE&scope=... HTTP/1.1
        let code = callback_param(&request_line, "code");
        let error = callback_param(&request_line, "error");

        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            anyhow::bail!("OAuth error: {}", err);
        }

        code.context("No authorization code received")
    }
}

/// Extract and URL-decode a query parameter from an HTTP request line
fn callback_param(request_line: &str, name: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;

    query.split('&').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key != name {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

/// Write the token file, creating its directory if needed
fn save_authorized_user(path: &Path, user: &AuthorizedUser) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(user)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write token file: {}", path.display()))?;
    Ok(())
}
