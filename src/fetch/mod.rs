use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
const DOWNLOAD_URL: &str = "https://content.dropboxapi.com/2/files/download";

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange the app's long-lived refresh token for a short-lived access
/// token on the store's OAuth endpoint.
pub async fn retrieve_access_token(
    client: &Client,
    app_key: &str,
    app_secret: &str,
    refresh_token: &str,
) -> Result<String> {
    let params = [
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
        ("client_id", app_key),
        ("client_secret", app_secret),
    ];
    let resp: TokenResponse = client
        .post(TOKEN_URL)
        .form(&params)
        .send()
        .await
        .context("token refresh request failed")?
        .error_for_status()
        .context("token refresh rejected")?
        .json()
        .await
        .context("token response was not the expected JSON")?;
    Ok(resp.access_token)
}

/// Client for the remote file store holding the wrangled extracts.
/// Downloads are whole-file; the store layer decides how often they happen.
pub struct StoreClient {
    http: Client,
    access_token: String,
    download_url: Url,
}

impl StoreClient {
    pub fn new(access_token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        let download_url = Url::parse(DOWNLOAD_URL).context("download endpoint URL")?;
        Ok(Self {
            http,
            access_token,
            download_url,
        })
    }

    /// Connect using app credentials, refreshing the access token first.
    pub async fn connect(app_key: &str, app_secret: &str, refresh_token: &str) -> Result<Self> {
        let bootstrap = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        let token = retrieve_access_token(&bootstrap, app_key, app_secret, refresh_token).await?;
        info!("store access token refreshed");
        Self::new(token)
    }

    /// Download `/file_name` from the store, retrying transient failures
    /// with exponential backoff. Partial responses are never returned: each
    /// attempt either yields the full body or an error.
    pub async fn download(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = format!("/{}", file_name.trim_start_matches('/'));
        let arg = serde_json::json!({ "path": path }).to_string();

        let mut delay = RETRY_DELAY;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .http
                .post(self.download_url.as_str())
                .bearer_auth(&self.access_token)
                .header("Dropbox-API-Arg", &arg)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                    Ok(b) => {
                        info!(file = file_name, bytes = b.len(), "downloaded");
                        return Ok(b.to_vec());
                    }
                    Err(e) if attempt < MAX_RETRIES => {
                        warn!(file = file_name, attempt, error = %e, "body read failed, retrying");
                    }
                    Err(e) => return Err(e).context("reading download body"),
                },
                Ok(resp) if resp.status().is_server_error() && attempt < MAX_RETRIES => {
                    warn!(file = file_name, attempt, status = %resp.status(), "server error, retrying");
                }
                Ok(resp) => {
                    return Err(anyhow!(
                        "download of `{}` failed with HTTP {}",
                        file_name,
                        resp.status()
                    ));
                }
                Err(e) if attempt < MAX_RETRIES => {
                    warn!(file = file_name, attempt, error = %e, "request failed, retrying");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("downloading `{file_name}`"));
                }
            }

            sleep(delay).await;
            delay *= 2;
        }
    }
}
