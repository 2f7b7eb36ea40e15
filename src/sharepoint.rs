//! Downloads the workbook from a SharePoint / OneDrive drive item through
//! Microsoft Graph, authenticating with the OAuth2 client-credentials flow.

use crate::error::{ReportError, Result};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct DriveItem {
    pub drive_id: String,
    pub item_id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct GraphDriveSource {
    client: Client,
    credentials: GraphCredentials,
    item: DriveItem,
    graph_base_url: String,
    login_base_url: String,
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReportError::Source(format!("missing environment variable {}", key)))
}

impl GraphDriveSource {
    pub fn new(credentials: GraphCredentials, item: DriveItem) -> Self {
        Self {
            client: Client::new(),
            credentials,
            item,
            graph_base_url: GRAPH_BASE_URL.to_string(),
            login_base_url: LOGIN_BASE_URL.to_string(),
        }
    }

    /// Reads `TENANT_ID`, `CLIENT_ID`, `CLIENT_SECRET`, `SHAREPOINT_DRIVE_ID`
    /// and `SHAREPOINT_FILE_ID`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            GraphCredentials {
                tenant_id: required_env("TENANT_ID")?,
                client_id: required_env("CLIENT_ID")?,
                client_secret: required_env("CLIENT_SECRET")?,
            },
            DriveItem {
                drive_id: required_env("SHAREPOINT_DRIVE_ID")?,
                item_id: required_env("SHAREPOINT_FILE_ID")?,
            },
        ))
    }

    /// Points both endpoints somewhere else, e.g. a national cloud or a test server.
    pub fn with_base_urls(mut self, graph: impl Into<String>, login: impl Into<String>) -> Self {
        self.graph_base_url = graph.into();
        self.login_base_url = login.into();
        self
    }

    pub fn content_url(&self) -> String {
        format!(
            "{}/drives/{}/items/{}/content",
            self.graph_base_url, self.item.drive_id, self.item.item_id
        )
    }

    pub async fn access_token(&self) -> Result<String> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url, self.credentials.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
        ];

        let res = self.client.post(&url).form(&form).send().await?;
        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(ReportError::Source(format!(
                "Token request failed (status {}): {}",
                status, err_text
            )));
        }

        let token: TokenResponse = res.json().await?;
        debug!("Acquired Graph access token");
        Ok(token.access_token)
    }

    pub async fn fetch_workbook_bytes(&self) -> Result<Vec<u8>> {
        let token = self.access_token().await?;
        let url = self.content_url();
        info!("Downloading workbook from drive {}", self.item.drive_id);

        let res = self.client.get(&url).bearer_auth(token).send().await?;
        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(ReportError::Source(format!(
                "Workbook download failed (status {}): {}",
                status, err_text
            )));
        }

        let bytes = res.bytes().await?;
        info!("Fetched workbook ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }
}
