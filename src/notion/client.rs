use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{errors::CaptureError, payload::page_body};

pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

/// The page created by a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub id: String,
    pub url: Option<String>,
}

/// Remote workspace operations the capture engine depends on.
pub trait NotionBackend: Send + Sync + 'static {
    /// `GET /databases/{id}`: the raw database object, including `properties`.
    fn fetch_database(
        &self,
        database_id: &str,
    ) -> impl Future<Output = Result<Value, CaptureError>> + Send;

    /// `POST /pages` with `{parent: {database_id}, properties}`.
    fn create_page(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
    ) -> impl Future<Output = Result<PageRef, CaptureError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub notion_version: String,
    pub access_token: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: String,
    notion_version: String,
    access_token: String,
}

impl NotionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            notion_version: config.notion_version,
            access_token: config.access_token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Notion-Version", &self.notion_version)
    }

    async fn send(&self, context: &str, request: RequestBuilder) -> Result<Value, CaptureError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| CaptureError::network(context, err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CaptureError::network(context, err.to_string()))?;

        if !status.is_success() {
            let (code, message) = error_details(&body);
            warn!("Notion {context} returned {}: {}", status.as_u16(), message);
            return Err(CaptureError::NetworkFailure {
                context: context.to_string(),
                status: Some(status.as_u16()),
                code,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| CaptureError::decode(context, err.to_string()))
    }
}

impl NotionBackend for NotionClient {
    async fn fetch_database(&self, database_id: &str) -> Result<Value, CaptureError> {
        debug!("Fetching Notion database {database_id}");
        let request = self
            .http
            .get(format!("{}/databases/{database_id}", self.base_url));
        self.send("fetch database", request).await
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
    ) -> Result<PageRef, CaptureError> {
        debug!(
            "Creating page in database {database_id} with {} properties",
            properties.len()
        );
        let request = self
            .http
            .post(format!("{}/pages", self.base_url))
            .json(&page_body(database_id, properties));
        let value = self.send("create page", request).await?;
        page_ref(&value)
    }
}

pub fn page_ref(value: &Value) -> Result<PageRef, CaptureError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CaptureError::decode("create page", "response missing page id"))?;
    let url = value.get("url").and_then(Value::as_str).map(str::to_string);
    Ok(PageRef { id, url })
}

/// Pulls `code` and `message` out of a Notion error body, falling back to the raw text.
fn error_details(body: &str) -> (Option<String>, String) {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let code = value.get("code").and_then(Value::as_str).map(str::to_string);
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            (code, message)
        }
        Err(_) => (None, body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_details_prefer_api_fields() {
        let body = json!({
            "object": "error",
            "status": 400,
            "code": "validation_error",
            "message": "Title is not a property that exists."
        })
        .to_string();
        let (code, message) = error_details(&body);
        assert_eq!(code.as_deref(), Some("validation_error"));
        assert_eq!(message, "Title is not a property that exists.");

        let (code, message) = error_details("<html>bad gateway</html>");
        assert_eq!(code, None);
        assert_eq!(message, "<html>bad gateway</html>");
    }

    #[test]
    fn page_ref_requires_an_id() {
        let page = page_ref(&json!({ "id": "abc", "url": "https://notion.so/abc" })).expect("page");
        assert_eq!(page.id, "abc");
        assert_eq!(page.url.as_deref(), Some("https://notion.so/abc"));
        assert!(page_ref(&json!({ "object": "page" })).is_err());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = NotionClient::new(ClientConfig {
            base_url: "https://api.notion.com/v1/".into(),
            notion_version: DEFAULT_NOTION_VERSION.into(),
            access_token: "secret".into(),
            timeout: Duration::from_secs(5),
        })
        .expect("client");
        assert_eq!(client.base_url, DEFAULT_API_BASE_URL);
    }
}
