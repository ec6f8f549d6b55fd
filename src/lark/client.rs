use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::LarkConfig;
use crate::error::{truncate_for_log, Result, SyncError};

/// Lark Open Platform client scoped to one Bitable table.
///
/// Endpoints:
/// - POST /open-apis/auth/v3/tenant_access_token/internal
/// - GET  /open-apis/bitable/v1/apps/{base}/tables/{table}/records
#[derive(Debug, Clone)]
pub struct LarkClient {
    http: Client,
    cfg: LarkConfig,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    expire: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<RecordPage>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordPage {
    #[serde(default)]
    items: Option<Vec<RawRecord>>,
    page_token: Option<String>,
    has_more: Option<bool>,
}

/// One Bitable record as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
}

impl LarkClient {
    pub fn new(cfg: LarkConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("parts-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn records_url(&self) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/records",
            self.cfg.api_base, self.cfg.base_id, self.cfg.table_id
        )
    }

    async fn ensure_success(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let url = resp.url().to_string();
        let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
        Err(SyncError::Status { status, url, body })
    }

    /// Exchange app credentials for a tenant access token.
    ///
    /// A 200 without a token (or with a non-zero `code`) is an auth failure.
    pub async fn tenant_access_token(&self) -> Result<String> {
        let url = format!(
            "{}/open-apis/auth/v3/tenant_access_token/internal",
            self.cfg.api_base
        );
        debug!(app_id = %self.cfg.app_id, "lark: requesting tenant access token");

        let resp = self
            .http
            .post(&url)
            .timeout(self.cfg.auth_timeout)
            .json(&TokenRequest {
                app_id: &self.cfg.app_id,
                app_secret: &self.cfg.app_secret,
            })
            .send()
            .await?;
        let resp = Self::ensure_success(resp).await?;
        let raw = resp.text().await?;
        let body: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| SyncError::Auth(format!("unreadable token response: {e}")))?;

        match body.tenant_access_token.filter(|t| !t.trim().is_empty()) {
            Some(token) if body.code == 0 => {
                info!(expire_secs = ?body.expire, "lark: tenant token acquired");
                Ok(token)
            }
            _ => Err(SyncError::Auth(format!(
                "code={} msg={} body={}",
                body.code,
                body.msg,
                truncate_for_log(raw, 500)
            ))),
        }
    }

    /// Fetch every record of the configured table, following `page_token`.
    pub async fn fetch_all_records(&self, token: &str) -> Result<Vec<RawRecord>> {
        let url = self.records_url();
        let page_size = self.cfg.page_size.to_string();
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut req = self
                .http
                .get(&url)
                .bearer_auth(token)
                .timeout(self.cfg.list_timeout)
                .query(&[("page_size", page_size.as_str())]);
            if let Some(t) = page_token.as_deref() {
                req = req.query(&[("page_token", t)]);
            }

            let resp = Self::ensure_success(req.send().await?).await?;
            let envelope: ListEnvelope = resp.json().await?;
            if envelope.code != 0 {
                return Err(SyncError::Api {
                    api: "lark",
                    message: format!("code={} msg={}", envelope.code, envelope.msg),
                });
            }
            let page = envelope.data.unwrap_or_default();
            let items = page.items.unwrap_or_default();
            pages += 1;
            debug!(page = pages, items = items.len(), "lark: fetched record page");
            if items.is_empty() {
                break;
            }
            records.extend(items);

            let next = page.page_token.filter(|t| !t.is_empty());
            match next {
                Some(next) if page.has_more != Some(false) => {
                    if page_token.as_deref() == Some(next.as_str()) {
                        return Err(SyncError::StuckCursor(next));
                    }
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        info!(pages, records = records.len(), "lark: table fetched");
        Ok(records)
    }
}
