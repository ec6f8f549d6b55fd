//! Typed configuration for both jobs, built once at startup and handed to the
//! fetchers. Construction goes through a lookup function so tests can feed a
//! fixed map instead of mutating process env.
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::util::env::{env_opt, preflight_check};

pub const DEFAULT_OUTPUT_DIR: &str = "public";
pub const DEFAULT_LARK_API_BASE: &str = "https://open.larksuite.com";
pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-07";
/// Upper bound the Bitable list endpoint accepts for `page_size`.
pub const MAX_LARK_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone)]
pub struct LarkConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_id: String,
    pub table_id: String,
    pub api_base: String,
    pub page_size: u32,
    pub auth_timeout: Duration,
    pub list_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub store: String,
    pub admin_token: String,
    pub api_version: String,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub timeout: Duration,
    /// Full GraphQL URL overriding the one derived from store and version.
    pub graphql_url: Option<String>,
}

impl LarkConfig {
    const REQUIRED: [&'static str; 4] =
        ["LARK_APP_ID", "LARK_APP_SECRET", "LARK_BASE_ID", "LARK_TABLE_ID"];

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_opt)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = preflight_check("lark", &Self::REQUIRED, &lookup);
        if !missing.is_empty() {
            return Err(SyncError::MissingConfig(missing));
        }
        let get = |k: &str| lookup(k).unwrap_or_default().trim().to_string();

        let api_base = lookup("LARK_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LARK_API_BASE.to_string());
        url::Url::parse(api_base.trim()).map_err(|e| SyncError::InvalidConfig {
            key: "LARK_API_BASE",
            reason: e.to_string(),
        })?;
        let page_size = lookup("LARK_PAGE_SIZE")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(MAX_LARK_PAGE_SIZE)
            .clamp(1, MAX_LARK_PAGE_SIZE);

        Ok(Self {
            app_id: get("LARK_APP_ID"),
            app_secret: get("LARK_APP_SECRET"),
            base_id: get("LARK_BASE_ID"),
            table_id: get("LARK_TABLE_ID"),
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            page_size,
            auth_timeout: Duration::from_secs(30),
            list_timeout: Duration::from_secs(60),
        })
    }
}

impl ShopifyConfig {
    const REQUIRED: [&'static str; 2] = ["SHOPIFY_STORE", "SHOPIFY_ADMIN_TOKEN"];

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_opt)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = preflight_check("shopify", &Self::REQUIRED, &lookup);
        if !missing.is_empty() {
            return Err(SyncError::MissingConfig(missing));
        }
        let store = normalize_store(&lookup("SHOPIFY_STORE").unwrap_or_default());
        if store.is_empty() || store.contains('/') {
            return Err(SyncError::InvalidConfig {
                key: "SHOPIFY_STORE",
                reason: format!("expected a bare shop domain, got {store:?}"),
            });
        }
        let api_version = lookup("SHOPIFY_API_VERSION")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SHOPIFY_API_VERSION.to_string());
        let max_retries = lookup("SHOPIFY_MAX_RETRIES")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(3)
            .max(1);
        let backoff_ms = lookup("SHOPIFY_BACKOFF_BASE_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(1000);

        Ok(Self {
            store,
            admin_token: lookup("SHOPIFY_ADMIN_TOKEN")
                .unwrap_or_default()
                .trim()
                .to_string(),
            api_version,
            max_retries,
            backoff_base: Duration::from_millis(backoff_ms),
            timeout: Duration::from_secs(60),
            graphql_url: lookup("SHOPIFY_GRAPHQL_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    /// Admin GraphQL endpoint for the configured shop and API version, unless
    /// `SHOPIFY_GRAPHQL_URL` overrides it (proxies, local fakes).
    pub fn graphql_endpoint(&self) -> String {
        if let Some(url) = &self.graphql_url {
            return url.clone();
        }
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

/// Accepts `shop.myshopify.com`, `https://shop.myshopify.com/` and friends.
fn normalize_store(raw: &str) -> String {
    let s = raw.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    s.trim_end_matches('/').to_ascii_lowercase()
}

/// Directory the snapshots land in; `SNAPSHOT_OUTPUT_DIR` or `public`.
pub fn output_dir_from_env() -> PathBuf {
    env_opt("SNAPSHOT_OUTPUT_DIR")
        .map(|v| PathBuf::from(v.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}
