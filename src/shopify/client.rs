use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ShopifyConfig;
use crate::error::{truncate_for_log, Result, SyncError};

/// Products page with the first 100 variants of each product.
pub const PRODUCTS_QUERY: &str = r#"
query Products($cursor: String) {
  products(first: 100, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        handle
        variants(first: 100) {
          pageInfo { hasNextPage }
          edges {
            node {
              id
              sku
              price
              availableForSale
              inventoryQuantity
              image { originalSrc url }
            }
          }
        }
      }
    }
  }
}
"#;

/// Statuses worth another attempt: throttling and flaky edge/gateway errors.
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 520];

fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// `base * 2^attempt`, attempt counted from zero.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

/// Kept untyped so `errors` is inspected before `data` has to fit a shape.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default)]
    page_info: Option<PageInfo>,
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct ProductNode {
    handle: String,
    variants: Connection<VariantNode>,
}

/// A product variant as returned by the Admin API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub available_for_sale: Option<bool>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub image: Option<VariantImage>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub original_src: Option<String>,
}

/// A variant paired with its parent product's handle, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogVariant {
    pub handle: String,
    pub variant: VariantNode,
}

/// Admin GraphQL client for one shop.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: Client,
    endpoint: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl ShopifyClient {
    pub fn new(cfg: &ShopifyConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut token = reqwest::header::HeaderValue::from_str(&cfg.admin_token).map_err(|e| {
            SyncError::InvalidConfig {
                key: "SHOPIFY_ADMIN_TOKEN",
                reason: e.to_string(),
            }
        })?;
        token.set_sensitive(true);
        headers.insert("x-shopify-access-token", token);

        let http = Client::builder()
            .user_agent(concat!("parts-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(cfg.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: cfg.graphql_endpoint(),
            max_retries: cfg.max_retries.max(1),
            backoff_base: cfg.backoff_base,
        })
    }

    /// POST one GraphQL document, retrying throttling/gateway statuses.
    ///
    /// Returns the `data` member. A response carrying `errors` is fatal even on 200,
    /// whatever shape its partial `data` has.
    pub async fn run_query<T>(&self, query: &str, variables: Value) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let payload = GraphQlRequest { query, variables };
        let mut last_status = StatusCode::OK;

        for attempt in 0..self.max_retries {
            let resp = self.http.post(&self.endpoint).json(&payload).send().await?;
            let status = resp.status();

            if status.is_success() {
                let body: GraphQlResponse = resp.json().await?;
                if let Some(errors) = body.errors.filter(|e| !e.is_null()) {
                    return Err(SyncError::Api {
                        api: "shopify",
                        message: truncate_for_log(errors.to_string(), 2000),
                    });
                }
                let data = body
                    .data
                    .filter(|d| !d.is_null())
                    .ok_or_else(|| SyncError::Api {
                        api: "shopify",
                        message: "response carried neither data nor errors".to_string(),
                    })?;
                return Ok(serde_json::from_value(data)?);
            }

            if !is_retryable(status) {
                let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
                return Err(SyncError::Status {
                    status,
                    url: self.endpoint.clone(),
                    body,
                });
            }

            last_status = status;
            if attempt + 1 < self.max_retries {
                let delay = backoff_delay(self.backoff_base, attempt);
                warn!(
                    %status,
                    attempt = attempt + 1,
                    max_attempts = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "shopify: retryable status; backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(SyncError::RetriesExhausted {
            attempts: self.max_retries,
            last_status,
            url: self.endpoint.clone(),
        })
    }

    /// Walk every product page and flatten the variants.
    pub async fn fetch_all_variants(&self) -> Result<Vec<CatalogVariant>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let data: ProductsData = self
                .run_query(PRODUCTS_QUERY, json!({ "cursor": cursor }))
                .await?;
            pages += 1;
            let products = data.products;
            debug!(
                page = pages,
                products = products.edges.len(),
                "shopify: fetched product page"
            );

            for edge in products.edges {
                let product = edge.node;
                if product
                    .variants
                    .page_info
                    .as_ref()
                    .is_some_and(|p| p.has_next_page)
                {
                    warn!(
                        handle = %product.handle,
                        "shopify: product has more than 100 variants; extra variants are not mapped"
                    );
                }
                for vedge in product.variants.edges {
                    out.push(CatalogVariant {
                        handle: product.handle.clone(),
                        variant: vedge.node,
                    });
                }
            }

            let next = match products.page_info {
                Some(PageInfo {
                    has_next_page: true,
                    end_cursor: Some(end),
                }) => end,
                _ => break,
            };
            if cursor.as_deref() == Some(next.as_str()) {
                return Err(SyncError::StuckCursor(next));
            }
            cursor = Some(next);
        }

        info!(pages, variants = out.len(), "shopify: catalog fetched");
        Ok(out)
    }
}
