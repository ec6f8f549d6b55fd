use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::config::{LarkConfig, ShopifyConfig};
use crate::lark;
use crate::parts::PartsSnapshot;
use crate::shopify::{CommerceSnapshot, ShopifyClient};
use crate::snapshot::{write_snapshot, COMMERCE_MAP_FILE, PARTS_FILE};

/// Where a job writes and whether it writes at all.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartsSummary {
    pub source_rows: usize,
    pub models: usize,
    pub parts: usize,
    pub written: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommerceSummary {
    pub variants: usize,
    pub skus: usize,
    pub written: Option<PathBuf>,
}

fn emit<T: serde::Serialize>(
    out: &OutputOptions,
    file: &str,
    value: &T,
) -> Result<Option<PathBuf>> {
    let path = out.dir.join(file);
    if out.dry_run {
        info!(path = %path.display(), "dry run: snapshot not written");
        return Ok(None);
    }
    write_snapshot(&path, value).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}

/// Lark table -> `parts.json`.
pub async fn run_parts_snapshot(cfg: &LarkConfig, out: &OutputOptions) -> Result<PartsSummary> {
    let rows = lark::load_source_rows(cfg)
        .await
        .context("parts: loading Lark records")?;
    let snapshot = PartsSnapshot::build(&rows, Utc::now());
    let written = emit(out, PARTS_FILE, &snapshot)?;

    let summary = PartsSummary {
        source_rows: rows.len(),
        models: snapshot.models.len(),
        parts: snapshot.parts.len(),
        written,
    };
    let verb = outcome_verb(summary.written.as_deref());
    info!(
        path = %display_target(&out.dir, PARTS_FILE),
        models = summary.models,
        parts = summary.parts,
        "{verb} parts snapshot with {} models and {} parts",
        summary.models,
        summary.parts
    );
    Ok(summary)
}

/// Shopify catalog -> `shopify_map.json`.
pub async fn run_commerce_map(
    cfg: &ShopifyConfig,
    out: &OutputOptions,
) -> Result<CommerceSummary> {
    let client = ShopifyClient::new(cfg).context("commerce: building Shopify client")?;
    let variants = client
        .fetch_all_variants()
        .await
        .context("commerce: fetching catalog")?;
    let snapshot = CommerceSnapshot::build(&variants, unix_seconds_now());
    let written = emit(out, COMMERCE_MAP_FILE, &snapshot)?;

    let summary = CommerceSummary {
        variants: variants.len(),
        skus: snapshot.map.len(),
        written,
    };
    let verb = outcome_verb(summary.written.as_deref());
    info!(
        path = %display_target(&out.dir, COMMERCE_MAP_FILE),
        skus = summary.skus,
        "{verb} commerce map with {} SKUs",
        summary.skus
    );
    Ok(summary)
}

/// Log wording for a finished job; dry runs must not claim a write.
fn outcome_verb(written: Option<&Path>) -> &'static str {
    match written {
        Some(_) => "wrote",
        None => "built (not written)",
    }
}

fn display_target(dir: &Path, file: &str) -> String {
    dir.join(file).display().to_string()
}

fn unix_seconds_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn summary_wording_follows_write_outcome() {
        assert_eq!(outcome_verb(Some(Path::new("public/parts.json"))), "wrote");
        assert_eq!(outcome_verb(None), "built (not written)");
    }

    #[tokio::test]
    async fn parts_job_writes_aggregated_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "msg": "ok", "tenant_access_token": "t-1", "expire": 7200
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/open-apis/bitable/v1/apps/bas1/tables/tbl1/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "msg": "success",
                "data": {"has_more": false, "items": [
                    {"fields": {"PN": "P1", "Price (EUR)": 5, "Current stock": 2,
                                "Model number": {"text": "M-1"}, "Model Name-English": "Model One"}},
                    {"fields": {"PN": "P1", "Price (EUR)": [0], "Current stock": 0,
                                "Pictures": [{"url": "https://cdn/p1.png"}]}},
                    {"fields": {"English Name": "orphan"}},
                    {"fields": {"PN": "P2", "Price (EUR)": "9", "Current stock": "1"}}
                ]}
            })))
            .mount(&server)
            .await;

        let cfg = LarkConfig {
            app_id: "cli".into(),
            app_secret: "sec".into(),
            base_id: "bas1".into(),
            table_id: "tbl1".into(),
            api_base: server.uri(),
            page_size: 500,
            auth_timeout: Duration::from_secs(5),
            list_timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let out = OutputOptions {
            dir: dir.path().join("public"),
            dry_run: false,
        };

        let summary = run_parts_snapshot(&cfg, &out).await.unwrap();
        assert_eq!(summary.source_rows, 3);
        assert_eq!(summary.parts, 2);
        assert_eq!(summary.models, 1);

        let written = summary.written.unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(doc["models"], json!([{"id": "m-1", "name": "Model One"}]));
        assert_eq!(doc["parts"][0]["sku"], "P1");
        assert_eq!(doc["parts"][0]["price_eur"], 5.0);
        assert_eq!(doc["parts"][0]["stock"], 2);
        assert_eq!(doc["parts"][0]["image"], "https://cdn/p1.png");
        assert_eq!(doc["parts"][0]["compatible_models"], json!(["m-1"]));
        assert_eq!(doc["parts"][1]["sku"], "P2");
        assert_eq!(doc["parts"][1]["price_eur"], 9.0);
        assert!(doc["generated_at"].is_string());
    }

    #[tokio::test]
    async fn failed_auth_leaves_previous_snapshot_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 99991663})))
            .mount(&server)
            .await;

        let cfg = LarkConfig {
            app_id: "cli".into(),
            app_secret: "sec".into(),
            base_id: "bas1".into(),
            table_id: "tbl1".into(),
            api_base: server.uri(),
            page_size: 500,
            auth_timeout: Duration::from_secs(5),
            list_timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join(PARTS_FILE);
        std::fs::write(&previous, "{\"stale\":true}").unwrap();
        let out = OutputOptions {
            dir: dir.path().to_path_buf(),
            dry_run: false,
        };

        assert!(run_parts_snapshot(&cfg, &out).await.is_err());
        assert_eq!(std::fs::read_to_string(previous).unwrap(), "{\"stale\":true}");
    }

    #[tokio::test]
    async fn commerce_dry_run_fetches_but_skips_writing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"products": {"pageInfo": {"hasNextPage": false, "endCursor": null}, "edges": [
                    {"node": {"handle": "screen", "variants": {"edges": [
                        {"node": {"id": "gid://shopify/ProductVariant/5", "sku": "SP-1",
                                  "price": "3.00", "availableForSale": false, "inventoryQuantity": 0,
                                  "image": null}},
                        {"node": {"id": "gid://shopify/ProductVariant/6", "sku": " sp-1 ",
                                  "price": "4.00", "availableForSale": true, "inventoryQuantity": 2,
                                  "image": null}}
                    ]}}}
                ]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = ShopifyConfig {
            store: "unused.myshopify.com".into(),
            admin_token: "shpat".into(),
            api_version: "2024-07".into(),
            max_retries: 1,
            backoff_base: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            graphql_url: Some(format!("{}/graphql.json", server.uri())),
        };
        let dir = tempfile::tempdir().unwrap();
        let out = OutputOptions {
            dir: dir.path().join("public"),
            dry_run: true,
        };

        let summary = run_commerce_map(&cfg, &out).await.unwrap();
        assert_eq!(
            summary,
            CommerceSummary {
                variants: 2,
                skus: 1,
                written: None
            }
        );
        assert!(!out.dir.exists());
    }

    #[tokio::test]
    async fn commerce_job_writes_map() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"products": {"pageInfo": {"hasNextPage": false}, "edges": [
                    {"node": {"handle": "battery", "variants": {"edges": [
                        {"node": {"id": "gid://shopify/ProductVariant/9", "sku": "BAT-9",
                                  "price": "12.50", "availableForSale": true, "inventoryQuantity": 7,
                                  "image": {"url": null, "originalSrc": "https://cdn/bat.png"}}}
                    ]}}}
                ]}}
            })))
            .mount(&server)
            .await;

        let cfg = ShopifyConfig {
            store: "unused.myshopify.com".into(),
            admin_token: "shpat".into(),
            api_version: "2024-07".into(),
            max_retries: 1,
            backoff_base: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            graphql_url: Some(server.uri()),
        };
        let dir = tempfile::tempdir().unwrap();
        let out = OutputOptions {
            dir: dir.path().to_path_buf(),
            dry_run: false,
        };

        let summary = run_commerce_map(&cfg, &out).await.unwrap();
        let doc: Value =
            serde_json::from_str(&std::fs::read_to_string(summary.written.unwrap()).unwrap())
                .unwrap();
        assert!(doc["generated_at"].as_f64().unwrap() > 0.0);
        assert_eq!(
            doc["map"]["bat-9"],
            json!({
                "variant_id": 9,
                "gid": "gid://shopify/ProductVariant/9",
                "price": "12.50",
                "inventoryQuantity": 7,
                "availableForSale": true,
                "image": "https://cdn/bat.png",
                "handle": "battery"
            })
        );
    }
}
