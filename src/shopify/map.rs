use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use super::client::CatalogVariant;

/// Commerce metadata for one SKU.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommerceEntry {
    pub variant_id: u64,
    pub gid: String,
    pub price: Option<String>,
    #[serde(rename = "inventoryQuantity")]
    pub inventory_quantity: Option<i64>,
    #[serde(rename = "availableForSale")]
    pub available_for_sale: Option<bool>,
    pub image: Option<String>,
    pub handle: String,
}

/// The `shopify_map.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct CommerceSnapshot {
    /// Unix seconds, fractional.
    pub generated_at: f64,
    pub map: BTreeMap<String, CommerceEntry>,
}

pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Numeric id from `gid://shopify/ProductVariant/123`.
pub fn numeric_id_from_gid(gid: &str) -> Option<u64> {
    gid.rsplit('/').next()?.trim().parse().ok()
}

/// Build the SKU map; later variants overwrite earlier ones with the same SKU.
pub fn build_commerce_map<'a, I>(variants: I) -> BTreeMap<String, CommerceEntry>
where
    I: IntoIterator<Item = &'a CatalogVariant>,
{
    let mut map = BTreeMap::new();
    for cv in variants {
        let v = &cv.variant;
        let sku = normalize_sku(v.sku.as_deref().unwrap_or_default());
        if sku.is_empty() {
            continue;
        }
        let Some(variant_id) = numeric_id_from_gid(&v.id) else {
            warn!(gid = %v.id, sku = %sku, "shopify: variant id has no numeric tail; skipping");
            continue;
        };
        let image = v.image.as_ref().and_then(|img| {
            img.url
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| img.original_src.as_deref().filter(|s| !s.is_empty()))
                .map(str::to_string)
        });

        map.insert(
            sku,
            CommerceEntry {
                variant_id,
                gid: v.id.clone(),
                price: v.price.clone(),
                inventory_quantity: v.inventory_quantity,
                available_for_sale: v.available_for_sale,
                image,
                handle: cv.handle.clone(),
            },
        );
    }
    map
}

impl CommerceSnapshot {
    pub fn build(variants: &[CatalogVariant], generated_at: f64) -> Self {
        Self {
            generated_at,
            map: build_commerce_map(variants),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::client::{VariantImage, VariantNode};

    fn variant(handle: &str, id: u64, sku: Option<&str>) -> CatalogVariant {
        CatalogVariant {
            handle: handle.to_string(),
            variant: VariantNode {
                id: format!("gid://shopify/ProductVariant/{id}"),
                sku: sku.map(str::to_string),
                price: Some("10.00".into()),
                available_for_sale: Some(true),
                inventory_quantity: Some(1),
                image: None,
            },
        }
    }

    #[test]
    fn extracts_numeric_id_from_gid() {
        assert_eq!(
            numeric_id_from_gid("gid://shopify/ProductVariant/44556677"),
            Some(44556677)
        );
        assert_eq!(numeric_id_from_gid("gid://shopify/ProductVariant/abc"), None);
        assert_eq!(numeric_id_from_gid("12"), Some(12));
    }

    #[test]
    fn skus_collapse_case_and_whitespace_last_wins() {
        let variants = vec![
            variant("first", 1, Some(" ABC-1 ")),
            variant("second", 2, Some("abc-1")),
        ];
        let map = build_commerce_map(&variants);
        assert_eq!(map.len(), 1);
        let entry = &map["abc-1"];
        assert_eq!(entry.variant_id, 2);
        assert_eq!(entry.handle, "second");
        assert_eq!(entry.gid, "gid://shopify/ProductVariant/2");
    }

    #[test]
    fn empty_skus_and_bad_ids_are_skipped() {
        let mut bad = variant("bad", 3, Some("OK-1"));
        bad.variant.id = "gid://shopify/ProductVariant/".into();
        let variants = vec![variant("a", 1, None), variant("b", 2, Some("   ")), bad];
        assert!(build_commerce_map(&variants).is_empty());
    }

    #[test]
    fn image_prefers_url_over_original_src() {
        let mut both = variant("a", 1, Some("A"));
        both.variant.image = Some(VariantImage {
            url: Some("https://cdn/new.png".into()),
            original_src: Some("https://cdn/old.png".into()),
        });
        let mut legacy = variant("b", 2, Some("B"));
        legacy.variant.image = Some(VariantImage {
            url: None,
            original_src: Some("https://cdn/old.png".into()),
        });
        let map = build_commerce_map(&[both, legacy]);
        assert_eq!(map["a"].image.as_deref(), Some("https://cdn/new.png"));
        assert_eq!(map["b"].image.as_deref(), Some("https://cdn/old.png"));
    }

    #[test]
    fn entry_serializes_front_end_keys() {
        let snap = CommerceSnapshot::build(&[variant("h", 7, Some("X"))], 1_700_000_000.5);
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["generated_at"], 1_700_000_000.5);
        let e = &v["map"]["x"];
        assert_eq!(e["variant_id"], 7);
        assert_eq!(e["inventoryQuantity"], 1);
        assert_eq!(e["availableForSale"], true);
        assert_eq!(e["price"], "10.00");
        assert!(e["image"].is_null());
        assert_eq!(e["handle"], "h");
    }
}
