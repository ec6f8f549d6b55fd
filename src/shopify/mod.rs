//! Shopify Admin catalog source for the commerce map.
pub mod client;
pub mod map;

pub use client::{CatalogVariant, ShopifyClient};
pub use map::{build_commerce_map, CommerceEntry, CommerceSnapshot};
