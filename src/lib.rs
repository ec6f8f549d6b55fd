//! Batch jobs that turn the Lark spare-parts table and the Shopify catalog
//! into the static JSON snapshots served next to the storefront.
pub mod config;
pub mod error;
pub mod jobs;
pub mod lark;
pub mod logging;
pub mod parts;
pub mod shopify;
pub mod snapshot;

pub mod util {
    pub mod env;
}

pub use error::{Result, SyncError};
