//! Lark Bitable source for the parts snapshot.
pub mod client;
pub mod normalize;

pub use client::{LarkClient, RawRecord};
pub use normalize::{normalize_record, FieldText, SourceRow};

use tracing::{debug, info};

use crate::config::LarkConfig;
use crate::error::Result;

/// Authenticate, page through the table and normalize every usable record.
pub async fn load_source_rows(cfg: &LarkConfig) -> Result<Vec<SourceRow>> {
    let client = LarkClient::new(cfg.clone())?;
    let token = client.tenant_access_token().await?;
    let records = client.fetch_all_records(&token).await?;
    let total = records.len();

    let rows: Vec<SourceRow> = records
        .iter()
        .filter_map(|rec| {
            let row = rec.fields.as_ref().and_then(normalize_record);
            if row.is_none() {
                debug!(record_id = ?rec.record_id, "lark: skipping record without part number");
            }
            row
        })
        .collect();

    info!(
        records = total,
        rows = rows.len(),
        dropped = total - rows.len(),
        "lark: source rows normalized"
    );
    Ok(rows)
}
