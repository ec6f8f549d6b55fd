//! Aggregation of normalized spare-parts rows into the parts snapshot.
//!
//! Rows are denormalized (one row per part/model pairing), so the same SKU
//! shows up many times. Models are created on first sight and never touched
//! again; part scalars follow last-non-empty-wins per field; the
//! compatible-model set only ever grows.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::lark::SourceRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub sku: String,
    pub name: String,
    pub price_eur: f64,
    pub stock: i64,
    pub image: String,
    pub compatible_models: Vec<String>,
}

/// The `parts.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct PartsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub models: Vec<Model>,
    pub parts: Vec<Part>,
}

/// Lowercase ASCII slug; non-alphanumeric runs collapse to one `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = false;
    for ch in s.trim().chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// Models keyed by identity key, in first-seen order.
#[derive(Debug, Default)]
struct ModelRegistry {
    by_key: IndexMap<String, Model>,
    used_ids: HashSet<String>,
}

impl ModelRegistry {
    /// Id of the model for this number/name pair, creating it on first sight.
    fn ensure(&mut self, model_number: &str, model_name: &str) -> Option<String> {
        let number = model_number.trim();
        let name = model_name.trim();
        let key = if number.is_empty() { name } else { number };
        if key.is_empty() {
            return None;
        }
        if let Some(existing) = self.by_key.get(key) {
            return Some(existing.id.clone());
        }

        let mut base = slugify(key);
        if base.is_empty() {
            base = "model".to_string();
        }
        let mut id = base.clone();
        let mut suffix = 2u32;
        while self.used_ids.contains(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }

        let display = if name.is_empty() { number } else { name };
        self.used_ids.insert(id.clone());
        self.by_key.insert(
            key.to_string(),
            Model {
                id: id.clone(),
                name: display.to_string(),
            },
        );
        Some(id)
    }

    fn into_sorted(self) -> Vec<Model> {
        let mut models: Vec<Model> = self.by_key.into_values().collect();
        // stable: equal names keep first-seen order
        models.sort_by_cached_key(|m| m.name.to_lowercase());
        models
    }
}

#[derive(Debug)]
struct PartAccumulator {
    name: String,
    price_eur: f64,
    stock: i64,
    image: String,
    compatible_models: BTreeSet<String>,
}

impl PartAccumulator {
    fn seed(row: &SourceRow) -> Self {
        Self {
            name: row.part_name.clone(),
            price_eur: row.price_eur,
            stock: row.stock,
            image: row.picture.clone(),
            compatible_models: BTreeSet::new(),
        }
    }

    fn merge(&mut self, row: &SourceRow) {
        // zero price and zero stock count as "no value" and never overwrite
        if row.price_eur != 0.0 {
            self.price_eur = row.price_eur;
        }
        if row.stock != 0 {
            self.stock = row.stock;
        }
        if !row.picture.is_empty() {
            self.image = row.picture.clone();
        }
        if !row.part_name.is_empty() {
            self.name = row.part_name.clone();
        }
    }
}

/// Collapse rows into `(models sorted by name, parts sorted by sku)`.
pub fn aggregate<'a, I>(rows: I) -> (Vec<Model>, Vec<Part>)
where
    I: IntoIterator<Item = &'a SourceRow>,
{
    let mut models = ModelRegistry::default();
    let mut parts: BTreeMap<String, PartAccumulator> = BTreeMap::new();

    for row in rows {
        let sku = row.part_number.trim();
        if sku.is_empty() {
            continue;
        }
        let acc = parts
            .entry(sku.to_string())
            .or_insert_with(|| PartAccumulator::seed(row));
        if let Some(model_id) = models.ensure(&row.model_number, &row.model_name) {
            acc.compatible_models.insert(model_id);
        }
        acc.merge(row);
    }

    let parts = parts
        .into_iter()
        .map(|(sku, acc)| Part {
            sku,
            name: acc.name,
            price_eur: acc.price_eur,
            stock: acc.stock,
            image: acc.image,
            compatible_models: acc.compatible_models.into_iter().collect(),
        })
        .collect();

    (models.into_sorted(), parts)
}

impl PartsSnapshot {
    pub fn build(rows: &[SourceRow], generated_at: DateTime<Utc>) -> Self {
        let (models, parts) = aggregate(rows);
        Self {
            generated_at,
            models,
            parts,
        }
    }
}
