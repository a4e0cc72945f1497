use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use super::errors::PriceError;
use super::value_objects::CustomerPrice;
use crate::domain::order::MAX_AMOUNT;

// ============================================================================
// Price List CSV - parse, plan and render
// ============================================================================
//
// Columns are found by header name, cells are trimmed, and quoted cells may
// contain separators. Exports quote every cell so they import back as-is.
//
// ============================================================================

pub const EXPORT_HEADER: [&str; 5] = ["parent_sku", "product_name", "unit_price", "currency", "notes"];

/// One data row as typed by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub parent_sku: String,
    pub unit_price: String,
    pub notes: Option<String>,
}

/// What the import will do with each row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowPlan {
    Upsert {
        parent_sku: String,
        unit_price: Decimal,
        notes: Option<String>,
        /// Price currently stored for this SKU, if any
        replaces: Option<Decimal>,
    },
    SkipUnknownSku { parent_sku: String },
    SkipInvalid { parent_sku: String, reason: String },
}

impl From<csv::Error> for PriceError {
    fn from(error: csv::Error) -> Self {
        PriceError::MalformedCsv(error.to_string())
    }
}

/// Read the file into rows keyed by the header line
pub fn parse_csv(text: &str) -> Result<Vec<PriceRow>, PriceError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header = reader.headers()?.clone();
    if header.iter().all(str::is_empty) {
        return Err(PriceError::EmptyCsv);
    }
    let column = |name: &'static str| header.iter().position(|h| h == name);
    let sku_col = column("parent_sku").ok_or(PriceError::MissingColumn("parent_sku"))?;
    let price_col = column("unit_price").ok_or(PriceError::MissingColumn("unit_price"))?;
    let notes_col = column("notes");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        rows.push(PriceRow {
            parent_sku: cell(sku_col),
            unit_price: cell(price_col),
            notes: notes_col.map(cell).filter(|n| !n.is_empty()),
        });
    }

    if rows.is_empty() {
        return Err(PriceError::EmptyCsv);
    }
    Ok(rows)
}

/// Parse an operator-typed price; blank, negative, oversized or garbage is rejected
pub fn parse_price(raw: &str) -> Result<Decimal, PriceError> {
    let raw = raw.trim();
    match Decimal::from_str(raw) {
        Ok(price) if !price.is_sign_negative() && price <= MAX_AMOUNT => Ok(price),
        _ => Err(PriceError::InvalidPrice(raw.to_string())),
    }
}

/// Match rows against the catalog and the customer's current prices
pub fn plan_import(
    rows: &[PriceRow],
    known_parent_skus: &HashSet<String>,
    existing: &[CustomerPrice],
) -> Vec<RowPlan> {
    let current: HashMap<&str, Decimal> = existing
        .iter()
        .map(|p| (p.parent_sku.as_str(), p.unit_price))
        .collect();

    rows.iter()
        .map(|row| {
            if !known_parent_skus.contains(&row.parent_sku) {
                return RowPlan::SkipUnknownSku {
                    parent_sku: row.parent_sku.clone(),
                };
            }
            match parse_price(&row.unit_price) {
                Ok(unit_price) => RowPlan::Upsert {
                    parent_sku: row.parent_sku.clone(),
                    unit_price,
                    notes: row.notes.clone(),
                    replaces: current.get(row.parent_sku.as_str()).copied(),
                },
                Err(e) => RowPlan::SkipInvalid {
                    parent_sku: row.parent_sku.clone(),
                    reason: e.to_string(),
                },
            }
        })
        .collect()
}

/// Render a price list; every cell is quoted
pub fn render_csv<'a>(
    prices: &[CustomerPrice],
    product_name: impl Fn(&str) -> Option<&'a str>,
) -> Result<String, PriceError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for price in prices {
        let unit_price = price.unit_price.to_string();
        writer.write_record([
            price.parent_sku.as_str(),
            product_name(&price.parent_sku).unwrap_or(""),
            unit_price.as_str(),
            price.currency.as_str(),
            price.notes.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PriceError::MalformedCsv(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| PriceError::MalformedCsv(e.to_string()))
}

// ============================================================================
// Unit Tests
// ============================================================================
