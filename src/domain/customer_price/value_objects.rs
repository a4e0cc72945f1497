use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Customer Price Value Objects
// ============================================================================

/// B2B customer as seen by the order workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2bCustomer {
    pub id: Uuid,
    pub customer_code: String,
    pub company_name: String,
    pub currency: String,
    pub payment_terms: Option<String>,
    pub is_active: bool,
}

/// One negotiated price row: (customer, parent SKU) is unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPrice {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub parent_sku: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub notes: Option<String>,
}

impl CustomerPrice {
    pub fn new(
        customer_id: Uuid,
        parent_sku: impl Into<String>,
        unit_price: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            parent_sku: parent_sku.into(),
            unit_price,
            currency: currency.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Parent SKU -> negotiated unit price for one customer.
///
/// An empty book means "no negotiated pricing", never a fetch failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook(BTreeMap<String, Decimal>);

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent_sku: impl Into<String>, unit_price: Decimal) {
        self.0.insert(parent_sku.into(), unit_price);
    }

    pub fn get(&self, parent_sku: &str) -> Option<Decimal> {
        self.0.get(parent_sku).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Keep only the entries for the given parent SKUs
    pub fn restricted_to<'a>(&self, parent_skus: impl IntoIterator<Item = &'a str>) -> Self {
        parent_skus
            .into_iter()
            .filter_map(|sku| self.get(sku).map(|price| (sku.to_string(), price)))
            .collect()
    }
}

impl FromIterator<(String, Decimal)> for PriceBook {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a CustomerPrice> for PriceBook {
    fn from_iter<I: IntoIterator<Item = &'a CustomerPrice>>(iter: I) -> Self {
        iter.into_iter()
            .map(|p| (p.parent_sku.clone(), p.unit_price))
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
