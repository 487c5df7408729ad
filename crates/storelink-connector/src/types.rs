//! Wire types shared by all storefront connectors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of product record on the storefront side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteProductType {
    /// A standalone product.
    #[default]
    Simple,
    /// A parent product that only exists through its variations.
    Variable,
    /// One variation of a variable product.
    Variation,
}

impl fmt::Display for RemoteProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Variable => write!(f, "variable"),
            Self::Variation => write!(f, "variation"),
        }
    }
}

impl std::str::FromStr for RemoteProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "variable" => Ok(Self::Variable),
            "variation" => Ok(Self::Variation),
            other => Err(format!("Unknown remote product type: {other}")),
        }
    }
}

/// A product (or variation) as read from the storefront catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProduct {
    /// Storefront product id. For variations this is the parent id.
    pub id: i64,
    /// Variation id, when this record is a variation.
    pub variation_id: Option<i64>,
    /// SKU as stored on the storefront, if any.
    pub sku: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Product kind.
    pub product_type: RemoteProductType,
    /// Publication status on the storefront (e.g. "publish", "draft").
    pub status: Option<String>,
    /// Regular price, decimal-parsed from the wire string.
    pub regular_price: Option<Decimal>,
    /// Stock quantity, when stock management is enabled.
    pub stock_quantity: Option<i32>,
    /// Whether the storefront manages stock for this product.
    pub manage_stock: bool,
    /// Last modification timestamp reported by the storefront.
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteProduct {
    /// The identifier pair used by the listing registry: `(product, variation)`.
    #[must_use]
    pub fn identity(&self) -> (i64, Option<i64>) {
        (self.id, self.variation_id)
    }

    /// Whether this record can be written to directly.
    ///
    /// Variable parents aggregate variations and are not a write target.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.product_type != RemoteProductType::Variable
    }
}

/// Payload for creating a new product on the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRemoteProduct {
    pub sku: String,
    pub name: String,
    pub regular_price: Decimal,
    pub stock_quantity: Option<i32>,
    pub manage_stock: bool,
}

/// Partial update for an existing storefront product or variation.
///
/// `None` fields are left untouched on the storefront.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteProductPatch {
    pub name: Option<String>,
    pub regular_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub manage_stock: Option<bool>,
}

impl RemoteProductPatch {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.regular_price.is_none()
            && self.stock_quantity.is_none()
            && self.manage_stock.is_none()
    }

    /// A patch setting only the regular price.
    #[must_use]
    pub fn price(price: Decimal) -> Self {
        Self {
            regular_price: Some(price),
            ..Self::default()
        }
    }

    /// A patch setting only the stock quantity (and enabling stock management).
    #[must_use]
    pub fn stock(quantity: i32) -> Self {
        Self {
            stock_quantity: Some(quantity),
            manage_stock: Some(true),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_product_type_roundtrip() {
        for ty in [
            RemoteProductType::Simple,
            RemoteProductType::Variable,
            RemoteProductType::Variation,
        ] {
            let s = ty.to_string();
            let parsed: RemoteProductType = s.parse().unwrap();
            assert_eq!(ty, parsed);
        }
    }

    #[test]
    fn test_variable_parent_is_not_writable() {
        let product = RemoteProduct {
            id: 10,
            variation_id: None,
            sku: Some("PARENT".to_string()),
            name: Some("Parent".to_string()),
            product_type: RemoteProductType::Variable,
            status: Some("publish".to_string()),
            regular_price: None,
            stock_quantity: None,
            manage_stock: false,
            updated_at: None,
        };
        assert!(!product.is_writable());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(RemoteProductPatch::default().is_empty());
        assert!(!RemoteProductPatch::price(dec("19.90")).is_empty());
        assert!(!RemoteProductPatch::stock(5).is_empty());
    }

    #[test]
    fn test_stock_patch_enables_manage_stock() {
        let patch = RemoteProductPatch::stock(12);
        assert_eq!(patch.stock_quantity, Some(12));
        assert_eq!(patch.manage_stock, Some(true));
        assert!(patch.regular_price.is_none());
    }
}
