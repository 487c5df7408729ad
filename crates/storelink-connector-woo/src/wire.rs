//! WooCommerce wire format: JSON body shapes and numeric normalization.
//!
//! WooCommerce serializes prices as strings ("19.90") and reports stock as
//! a nullable integer. This module owns the conversions between those wire
//! shapes and the connector's typed `RemoteProduct`.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use storelink_connector::types::{
    NewRemoteProduct, RemoteProduct, RemoteProductPatch, RemoteProductType,
};

/// A product record as returned by `wc/v3/products` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct WooProductBody {
    pub id: i64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub regular_price: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub manage_stock: bool,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub date_modified_gmt: Option<String>,
}

impl WooProductBody {
    /// Convert into the connector's product type.
    ///
    /// `parent_id` drives the variation mapping: variation endpoints return
    /// records whose `id` is the variation id and whose parent is supplied
    /// out of band or via `parent_id`.
    #[must_use]
    pub fn into_remote(self, parent_hint: Option<i64>) -> RemoteProduct {
        let product_type = self
            .product_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(RemoteProductType::Simple);

        let parent = parent_hint.or(self.parent_id.filter(|p| *p > 0));
        let (id, variation_id) = match (product_type, parent) {
            (RemoteProductType::Variation, Some(parent)) => (parent, Some(self.id)),
            (RemoteProductType::Variation, None) => (self.id, Some(self.id)),
            _ => (self.id, None),
        };

        RemoteProduct {
            id,
            variation_id,
            sku: self.sku.filter(|s| !s.trim().is_empty()),
            name: self.name,
            product_type,
            status: self.status,
            regular_price: self.regular_price.as_deref().and_then(parse_woo_price),
            stock_quantity: self.stock_quantity,
            manage_stock: self.manage_stock,
            updated_at: self.date_modified_gmt.as_deref().and_then(parse_woo_date),
        }
    }
}

/// WooCommerce REST error body (`{"code": ..., "message": ..., "data": ...}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WooErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Serialize a price for the wire: decimal rendered with two places.
#[must_use]
pub fn to_woo_price(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Parse a WooCommerce price string. Empty strings mean "no price".
#[must_use]
pub fn parse_woo_price(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

/// Normalize a stock quantity for the wire: truncate toward zero, floor 0.
#[must_use]
pub fn to_woo_stock_quantity(value: i64) -> i32 {
    value.clamp(0, i64::from(i32::MAX)) as i32
}

/// Parse the `date_modified_gmt` timestamp (naive ISO-8601, UTC).
fn parse_woo_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Build the JSON body for product creation.
#[must_use]
pub fn create_body(product: &NewRemoteProduct) -> Value {
    json!({
        "sku": product.sku,
        "name": product.name,
        "type": "simple",
        "regular_price": to_woo_price(product.regular_price),
        "manage_stock": product.manage_stock,
        "stock_quantity": product.stock_quantity,
    })
}

/// Build the JSON body for a partial product/variation update.
#[must_use]
pub fn patch_body(patch: &RemoteProductPatch) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(ref name) = patch.name {
        body.insert("name".to_string(), json!(name));
    }
    if let Some(price) = patch.regular_price {
        body.insert("regular_price".to_string(), json!(to_woo_price(price)));
    }
    if let Some(manage) = patch.manage_stock {
        body.insert("manage_stock".to_string(), json!(manage));
    }
    if let Some(quantity) = patch.stock_quantity {
        body.insert(
            "stock_quantity".to_string(),
            json!(to_woo_stock_quantity(i64::from(quantity))),
        );
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_price_two_decimals() {
        assert_eq!(to_woo_price(dec("19.9")), "19.90");
        assert_eq!(to_woo_price(dec("19.999")), "20.00");
        assert_eq!(to_woo_price(dec("0")), "0.00");
    }

    #[test]
    fn test_parse_price_empty_is_none() {
        assert_eq!(parse_woo_price(""), None);
        assert_eq!(parse_woo_price("  "), None);
        assert_eq!(parse_woo_price("19.90"), Some(dec("19.90")));
    }

    #[test]
    fn test_stock_quantity_floor() {
        assert_eq!(to_woo_stock_quantity(-3), 0);
        assert_eq!(to_woo_stock_quantity(0), 0);
        assert_eq!(to_woo_stock_quantity(42), 42);
    }

    #[test]
    fn test_body_into_remote_simple() {
        let body: WooProductBody = serde_json::from_value(json!({
            "id": 101,
            "sku": "SKU-1",
            "name": "Widget",
            "type": "simple",
            "status": "publish",
            "regular_price": "19.90",
            "stock_quantity": 7,
            "manage_stock": true,
            "date_modified_gmt": "2025-11-02T10:30:00"
        }))
        .unwrap();

        let remote = body.into_remote(None);
        assert_eq!(remote.id, 101);
        assert_eq!(remote.variation_id, None);
        assert_eq!(remote.sku.as_deref(), Some("SKU-1"));
        assert_eq!(remote.regular_price, Some(dec("19.90")));
        assert_eq!(remote.stock_quantity, Some(7));
        assert!(remote.updated_at.is_some());
    }

    #[test]
    fn test_body_into_remote_variation_uses_parent() {
        let body: WooProductBody = serde_json::from_value(json!({
            "id": 555,
            "sku": "SKU-V",
            "type": "variation",
            "regular_price": "9.50"
        }))
        .unwrap();

        let remote = body.into_remote(Some(100));
        assert_eq!(remote.id, 100);
        assert_eq!(remote.variation_id, Some(555));
    }

    #[test]
    fn test_blank_sku_is_none() {
        let body: WooProductBody = serde_json::from_value(json!({
            "id": 7,
            "sku": "   ",
            "type": "simple"
        }))
        .unwrap();
        assert_eq!(body.into_remote(None).sku, None);
    }

    #[test]
    fn test_patch_body_only_set_fields() {
        let patch = RemoteProductPatch::price(dec("21.00"));
        let body = patch_body(&patch);
        assert_eq!(body["regular_price"], "21.00");
        assert!(body.get("stock_quantity").is_none());
        assert!(body.get("name").is_none());
    }

    #[test]
    fn test_create_body_shape() {
        let body = create_body(&NewRemoteProduct {
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            regular_price: dec("19.90"),
            stock_quantity: Some(3),
            manage_stock: true,
        });
        assert_eq!(body["type"], "simple");
        assert_eq!(body["regular_price"], "19.90");
        assert_eq!(body["stock_quantity"], 3);
    }
}
