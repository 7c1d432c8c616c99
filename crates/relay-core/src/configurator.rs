//! Product configurator records.
//!
//! Optional products picked in the configurator are linked to the root
//! product so the generated order lines can be numbered under their parent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product selected in the configurator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredProduct {
    pub product_id: i64,

    #[serde(default)]
    pub parent_product_id: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An order-line record produced from a configured product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub default_product_id: i64,

    #[serde(default)]
    pub default_parent_product_id: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Point every non-root product at the root product.
pub fn link_optional_products(products: &mut [ConfiguredProduct], root_product_id: Option<i64>) {
    for product in products
        .iter_mut()
        .filter(|p| Some(p.product_id) != root_product_id)
    {
        product.parent_product_id = root_product_id;
    }
}

/// Copy each product's parent onto the record created for it.
pub fn products_to_records(products: &[ConfiguredProduct], records: &mut [LineRecord]) {
    for record in records.iter_mut() {
        record.default_parent_product_id = products
            .iter()
            .find(|p| p.product_id == record.default_product_id)
            .and_then(|p| p.parent_product_id);
    }
}
