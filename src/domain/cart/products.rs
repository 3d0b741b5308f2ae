//! Product Reference Resolver: turns a product id into a price the cart can trust.

use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::stores::{ProductCatalog, ProductRecord, StoreError};

use super::ProductId;

/// A product whose price has been checked and is safe to total.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MalformedProduct {
    #[error("product {0} has no price")]
    MissingPrice(ProductId),
    #[error("product {0} has a negative price {1}")]
    NegativePrice(ProductId, Decimal),
}

impl TryFrom<ProductRecord> for Product {
    type Error = MalformedProduct;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let price = record
            .price
            .ok_or(MalformedProduct::MissingPrice(record.product_id))?;
        if price < Decimal::ZERO {
            return Err(MalformedProduct::NegativePrice(record.product_id, price));
        }
        Ok(Product {
            id: record.product_id,
            name: record.name,
            price,
        })
    }
}

/// Looks the product up fresh. Missing and malformed products both come back as `None`.
pub async fn resolve_product(
    catalog: &dyn ProductCatalog,
    product_id: ProductId,
) -> Result<Option<Product>, StoreError> {
    let Some(record) = catalog.find_by_id(product_id).await? else {
        return Ok(None);
    };
    Ok(Product::try_from(record)
        .inspect_err(|e| warn!("Product {product_id} is unavailable: {e}."))
        .ok())
}
