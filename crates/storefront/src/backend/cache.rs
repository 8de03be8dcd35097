//! Cache types for catalog responses.

use super::types::Product;

/// Cache key for a single product.
pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
}
