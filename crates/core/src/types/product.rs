//! Product data captured into the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductId;

/// Immutable copy of catalog data taken when a product is added to the cart.
///
/// The cart never re-fetches the catalog, so price and stock may drift from
/// the remote service after the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Catalog ID; the cart's uniqueness key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Price of a single unit.
    pub unit_price: Decimal,
    /// Stock level reported when the snapshot was taken.
    pub stock: i64,
    /// Product image, if the catalog had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot without an image.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Decimal, stock: i64) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            stock,
            image_url: None,
        }
    }

    /// Attach an image URL.
    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Price of `quantity` units, or `None` if it does not fit a `Decimal`.
    #[must_use]
    pub fn price_for(&self, quantity: u32) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_price_for_is_exact() {
        let p = ProductSnapshot::new(ProductId::new(1), "Tea", Decimal::from_str("0.10").unwrap(), 5);
        assert_eq!(p.price_for(3), Some(Decimal::from_str("0.30").unwrap()));
    }

    #[test]
    fn test_price_for_overflow_is_none() {
        let p = ProductSnapshot::new(ProductId::new(1), "Yacht", Decimal::MAX, 1);
        assert_eq!(p.price_for(1), Some(Decimal::MAX));
        assert_eq!(p.price_for(2), None);
    }

    #[test]
    fn test_wire_shape() {
        let p = ProductSnapshot::new(ProductId::new(7), "Mug", Decimal::from_str("12.50").unwrap(), 3)
            .with_image("https://cdn.example.com/mug.png");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["unitPrice"], "12.50");
        assert_eq!(json["imageUrl"], "https://cdn.example.com/mug.png");

        let bare = ProductSnapshot::new(ProductId::new(8), "Cup", Decimal::ONE, 0);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("imageUrl").is_none());
    }
}
