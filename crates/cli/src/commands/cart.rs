//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! sf-cli cart add 12 --name Mug --price 8.50 --quantity 2
//! sf-cli cart set 12 5
//! sf-cli cart remove 12
//! sf-cli cart show
//! ```

use rust_decimal::Decimal;
use shopfront_core::{ProductId, ProductSnapshot};
use shopfront_state::AppState;
use tracing::info;

use crate::error::CliError;

/// Build a product snapshot from command arguments.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` if the price is not a non-negative
/// decimal.
pub fn snapshot(
    product_id: i64,
    name: String,
    price: &str,
    stock: i64,
    image_url: Option<String>,
) -> Result<ProductSnapshot, CliError> {
    let unit_price: Decimal = price
        .trim()
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("price {price:?} is not a decimal")))?;
    if unit_price.is_sign_negative() {
        return Err(CliError::InvalidArgument(format!(
            "price {price} is negative"
        )));
    }

    let product = ProductSnapshot::new(ProductId::new(product_id), name, unit_price, stock);
    Ok(match image_url {
        Some(url) => product.with_image(url),
        None => product,
    })
}

/// Log the cart's lines and totals.
pub fn show(state: &AppState) {
    let cart = state.cart().snapshot();
    if cart.lines.is_empty() {
        info!("Cart is empty");
        return;
    }

    for line in &cart.lines {
        info!(
            "  #{} {} x{} @ {} = {}",
            line.product.id,
            line.product.name,
            line.quantity,
            line.product.unit_price,
            line.total().map_or_else(|| "overflow".to_owned(), |total| total.to_string())
        );
    }
    info!("{} item(s), total {}", cart.total_items, cart.total_price);
}

/// Add `quantity` of `product`.
///
/// # Errors
///
/// Returns an error if the quantity is invalid or the cart cannot be stored.
pub fn add(state: &AppState, product: ProductSnapshot, quantity: i64) -> Result<(), CliError> {
    let product_id = product.id;
    state.cart().add(product, quantity)?;
    info!(
        "Product {product_id} now x{}",
        state.cart().quantity_of(product_id)
    );
    Ok(())
}

/// Set the quantity of a line; zero or less removes it.
///
/// # Errors
///
/// Returns an error if the quantity is invalid or the cart cannot be stored.
pub fn set(state: &AppState, product_id: i64, quantity: i64) -> Result<(), CliError> {
    let product_id = ProductId::new(product_id);
    state.cart().set_quantity(product_id, quantity)?;
    match state.cart().quantity_of(product_id) {
        0 => info!("Product {product_id} not in cart"),
        n => info!("Product {product_id} now x{n}"),
    }
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the cart cannot be stored.
pub fn remove(state: &AppState, product_id: i64) -> Result<(), CliError> {
    let product_id = ProductId::new(product_id);
    state.cart().remove(product_id)?;
    info!("Product {product_id} removed");
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be stored.
pub fn clear(state: &AppState) -> Result<(), CliError> {
    state.cart().clear()?;
    info!("Cart cleared");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_snapshot_parses_price() {
        let product = snapshot(3, "Mug".to_owned(), " 8.50 ", 2, None).unwrap();
        assert_eq!(product.unit_price, Decimal::from_str("8.50").unwrap());
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn test_snapshot_rejects_bad_prices() {
        assert!(matches!(
            snapshot(3, "Mug".to_owned(), "cheap", 0, None),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            snapshot(3, "Mug".to_owned(), "-1", 0, None),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
