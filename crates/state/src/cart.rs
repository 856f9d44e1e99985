//! Cart store.
//!
//! An ordered list of product lines, unique by product ID, restored from
//! durable storage when the store is built and persisted after every change.
//! Each mutation computes the new lines, persists them, then publishes them;
//! a subscriber never sees lines that are not yet in storage.

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use shopfront_core::{ProductId, ProductSnapshot};

use crate::observable::{Observable, Subscription};
use crate::storage::{
    DurableStore, StorageCorrupt, StorageError, StorageKeys, decode_record, encode_record, lock,
};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The caller passed an argument the cart cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisting the cart failed; the cart is unchanged.
    #[error("cart storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One product and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product data captured when first added.
    pub product: ProductSnapshot,
    /// Units in the cart; always at least one.
    pub quantity: u32,
}

impl CartLine {
    /// Price of this line, or `None` if it overflows.
    #[must_use]
    pub fn total(&self) -> Option<Decimal> {
        self.product.price_for(self.quantity)
    }
}

/// Cart lines with their aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cart {
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
    /// Sum of quantities.
    pub total_items: u64,
    /// Sum of line prices.
    pub total_price: Decimal,
}

impl Cart {
    /// Compute aggregates over `lines`.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let total_items = lines.iter().map(|line| u64::from(line.quantity)).sum();
        // Stores only hold lines whose total fits; see `checked_total`.
        let total_price = checked_total(&lines).unwrap_or(Decimal::MAX);
        Self {
            lines,
            total_items,
            total_price,
        }
    }
}

/// Persisted, observable shopping cart.
pub struct CartStore {
    storage: Arc<dyn DurableStore>,
    key: String,
    lines: Observable<Vec<CartLine>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create the store, restoring any cart persisted under `keys.cart`.
    ///
    /// An unusable record is logged and the cart starts empty.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStore>, keys: &StorageKeys) -> Self {
        let key = keys.cart.clone();
        let lines = storage
            .get(&key)
            .map(|raw| {
                restore_lines(&raw).unwrap_or_else(|err| {
                    warn!(key = %key, error = %err, "discarding corrupt cart record");
                    Vec::new()
                })
            })
            .unwrap_or_default();
        debug!(lines = lines.len(), "cart restored");

        Self {
            storage,
            key,
            lines: Observable::new(lines),
            write_lock: Mutex::new(()),
        }
    }

    /// Lines and aggregates as they are now.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        Cart::from_lines(self.lines.get())
    }

    /// Line changes, replaying the current lines to new subscribers.
    #[must_use]
    pub const fn lines(&self) -> &Observable<Vec<CartLine>> {
        &self.lines
    }

    /// Shorthand for `lines().subscribe(callback)`.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<CartLine>) + Send + Sync + 'static,
    {
        self.lines.subscribe(callback)
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<CartLine> {
        self.lines
            .with(|lines| lines.iter().find(|line| line.product.id == product_id).cloned())
    }

    /// Units of `product_id` in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.with(Vec::is_empty)
    }

    /// Add `quantity` units of `product`.
    ///
    /// Merges into the existing line for the product, otherwise appends a
    /// new line. The stored snapshot of an existing line is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidArgument`] if `quantity` is not positive
    /// or the line quantity or cart total would overflow, and
    /// [`CartError::Storage`] if persisting fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add(&self, product: ProductSnapshot, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidArgument(format!(
                "quantity to add must be positive, got {quantity}"
            )));
        }
        let quantity = to_quantity(quantity)?;

        self.mutate(|lines| {
            match lines.iter_mut().find(|line| line.product.id == product.id) {
                Some(line) => {
                    line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                        CartError::InvalidArgument(format!(
                            "quantity for product {} would overflow",
                            product.id
                        ))
                    })?;
                }
                None => lines.push(CartLine { product, quantity }),
            }
            Ok(true)
        })
    }

    /// Set the quantity of `product_id`.
    ///
    /// A quantity of zero or less removes the line. An absent product is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidArgument`] if the product is in the cart
    /// and `quantity` exceeds the line limit or overflows the cart total, and
    /// [`CartError::Storage`] if persisting fails.
    #[instrument(skip(self))]
    pub fn set_quantity(&self, product_id: ProductId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        self.mutate(|lines| {
            let Some(line) = lines.iter_mut().find(|line| line.product.id == product_id) else {
                return Ok(false);
            };
            let quantity = to_quantity(quantity)?;
            if line.quantity == quantity {
                return Ok(false);
            }
            line.quantity = quantity;
            Ok(true)
        })
    }

    /// Remove the line for `product_id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    #[instrument(skip(self))]
    pub fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        self.mutate(|lines| {
            let before = lines.len();
            lines.retain(|line| line.product.id != product_id);
            Ok(lines.len() != before)
        })
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if persisting fails.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<(), CartError> {
        self.mutate(|lines| {
            let changed = !lines.is_empty();
            lines.clear();
            Ok(changed)
        })
    }

    /// Apply `change` to a copy of the lines; if it reports a change, persist
    /// and publish the result. Unchanged carts are neither persisted nor
    /// published, and neither is a result whose total price overflows.
    fn mutate<F>(&self, change: F) -> Result<(), CartError>
    where
        F: FnOnce(&mut Vec<CartLine>) -> Result<bool, CartError>,
    {
        {
            let _guard = lock(&self.write_lock);
            let mut lines = self.lines.get();
            if !change(&mut lines)? {
                return Ok(());
            }
            if checked_total(&lines).is_none() {
                return Err(CartError::InvalidArgument(
                    "cart total price would overflow".to_owned(),
                ));
            }

            let record = encode_record(&lines).map_err(StorageError::from)?;
            self.storage.set(&self.key, &record)?;
            debug!(lines = lines.len(), "cart persisted");
            self.lines.stage(lines);
        }
        self.lines.flush();
        Ok(())
    }
}

/// Sum of line prices, or `None` if any line or the sum overflows.
fn checked_total(lines: &[CartLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.total()?))
}

fn to_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity).map_err(|_| {
        CartError::InvalidArgument(format!("quantity {quantity} exceeds the per-line limit"))
    })
}

fn restore_lines(raw: &str) -> Result<Vec<CartLine>, StorageCorrupt> {
    let lines: Vec<CartLine> = decode_record(raw)?;
    for (index, line) in lines.iter().enumerate() {
        if line.quantity == 0 {
            return Err(StorageCorrupt::Invalid(format!(
                "line {index} has zero quantity"
            )));
        }
        if lines
            .iter()
            .take(index)
            .any(|earlier| earlier.product.id == line.product.id)
        {
            return Err(StorageCorrupt::Invalid(format!(
                "product {} appears more than once",
                line.product.id
            )));
        }
    }
    if checked_total(&lines).is_none() {
        return Err(StorageCorrupt::Invalid(
            "cart total price overflows".to_owned(),
        ));
    }
    Ok(lines)
}
