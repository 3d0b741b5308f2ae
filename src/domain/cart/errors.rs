use crate::domain::stores::StoreError;

use super::{CartId, ProductId};

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Invalid product ID: {0:?}.")]
    InvalidProductId(String),
    #[error("Invalid user ID: {0:?}.")]
    InvalidUserId(String),
    #[error("Invalid quantity: {0}. Quantity must be a whole number of at least 1.")]
    InvalidQuantity(String),
    #[error("Product {0} not found.")]
    ProductNotFound(ProductId),
    #[error("Product {0} is not in the cart.")]
    ItemNotInCart(ProductId),
    #[error("A signed in user is required to merge carts.")]
    NotAuthenticated,
    #[error("Session support is not configured. Guest carts are unavailable.")]
    SessionUnavailable,
    #[error("Cart {0} was modified concurrently. Please retry.")]
    Conflict(CartId),
    #[error("The cart operation did not complete before its deadline.")]
    Timeout,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CartError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict(cart_id) => CartError::Conflict(cart_id),
            other => CartError::Store(other),
        }
    }
}

impl CartError {
    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CartError::Conflict(_))
    }
}
