//! Collaborator interfaces the cart core depends on, with PostgreSQL and in-memory
//! implementations.

mod memory;
mod postgres;

pub use memory::{InMemoryCartStore, InMemoryProductCatalog, InMemorySessionStore};
pub use postgres::{PgCartStore, PgProductCatalog, PgSessionStore};

use async_trait::async_trait;
use jiff::Timestamp;
use rust_decimal::Decimal;

use super::cart::{Cart, CartId, CartOwner, ProductId, SessionId};

/// A product as stored by the catalog. Nothing about it has been validated yet.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub name: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Cart {0} has been modified since it was read.")]
    VersionConflict(CartId),
    #[error("Cart {0} does not exist.")]
    CartMissing(CartId),
    #[error("A cart already exists for owner {0}.")]
    OwnerTaken(CartOwner),
    #[error("Stored cart {cart_id} is unreadable: {reason}")]
    Corrupt { cart_id: CartId, reason: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError>;
}

/// Persistent cart storage. At most one cart exists per owner.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError>;

    async fn find_by_owner(&self, owner: CartOwner) -> Result<Option<Cart>, StoreError>;

    /// Fails with [`StoreError::OwnerTaken`] if the owner already has a cart.
    async fn create(&self, owner: CartOwner) -> Result<Cart, StoreError>;

    /// Replaces the stored item list if the stored version still matches the cart's.
    /// On success the cart carries its new version.
    async fn save(&self, cart: &mut Cart) -> Result<(), StoreError>;

    /// Saves `cart` as [`CartStore::save`] does and deletes the `absorbed` cart in the same
    /// write. Either both take effect or neither does.
    async fn save_merged(&self, cart: &mut Cart, absorbed: CartId) -> Result<(), StoreError>;

    async fn delete(&self, cart_id: CartId) -> Result<(), StoreError>;

    /// Removes session owned carts not updated since `idle_since`. Returns how many went.
    async fn purge_abandoned_session_carts(&self, idle_since: Timestamp) -> Result<u64, StoreError>;
}

/// The session side of guest carts: which sessions the server has issued, and which cart
/// each one is bound to.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Records a freshly issued session. It expires after the store's ttl.
    async fn open_session(&self, session_id: SessionId) -> Result<(), StoreError>;

    /// True only for sessions this server issued that have not yet expired.
    async fn is_active(&self, session_id: SessionId) -> Result<bool, StoreError>;

    async fn cart_binding(&self, session_id: SessionId) -> Result<Option<CartId>, StoreError>;

    async fn bind_cart(&self, session_id: SessionId, cart_id: CartId) -> Result<(), StoreError>;

    /// Unbinds the session's cart. The session itself stays active.
    async fn clear_binding(&self, session_id: SessionId) -> Result<(), StoreError>;

    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
