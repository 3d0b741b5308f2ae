use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use tokio::sync::Mutex;

use crate::domain::cart::{Cart, CartId, CartOwner, ProductId, SessionId};

use super::{CartStore, ProductCatalog, ProductRecord, SessionStore, StoreError};

/// Catalog held in memory. Handy for tests and local experiments.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<Mutex<HashMap<ProductId, ProductRecord>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, product: ProductRecord) {
        self.products
            .lock()
            .await
            .insert(product.product_id, product);
    }

    pub async fn remove(&self, product_id: ProductId) {
        self.products.lock().await.remove(&product_id);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError> {
        Ok(self.products.lock().await.get(&product_id).cloned())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryCartStore {
    carts: Arc<Mutex<HashMap<CartId, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.carts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.carts.lock().await.is_empty()
    }

    /// Stores a cart as is, bypassing version checks. Used to seed state.
    pub async fn put(&self, cart: Cart) {
        self.carts.lock().await.insert(cart.id(), cart);
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.lock().await.get(&cart_id).cloned())
    }

    async fn find_by_owner(&self, owner: CartOwner) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .carts
            .lock()
            .await
            .values()
            .find(|cart| cart.owner() == owner)
            .cloned())
    }

    async fn create(&self, owner: CartOwner) -> Result<Cart, StoreError> {
        let mut carts = self.carts.lock().await;
        if carts.values().any(|cart| cart.owner() == owner) {
            return Err(StoreError::OwnerTaken(owner));
        }
        let cart = Cart::new(owner);
        carts.insert(cart.id(), cart.clone());
        Ok(cart)
    }

    async fn save(&self, cart: &mut Cart) -> Result<(), StoreError> {
        let mut carts = self.carts.lock().await;
        let stored = carts
            .get_mut(&cart.id())
            .ok_or(StoreError::CartMissing(cart.id()))?;
        if stored.version() != cart.version() {
            return Err(StoreError::VersionConflict(cart.id()));
        }
        cart.mark_saved(cart.version() + 1, Timestamp::now());
        *stored = cart.clone();
        Ok(())
    }

    async fn save_merged(&self, cart: &mut Cart, absorbed: CartId) -> Result<(), StoreError> {
        let mut carts = self.carts.lock().await;
        let stored = carts
            .get(&cart.id())
            .ok_or(StoreError::CartMissing(cart.id()))?;
        if stored.version() != cart.version() {
            return Err(StoreError::VersionConflict(cart.id()));
        }
        cart.mark_saved(cart.version() + 1, Timestamp::now());
        carts.insert(cart.id(), cart.clone());
        carts.remove(&absorbed);
        Ok(())
    }

    async fn delete(&self, cart_id: CartId) -> Result<(), StoreError> {
        self.carts.lock().await.remove(&cart_id);
        Ok(())
    }

    async fn purge_abandoned_session_carts(&self, idle_since: Timestamp) -> Result<u64, StoreError> {
        let mut carts = self.carts.lock().await;
        let before = carts.len();
        carts.retain(|_, cart| {
            !(matches!(cart.owner(), CartOwner::Session(_)) && cart.updated_at() < idle_since)
        });
        Ok((before - carts.len()) as u64)
    }
}

#[derive(Clone, Copy, Debug)]
struct SessionRecord {
    cart_id: Option<CartId>,
    expires_at: Timestamp,
}

#[derive(Clone, Debug)]
pub struct InMemorySessionStore {
    ttl: SignedDuration,
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: SignedDuration) -> Self {
        Self {
            ttl,
            sessions: Default::default(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SignedDuration::from_hours(14 * 24))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn open_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        let expires_at = Timestamp::now() + self.ttl;
        self.sessions.lock().await.entry(session_id).or_insert(SessionRecord {
            cart_id: None,
            expires_at,
        });
        Ok(())
    }

    async fn is_active(&self, session_id: SessionId) -> Result<bool, StoreError> {
        let now = Timestamp::now();
        Ok(self
            .sessions
            .lock()
            .await
            .get(&session_id)
            .is_some_and(|record| record.expires_at > now))
    }

    async fn cart_binding(&self, session_id: SessionId) -> Result<Option<CartId>, StoreError> {
        let now = Timestamp::now();
        Ok(self
            .sessions
            .lock()
            .await
            .get(&session_id)
            .filter(|record| record.expires_at > now)
            .and_then(|record| record.cart_id))
    }

    async fn bind_cart(&self, session_id: SessionId, cart_id: CartId) -> Result<(), StoreError> {
        let expires_at = Timestamp::now() + self.ttl;
        self.sessions.lock().await.insert(
            session_id,
            SessionRecord {
                cart_id: Some(cart_id),
                expires_at,
            },
        );
        Ok(())
    }

    async fn clear_binding(&self, session_id: SessionId) -> Result<(), StoreError> {
        if let Some(record) = self.sessions.lock().await.get_mut(&session_id) {
            record.cart_id = None;
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Timestamp::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}
