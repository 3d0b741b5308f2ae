//! Cart Identity Resolver: which cart does this caller mean?

use std::sync::Arc;

use tracing::info;

use crate::domain::stores::{CartStore, SessionStore, StoreError};

use super::{Cart, CartError, CartId, CartOwner, SessionId, UserId};

/// The session's cart binding, handed to the resolver explicitly. Reading and writing the
/// slot goes straight to the session store.
#[derive(Clone)]
pub struct SessionSlot {
    session_id: SessionId,
    store: Arc<dyn SessionStore>,
}

impl SessionSlot {
    pub fn new(session_id: SessionId, store: Arc<dyn SessionStore>) -> Self {
        Self { session_id, store }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn cart_id(&self) -> Result<Option<CartId>, StoreError> {
        self.store.cart_binding(self.session_id).await
    }

    pub async fn bind(&self, cart_id: CartId) -> Result<(), StoreError> {
        self.store.bind_cart(self.session_id, cart_id).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear_binding(self.session_id).await
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Who is asking. A user id wins over the session when both are present.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub user_id: Option<UserId>,
    pub session: Option<SessionSlot>,
}

impl Identity {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            session: None,
        }
    }

    pub fn guest(session: SessionSlot) -> Self {
        Self {
            user_id: None,
            session: Some(session),
        }
    }
}

/// Produces exactly one cart for the identity, creating it on first use.
#[tracing::instrument(skip(carts))]
pub async fn resolve_cart(carts: &dyn CartStore, identity: &Identity) -> Result<Cart, CartError> {
    if let Some(user_id) = identity.user_id {
        return find_or_create(carts, CartOwner::User(user_id)).await;
    }

    let session = identity
        .session
        .as_ref()
        .ok_or(CartError::SessionUnavailable)?;
    let owner = CartOwner::Session(session.session_id());

    if let Some(cart_id) = session.cart_id().await? {
        match carts.find_by_id(cart_id).await? {
            Some(cart) if cart.owner() == owner => return Ok(cart),
            _ => info!("Session cart {cart_id} is gone. Binding a replacement."),
        }
    }

    let cart = find_or_create(carts, owner).await?;
    session.bind(cart.id()).await?;
    Ok(cart)
}

/// Finds the owner's cart or creates it. Losing a creation race to a concurrent request
/// is fine: the winner's cart is read back instead.
pub(crate) async fn find_or_create(carts: &dyn CartStore, owner: CartOwner) -> Result<Cart, CartError> {
    if let Some(cart) = carts.find_by_owner(owner).await? {
        return Ok(cart);
    }
    match carts.create(owner).await {
        Ok(cart) => {
            info!("Created cart {} for {owner}.", cart.id());
            Ok(cart)
        }
        Err(StoreError::OwnerTaken(_)) => carts
            .find_by_owner(owner)
            .await?
            .ok_or(CartError::Store(StoreError::OwnerTaken(owner))),
        Err(e) => Err(e.into()),
    }
}
