//! The cart aggregate: one owner, a list of line items unique by product.

use jiff::Timestamp;
use serde_json::Value;

use super::{CartError, CartId, ItemId, ProductId, SessionId, UserId};

//------------------------- Quantity ----------------------------

/// A line item quantity. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Result<Self, CartError> {
        if value == 0 {
            return Err(CartError::InvalidQuantity(value.to_string()));
        }
        Ok(Quantity(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn checked_add(self, other: Quantity) -> Result<Self, CartError> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or_else(|| CartError::InvalidQuantity(format!("{} + {}", self.0, other.0)))
    }

    /// One less, or `None` when the line should disappear instead.
    pub fn decremented(self) -> Option<Self> {
        (self.0 > 1).then(|| Quantity(self.0 - 1))
    }

    /// Normalises a client supplied quantity. Whole JSON numbers and numeric strings
    /// are accepted, anything else (zero, negatives, fractions, text) is rejected.
    pub fn from_json(value: &Value) -> Result<Self, CartError> {
        let invalid = || CartError::InvalidQuantity(value.to_string());
        let number = match value {
            Value::Number(number) => number.as_f64().ok_or_else(invalid)?,
            Value::String(text) => text.trim().parse::<f64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        if !number.is_finite() || number.fract() != 0.0 || number < 1.0 || number > f64::from(u32::MAX) {
            return Err(invalid());
        }
        // Range and integrality were checked above.
        Ok(Quantity(number as u32))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = CartError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| CartError::InvalidQuantity(value.to_string()))
            .and_then(Quantity::new)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        i64::from(value.0)
    }
}

//-------------------------- Owner ------------------------------

/// Discriminant stored next to the owner reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OwnerKind {
    User,
    Session,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown owner kind {0:?}.")]
pub struct UnknownOwnerKind(String);

impl std::str::FromStr for OwnerKind {
    type Err = UnknownOwnerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(OwnerKind::User),
            "session" => Ok(OwnerKind::Session),
            other => Err(UnknownOwnerKind(other.to_owned())),
        }
    }
}

/// The identity a cart belongs to. Fixed for the lifetime of the cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CartOwner {
    User(UserId),
    Session(SessionId),
}

impl CartOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            CartOwner::User(_) => OwnerKind::User,
            CartOwner::Session(_) => OwnerKind::Session,
        }
    }

    pub fn reference(&self) -> uuid::Uuid {
        match self {
            CartOwner::User(user_id) => (*user_id).into(),
            CartOwner::Session(session_id) => (*session_id).into(),
        }
    }

    pub fn from_parts(kind: OwnerKind, reference: uuid::Uuid) -> Self {
        match kind {
            OwnerKind::User => CartOwner::User(reference.into()),
            OwnerKind::Session => CartOwner::Session(reference.into()),
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.reference())
    }
}

//-------------------------- Cart -------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartLineItem {
    pub item_id: ItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl CartLineItem {
    pub fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            item_id: ItemId::new(),
            product_id,
            quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cart {
    id: CartId,
    owner: CartOwner,
    items: Vec<CartLineItem>,
    version: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        let now = Timestamp::now();
        Self {
            id: CartId::new(),
            owner,
            items: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a cart read back from storage. Lines repeating a product are folded
    /// into the first occurrence so the one-line-per-product rule always holds.
    pub fn restore(
        id: CartId,
        owner: CartOwner,
        items: impl IntoIterator<Item = CartLineItem>,
        version: i64,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        let mut cart = Self {
            id,
            owner,
            items: Vec::new(),
            version,
            created_at,
            updated_at,
        };
        for item in items {
            match cart.items.iter_mut().find(|i| i.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(item.quantity)
                        .unwrap_or(existing.quantity);
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn owner(&self) -> CartOwner {
        self.owner
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Increments an existing line or appends a new one.
    pub fn add_item(&mut self, product_id: ProductId, quantity: Quantity) -> Result<(), CartError> {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => existing.quantity = existing.quantity.checked_add(quantity)?,
            None => self.items.push(CartLineItem::new(product_id, quantity)),
        }
        Ok(())
    }

    /// Decrements the line by one, or drops it when `remove_all` is set or only one is left.
    pub fn remove_item(&mut self, product_id: ProductId, remove_all: bool) -> Result<(), CartError> {
        let index = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or(CartError::ItemNotInCart(product_id))?;

        let decremented = if remove_all {
            None
        } else {
            self.items.get(index).and_then(|i| i.quantity.decremented())
        };

        match (decremented, self.items.get_mut(index)) {
            (Some(quantity), Some(line)) => line.quantity = quantity,
            _ => {
                self.items.remove(index);
            }
        }
        Ok(())
    }

    /// Keeps only lines for which `keep` holds and returns the dropped ones.
    pub fn retain_products<F>(&mut self, mut keep: F) -> Vec<CartLineItem>
    where
        F: FnMut(&ProductId) -> bool,
    {
        let (kept, dropped) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|i| keep(&i.product_id));
        self.items = kept;
        dropped
    }

    /// Folds another cart's lines into this one, summing quantities on shared products.
    pub fn absorb(&mut self, other: &Cart) -> Result<(), CartError> {
        for line in other.items() {
            self.add_item(line.product_id, line.quantity)?;
        }
        Ok(())
    }

    /// Called by stores once a write has been accepted.
    pub fn mark_saved(&mut self, version: i64, updated_at: Timestamp) {
        self.version = version;
        self.updated_at = updated_at;
    }
}

//-------------------------- Tests -------------------------------
