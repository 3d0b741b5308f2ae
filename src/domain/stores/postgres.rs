use std::str::FromStr;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use jiff_sqlx::ToSqlx;
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use tracing::warn;
use uuid::Uuid;

use crate::domain::cart::{
    Cart, CartId, CartLineItem, CartOwner, ItemId, OwnerKind, ProductId, Quantity, SessionId,
};

use super::{CartStore, ProductCatalog, ProductRecord, SessionStore, StoreError};

//------------------------- Products ----------------------------

#[derive(Clone, Debug)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn find_by_id(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError> {
        let record = sqlx::query_as::<_, ProductRecord>(
            "SELECT product_id, name, price FROM products WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

//--------------------------- Carts -----------------------------

/// Line items are kept document style in a jsonb column so a save is a single row update.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CartLineRecord {
    item_id: Uuid,
    product_id: Uuid,
    quantity: i64,
}

impl From<&CartLineItem> for CartLineRecord {
    fn from(line: &CartLineItem) -> Self {
        Self {
            item_id: line.item_id.into(),
            product_id: line.product_id.into(),
            quantity: line.quantity.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    cart_id: CartId,
    owner_kind: String,
    owner_ref: Uuid,
    items: Json<Vec<Value>>,
    version: i64,
    created_at: jiff_sqlx::Timestamp,
    updated_at: jiff_sqlx::Timestamp,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let cart_id = row.cart_id;
        let kind = OwnerKind::from_str(&row.owner_kind).map_err(|e| StoreError::Corrupt {
            cart_id,
            reason: format!("owner kind {:?}: {e}", row.owner_kind),
        })?;

        // Lines that no longer match the schema are skipped rather than failing the whole cart.
        let items = row.items.0.into_iter().filter_map(|value| {
            let line = serde_json::from_value::<CartLineRecord>(value.clone())
                .map_err(|e| e.to_string())
                .and_then(|record| {
                    Quantity::try_from(record.quantity)
                        .map(|quantity| CartLineItem {
                            item_id: ItemId::from(record.item_id),
                            product_id: ProductId::from(record.product_id),
                            quantity,
                        })
                        .map_err(|e| e.to_string())
                });
            line.inspect_err(|e| warn!("Dropping malformed line {value} from cart {cart_id}: {e}"))
                .ok()
        });

        Ok(Cart::restore(
            cart_id,
            CartOwner::from_parts(kind, row.owner_ref),
            items,
            row.version,
            row.created_at.to_jiff(),
            row.updated_at.to_jiff(),
        ))
    }
}

const CART_COLUMNS: &str =
    "cart_id, owner_kind, owner_ref, items, version, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explains why a version-checked update touched no row.
    async fn rejected_save(&self, cart_id: CartId) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM carts WHERE cart_id = $1)",
        )
        .bind(cart_id)
        .fetch_one(&self.pool)
        .await;
        match exists {
            Ok(true) => StoreError::VersionConflict(cart_id),
            Ok(false) => StoreError::CartMissing(cart_id),
            Err(e) => e.into(),
        }
    }
}

/// Writes the cart's lines if the stored version still matches. Returns the new version,
/// or `None` when no row matched.
async fn update_items<'e, E>(
    executor: E,
    cart: &Cart,
    now: Timestamp,
) -> Result<Option<i64>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let lines: Vec<CartLineRecord> = cart.items().iter().map(CartLineRecord::from).collect();
    sqlx::query_scalar::<_, i64>(
        r#"UPDATE carts
           SET items = $1, version = version + 1, updated_at = $2
           WHERE cart_id = $3 AND version = $4
           RETURNING version"#,
    )
    .bind(Json(lines))
    .bind(now.to_sqlx())
    .bind(cart.id())
    .bind(cart.version())
    .fetch_optional(executor)
    .await
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError> {
        let query = format!("SELECT {CART_COLUMNS} FROM carts WHERE cart_id = $1");
        sqlx::query_as::<_, CartRow>(&query)
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Cart::try_from)
            .transpose()
    }

    async fn find_by_owner(&self, owner: CartOwner) -> Result<Option<Cart>, StoreError> {
        let query =
            format!("SELECT {CART_COLUMNS} FROM carts WHERE owner_kind = $1 AND owner_ref = $2");
        sqlx::query_as::<_, CartRow>(&query)
            .bind(owner.kind().to_string())
            .bind(owner.reference())
            .fetch_optional(&self.pool)
            .await?
            .map(Cart::try_from)
            .transpose()
    }

    async fn create(&self, owner: CartOwner) -> Result<Cart, StoreError> {
        let cart = Cart::new(owner);
        let result = sqlx::query(
            r#"INSERT INTO carts (cart_id, owner_kind, owner_ref, items, version, created_at, updated_at)
               VALUES ($1, $2, $3, '[]'::jsonb, $4, $5, $6)"#,
        )
        .bind(cart.id())
        .bind(owner.kind().to_string())
        .bind(owner.reference())
        .bind(cart.version())
        .bind(cart.created_at().to_sqlx())
        .bind(cart.updated_at().to_sqlx())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(cart),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::OwnerTaken(owner))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &mut Cart) -> Result<(), StoreError> {
        let now = Timestamp::now();
        match update_items(&self.pool, cart, now).await? {
            Some(version) => {
                cart.mark_saved(version, now);
                Ok(())
            }
            None => Err(self.rejected_save(cart.id()).await),
        }
    }

    async fn save_merged(&self, cart: &mut Cart, absorbed: CartId) -> Result<(), StoreError> {
        let now = Timestamp::now();
        let mut tx = self.pool.begin().await?;

        let Some(version) = update_items(&mut *tx, cart, now).await? else {
            tx.rollback().await?;
            return Err(self.rejected_save(cart.id()).await);
        };
        sqlx::query("DELETE FROM carts WHERE cart_id = $1")
            .bind(absorbed)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        cart.mark_saved(version, now);
        Ok(())
    }

    async fn delete(&self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_abandoned_session_carts(&self, idle_since: Timestamp) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM carts WHERE owner_kind = $1 AND updated_at < $2")
            .bind(OwnerKind::Session.to_string())
            .bind(idle_since.to_sqlx())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//-------------------------- Sessions ---------------------------

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl: SignedDuration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: SignedDuration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn open_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        let expires_at = Timestamp::now() + self.ttl;
        sqlx::query(
            r#"INSERT INTO cart_sessions (session_id, cart_id, expires_at)
               VALUES ($1, NULL, $2)
               ON CONFLICT (session_id) DO NOTHING"#,
        )
        .bind(session_id)
        .bind(expires_at.to_sqlx())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_active(&self, session_id: SessionId) -> Result<bool, StoreError> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM cart_sessions WHERE session_id = $1 AND expires_at > $2)",
        )
        .bind(session_id)
        .bind(Timestamp::now().to_sqlx())
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    async fn cart_binding(&self, session_id: SessionId) -> Result<Option<CartId>, StoreError> {
        let cart_id = sqlx::query_scalar::<_, Option<CartId>>(
            "SELECT cart_id FROM cart_sessions WHERE session_id = $1 AND expires_at > $2",
        )
        .bind(session_id)
        .bind(Timestamp::now().to_sqlx())
        .fetch_optional(&self.pool)
        .await?;
        Ok(cart_id.flatten())
    }

    async fn bind_cart(&self, session_id: SessionId, cart_id: CartId) -> Result<(), StoreError> {
        let expires_at = Timestamp::now() + self.ttl;
        sqlx::query(
            r#"INSERT INTO cart_sessions (session_id, cart_id, expires_at)
               VALUES ($1, $2, $3)
               ON CONFLICT (session_id)
               DO UPDATE SET cart_id = $2, expires_at = $3"#,
        )
        .bind(session_id)
        .bind(cart_id)
        .bind(expires_at.to_sqlx())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_binding(&self, session_id: SessionId) -> Result<(), StoreError> {
        sqlx::query("UPDATE cart_sessions SET cart_id = NULL WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_sessions WHERE expires_at <= $1")
            .bind(Timestamp::now().to_sqlx())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//-------------------------- Tests -------------------------------
