//! PostgreSQL gateway using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! delivery-rs = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Consistency
//!
//! Every write runs in one transaction. Rows a write depends on are locked
//! `FOR SHARE` while it runs and rows it deletes or changes are locked
//! `FOR UPDATE`, so a reference checked at the start of a transaction still
//! resolves when it commits.

use crate::core::entity::{
    Address, AddressChanges, Category, CategoryChanges, ClientRef, EntityKind, Item,
    ItemChanges, NewAddress, NewCategory, NewItem, NewOrder, NewUser, Order, OrderChanges,
    OrderFilter, OrderLine, OrderStatus, PaymentMethod, Role, User, UserChanges,
    UserCredentials, UserRef,
};
use crate::core::error::{
    ConflictError, DeliveryError, DeliveryResult, InternalError, NotFoundError, ReferenceError,
};
use crate::core::id::EntityId;
use crate::core::service::{AddressService, CategoryService, ItemService, OrderService, UserService};
use crate::core::workflow;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

const SCHEMA: &[(&str, &str)] = &[
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            description TEXT NOT NULL
        )",
    ),
    (
        "addresses",
        "CREATE TABLE IF NOT EXISTS addresses (
            id BIGSERIAL PRIMARY KEY,
            street TEXT NOT NULL,
            number TEXT NOT NULL,
            district TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            zip_code TEXT NOT NULL
        )",
    ),
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'CLIENT',
            password_hash TEXT NOT NULL,
            address_id BIGINT NOT NULL REFERENCES addresses(id)
        )",
    ),
    (
        "items",
        "CREATE TABLE IF NOT EXISTS items (
            id BIGSERIAL PRIMARY KEY,
            description TEXT NOT NULL,
            unit_price NUMERIC(10, 2) NOT NULL,
            category_id BIGINT NOT NULL REFERENCES categories(id),
            image TEXT NULL
        )",
    ),
    (
        "orders",
        "CREATE TABLE IF NOT EXISTS orders (
            id BIGSERIAL PRIMARY KEY,
            payment_method TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            client_id BIGINT NOT NULL REFERENCES users(id),
            created_by_id BIGINT NOT NULL REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
    (
        "order_items",
        "CREATE TABLE IF NOT EXISTS order_items (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT NOT NULL REFERENCES orders(id),
            item_id BIGINT NOT NULL REFERENCES items(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0)
        )",
    ),
    (
        "unique index on users.address_id",
        "CREATE UNIQUE INDEX IF NOT EXISTS users_address_id_key ON users (address_id)",
    ),
    (
        "index on orders.client_id",
        "CREATE INDEX IF NOT EXISTS idx_orders_client ON orders (client_id, created_at DESC)",
    ),
    (
        "index on order_items.order_id",
        "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items (order_id)",
    ),
];

/// Every table the gateway uses, children first
pub const TABLES: &[&str] = &[
    "order_items",
    "orders",
    "items",
    "users",
    "addresses",
    "categories",
];

/// Apply the required tables and indexes (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    for (what, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", what, e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> DeliveryError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        DeliveryError::from(e)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Unique index keeping an address to a single user
const USERS_ADDRESS_KEY: &str = "users_address_id_key";

fn user_conflict(e: &sqlx::Error, email: String, address_id: Option<EntityId>) -> ConflictError {
    let constraint = e.as_database_error().and_then(|db| db.constraint());
    match (constraint, address_id) {
        (Some(USERS_ADDRESS_KEY), Some(address_id)) => ConflictError::AddressInUse { address_id },
        _ => ConflictError::DuplicateEmail { email },
    }
}

fn parse_wire<T: FromStr<Err = String>>(column: &str, value: &str) -> DeliveryResult<T> {
    T::from_str(value)
        .map_err(|e| InternalError::Storage(format!("bad value in {}: {}", column, e)).into())
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct CategoryRow {
    id: EntityId,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            description: row.description,
        }
    }
}

#[derive(FromRow)]
struct AddressRow {
    id: EntityId,
    street: String,
    number: String,
    district: String,
    city: String,
    state: String,
    zip_code: String,
    resident_id: Option<EntityId>,
    resident_name: Option<String>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        let user = match (row.resident_id, row.resident_name) {
            (Some(id), Some(name)) => Some(UserRef { id, name }),
            _ => None,
        };
        Address {
            id: row.id,
            street: row.street,
            number: row.number,
            district: row.district,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            user,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: EntityId,
    name: String,
    email: String,
    phone: String,
    role: String,
    address_id: EntityId,
    street: String,
    number: String,
    district: String,
    city: String,
    state: String,
    zip_code: String,
}

impl UserRow {
    fn into_user(self) -> DeliveryResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: parse_wire::<Role>("users.role", &self.role)?,
            address_id: self.address_id,
            address: Some(Address {
                id: self.address_id,
                street: self.street,
                number: self.number,
                district: self.district,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
                user: None,
            }),
        })
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    id: EntityId,
    name: String,
    email: String,
    role: String,
    password_hash: String,
}

#[derive(FromRow)]
struct ItemRow {
    id: EntityId,
    description: String,
    unit_price: BigDecimal,
    category_id: EntityId,
    image: Option<String>,
    category_description: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            description: row.description,
            unit_price: row.unit_price,
            category_id: row.category_id,
            image: row.image,
            category: Some(Category {
                id: row.category_id,
                description: row.category_description,
            }),
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: EntityId,
    payment_method: String,
    status: String,
    client_id: EntityId,
    created_by_id: EntityId,
    created_at: DateTime<Utc>,
    client_name: String,
    client_phone: String,
    creator_name: String,
}

#[derive(FromRow)]
struct OrderLineRow {
    id: EntityId,
    order_id: EntityId,
    item_id: EntityId,
    quantity: i32,
    description: String,
    unit_price: BigDecimal,
    category_id: EntityId,
    image: Option<String>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            item_id: row.item_id,
            quantity: row.quantity,
            item: Item {
                id: row.item_id,
                description: row.description,
                unit_price: row.unit_price,
                category_id: row.category_id,
                image: row.image,
                category: None,
            },
        }
    }
}

const ADDRESS_SELECT: &str = "SELECT a.id, a.street, a.number, a.district, a.city, a.state, \
     a.zip_code, r.id AS resident_id, r.name AS resident_name \
     FROM addresses a \
     LEFT JOIN users r ON r.address_id = a.id";

const USER_SELECT: &str = "SELECT u.id, u.name, u.email, u.phone, u.role, u.address_id, \
     a.street, a.number, a.district, a.city, a.state, a.zip_code \
     FROM users u JOIN addresses a ON a.id = u.address_id";

const ITEM_SELECT: &str = "SELECT i.id, i.description, i.unit_price, i.category_id, i.image, \
     c.description AS category_description \
     FROM items i JOIN categories c ON c.id = i.category_id";

const ORDER_SELECT: &str = "SELECT o.id, o.payment_method, o.status, o.client_id, \
     o.created_by_id, o.created_at, cl.name AS client_name, cl.phone AS client_phone, \
     cr.name AS creator_name \
     FROM orders o \
     JOIN users cl ON cl.id = o.client_id \
     JOIN users cr ON cr.id = o.created_by_id";

const ORDER_LINE_SELECT: &str = "SELECT ol.id, ol.order_id, ol.item_id, ol.quantity, \
     i.description, i.unit_price, i.category_id, i.image \
     FROM order_items ol JOIN items i ON i.id = ol.item_id \
     WHERE ol.order_id = ANY($1) ORDER BY ol.id";

// ---------------------------------------------------------------------------
// Shared helpers (take a connection so they work inside a transaction)
// ---------------------------------------------------------------------------

/// Lock the row for the rest of the transaction and report whether it exists
async fn lock_row(
    conn: &mut PgConnection,
    table: &'static str,
    id: EntityId,
    mode: &'static str,
) -> DeliveryResult<bool> {
    let sql = format!("SELECT id FROM {} WHERE id = $1 FOR {}", table, mode);
    let row: Option<(EntityId,)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage("Failed to lock row"))?;
    Ok(row.is_some())
}

async fn has_rows(
    conn: &mut PgConnection,
    sql: &'static str,
    id: EntityId,
) -> DeliveryResult<bool> {
    let (found,): (bool,) = sqlx::query_as(sql)
        .bind(id)
        .fetch_one(conn)
        .await
        .map_err(storage("Failed to check dependents"))?;
    Ok(found)
}

async fn load_address(conn: &mut PgConnection, id: EntityId) -> DeliveryResult<Option<Address>> {
    let sql = format!("{} WHERE a.id = $1", ADDRESS_SELECT);
    let row: Option<AddressRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage("Failed to get address"))?;
    Ok(row.map(Address::from))
}

async fn load_user(conn: &mut PgConnection, id: EntityId) -> DeliveryResult<Option<User>> {
    let sql = format!("{} WHERE u.id = $1", USER_SELECT);
    let row: Option<UserRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage("Failed to get user"))?;
    row.map(UserRow::into_user).transpose()
}

async fn load_item(conn: &mut PgConnection, id: EntityId) -> DeliveryResult<Option<Item>> {
    let sql = format!("{} WHERE i.id = $1", ITEM_SELECT);
    let row: Option<ItemRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage("Failed to get item"))?;
    Ok(row.map(Item::from))
}

/// Load orders with their projections and lines in two queries
async fn load_orders(
    conn: &mut PgConnection,
    id: Option<EntityId>,
    filter: OrderFilter,
) -> DeliveryResult<Vec<Order>> {
    let sql = format!(
        "{} WHERE ($1::BIGINT IS NULL OR o.id = $1) AND ($2::BIGINT IS NULL OR o.client_id = $2) \
         ORDER BY o.created_at DESC, o.id DESC",
        ORDER_SELECT
    );
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(filter.client_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(storage("Failed to list orders"))?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = rows.iter().map(|r| r.id.get()).collect();
    let lines: Vec<OrderLineRow> = sqlx::query_as(ORDER_LINE_SELECT)
        .bind(&order_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(storage("Failed to list order lines"))?;

    let mut by_order: HashMap<EntityId, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLine::from(line));
    }

    rows.into_iter()
        .map(|row| {
            Ok(Order {
                id: row.id,
                payment_method: parse_wire::<PaymentMethod>(
                    "orders.payment_method",
                    &row.payment_method,
                )?,
                status: parse_wire::<OrderStatus>("orders.status", &row.status)?,
                client_id: row.client_id,
                created_by_id: row.created_by_id,
                created_at: row.created_at,
                client: ClientRef {
                    id: row.client_id,
                    name: row.client_name,
                    phone: row.client_phone,
                },
                created_by: UserRef {
                    id: row.created_by_id,
                    name: row.creator_name,
                },
                order_items: by_order.remove(&row.id).unwrap_or_default(),
            })
        })
        .collect()
}

async fn load_order(conn: &mut PgConnection, id: EntityId) -> DeliveryResult<Option<Order>> {
    Ok(load_orders(conn, Some(id), OrderFilter::all())
        .await?
        .into_iter()
        .next())
}

fn read_back(entity: EntityKind, id: EntityId) -> DeliveryError {
    InternalError::Storage(format!("Failed to read back {} {}", entity, id)).into()
}

// ---------------------------------------------------------------------------
// PostgresGateway
// ---------------------------------------------------------------------------

/// Gateway backed by PostgreSQL
///
/// Identifiers come from `BIGSERIAL` sequences.
#[derive(Clone, Debug)]
pub struct PostgresGateway {
    pool: PgPool,
}

impl PostgresGateway {
    /// Create a new `PostgresGateway` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> DeliveryResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(storage("Failed to acquire connection"))
    }

    async fn begin(&self) -> DeliveryResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(storage("Failed to begin transaction"))
    }
}

async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> DeliveryResult<()> {
    tx.commit()
        .await
        .map_err(storage("Failed to commit transaction"))
}

#[async_trait]
impl CategoryService for PostgresGateway {
    async fn create_category(&self, input: NewCategory) -> DeliveryResult<Category> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (description) VALUES ($1) RETURNING id, description",
        )
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to create category"))?;
        Ok(row.into())
    }

    async fn get_category(&self, id: EntityId) -> DeliveryResult<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, description FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("Failed to get category"))?;
        Ok(row.map(Category::from))
    }

    async fn list_categories(&self) -> DeliveryResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, description FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(storage("Failed to list categories"))?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update_category(
        &self,
        id: EntityId,
        changes: CategoryChanges,
    ) -> DeliveryResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "UPDATE categories SET description = COALESCE($2, description) \
             WHERE id = $1 RETURNING id, description",
        )
        .bind(id)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to update category"))?;
        row.map(Category::from)
            .ok_or_else(|| NotFoundError::new(EntityKind::Category, id).into())
    }

    async fn delete_category(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "categories", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::Category, id).into());
        }
        if has_rows(
            &mut tx,
            "SELECT EXISTS (SELECT 1 FROM items WHERE category_id = $1)",
            id,
        )
        .await?
        {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Category,
                id,
                dependents: "items",
            }
            .into());
        }
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete category"))?;
        commit(tx).await
    }
}

#[async_trait]
impl AddressService for PostgresGateway {
    async fn create_address(&self, input: NewAddress) -> DeliveryResult<Address> {
        let mut conn = self.conn().await?;
        let id = insert_address(&mut conn, &input).await?;
        load_address(&mut conn, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Address, id))
    }

    async fn get_address(&self, id: EntityId) -> DeliveryResult<Option<Address>> {
        let mut conn = self.conn().await?;
        load_address(&mut conn, id).await
    }

    async fn list_addresses(&self) -> DeliveryResult<Vec<Address>> {
        let sql = format!("{} ORDER BY a.id", ADDRESS_SELECT);
        let rows: Vec<AddressRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list addresses"))?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn update_address(
        &self,
        id: EntityId,
        changes: AddressChanges,
    ) -> DeliveryResult<Address> {
        let mut conn = self.conn().await?;
        let result = sqlx::query(
            "UPDATE addresses SET \
             street = COALESCE($2, street), number = COALESCE($3, number), \
             district = COALESCE($4, district), city = COALESCE($5, city), \
             state = COALESCE($6, state), zip_code = COALESCE($7, zip_code) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.street)
        .bind(changes.number)
        .bind(changes.district)
        .bind(changes.city)
        .bind(changes.state)
        .bind(changes.zip_code)
        .execute(&mut *conn)
        .await
        .map_err(storage("Failed to update address"))?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError::new(EntityKind::Address, id).into());
        }
        load_address(&mut conn, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Address, id))
    }

    async fn delete_address(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "addresses", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::Address, id).into());
        }
        if has_rows(
            &mut tx,
            "SELECT EXISTS (SELECT 1 FROM users WHERE address_id = $1)",
            id,
        )
        .await?
        {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Address,
                id,
                dependents: "users",
            }
            .into());
        }
        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete address"))?;
        commit(tx).await
    }
}

async fn insert_address(conn: &mut PgConnection, input: &NewAddress) -> DeliveryResult<EntityId> {
    let (id,): (EntityId,) = sqlx::query_as(
        "INSERT INTO addresses (street, number, district, city, state, zip_code) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&input.street)
    .bind(&input.number)
    .bind(&input.district)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.zip_code)
    .fetch_one(conn)
    .await
    .map_err(storage("Failed to create address"))?;
    Ok(id)
}

#[async_trait]
impl UserService for PostgresGateway {
    async fn create_user_with_address(&self, input: NewUser) -> DeliveryResult<User> {
        let mut tx = self.begin().await?;
        let address_id = insert_address(&mut tx, &input.address).await?;
        let inserted: Result<(EntityId,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO users (name, email, phone, role, password_hash, address_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.role.as_str())
        .bind(&input.password_hash)
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await;

        // dropping the transaction rolls the address back
        let (id,) = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(ConflictError::DuplicateEmail { email: input.email }.into());
            }
            Err(e) => return Err(storage("Failed to create user")(e)),
        };
        let user = load_user(&mut tx, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::User, id))?;
        commit(tx).await?;
        tracing::debug!(user_id = %id, address_id = %address_id, "registered user");
        Ok(user)
    }

    async fn get_user(&self, id: EntityId) -> DeliveryResult<Option<User>> {
        let mut conn = self.conn().await?;
        load_user(&mut conn, id).await
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> DeliveryResult<Option<UserCredentials>> {
        let row: Option<CredentialsRow> = sqlx::query_as(
            "SELECT id, name, email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to look up user"))?;
        row.map(|r| {
            Ok(UserCredentials {
                id: r.id,
                name: r.name,
                email: r.email,
                role: parse_wire::<Role>("users.role", &r.role)?,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }

    async fn list_users(&self) -> DeliveryResult<Vec<User>> {
        let sql = format!("{} ORDER BY u.id", USER_SELECT);
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list users"))?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn update_user(&self, id: EntityId, changes: UserChanges) -> DeliveryResult<User> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "users", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::User, id).into());
        }
        if let Some(address_id) = changes.address_id {
            if !lock_row(&mut tx, "addresses", address_id, "SHARE").await? {
                return Err(
                    ReferenceError::new("addressId", EntityKind::Address, address_id).into(),
                );
            }
            let (held,): (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM users WHERE address_id = $1 AND id <> $2)",
            )
            .bind(address_id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("Failed to check address owner"))?;
            if held {
                return Err(ConflictError::AddressInUse { address_id }.into());
            }
        }

        let updated = sqlx::query(
            "UPDATE users SET \
             name = COALESCE($2, name), email = COALESCE($3, email), \
             phone = COALESCE($4, phone), role = COALESCE($5, role), \
             password_hash = COALESCE($6, password_hash), address_id = COALESCE($7, address_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email.as_deref())
        .bind(changes.phone)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.password_hash)
        .bind(changes.address_id)
        .execute(&mut *tx)
        .await;
        match updated {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                let email = changes.email.unwrap_or_default();
                return Err(user_conflict(&e, email, changes.address_id).into());
            }
            Err(e) => return Err(storage("Failed to update user")(e)),
        }

        let user = load_user(&mut tx, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::User, id))?;
        commit(tx).await?;
        Ok(user)
    }

    async fn delete_user(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "users", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::User, id).into());
        }
        if has_rows(
            &mut tx,
            "SELECT EXISTS (SELECT 1 FROM orders WHERE client_id = $1 OR created_by_id = $1)",
            id,
        )
        .await?
        {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::User,
                id,
                dependents: "orders",
            }
            .into());
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete user"))?;
        commit(tx).await
    }
}

#[async_trait]
impl ItemService for PostgresGateway {
    async fn create_item(&self, input: NewItem) -> DeliveryResult<Item> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "categories", input.category_id, "SHARE").await? {
            return Err(
                ReferenceError::new("categoryId", EntityKind::Category, input.category_id).into(),
            );
        }
        let (id,): (EntityId,) = sqlx::query_as(
            "INSERT INTO items (description, unit_price, category_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.description)
        .bind(&input.unit_price)
        .bind(input.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("Failed to create item"))?;
        let item = load_item(&mut tx, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Item, id))?;
        commit(tx).await?;
        Ok(item)
    }

    async fn get_item(&self, id: EntityId) -> DeliveryResult<Option<Item>> {
        let mut conn = self.conn().await?;
        load_item(&mut conn, id).await
    }

    async fn list_items(&self) -> DeliveryResult<Vec<Item>> {
        let sql = format!("{} ORDER BY i.id", ITEM_SELECT);
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list items"))?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn update_item(&self, id: EntityId, changes: ItemChanges) -> DeliveryResult<Item> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "items", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::Item, id).into());
        }
        if let Some(category_id) = changes.category_id {
            if !lock_row(&mut tx, "categories", category_id, "SHARE").await? {
                return Err(
                    ReferenceError::new("categoryId", EntityKind::Category, category_id).into(),
                );
            }
        }
        sqlx::query(
            "UPDATE items SET description = COALESCE($2, description), \
             unit_price = COALESCE($3, unit_price), category_id = COALESCE($4, category_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.description)
        .bind(changes.unit_price)
        .bind(changes.category_id)
        .execute(&mut *tx)
        .await
        .map_err(storage("Failed to update item"))?;
        let item = load_item(&mut tx, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Item, id))?;
        commit(tx).await?;
        Ok(item)
    }

    async fn set_item_image(&self, id: EntityId, image: String) -> DeliveryResult<Item> {
        let mut conn = self.conn().await?;
        let result = sqlx::query("UPDATE items SET image = $2 WHERE id = $1")
            .bind(id)
            .bind(&image)
            .execute(&mut *conn)
            .await
            .map_err(storage("Failed to set item image"))?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError::new(EntityKind::Item, id).into());
        }
        load_item(&mut conn, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Item, id))
    }

    async fn delete_item(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "items", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::Item, id).into());
        }
        if has_rows(
            &mut tx,
            "SELECT EXISTS (SELECT 1 FROM order_items WHERE item_id = $1)",
            id,
        )
        .await?
        {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Item,
                id,
                dependents: "order lines",
            }
            .into());
        }
        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete item"))?;
        commit(tx).await
    }
}

#[async_trait]
impl OrderService for PostgresGateway {
    async fn create_order_with_lines(&self, input: NewOrder) -> DeliveryResult<Order> {
        let mut tx = self.begin().await?;

        if !lock_row(&mut tx, "users", input.client_id, "SHARE").await? {
            return Err(ReferenceError::new("clientId", EntityKind::User, input.client_id).into());
        }
        if !lock_row(&mut tx, "users", input.created_by_id, "SHARE").await? {
            return Err(
                ReferenceError::new("createdById", EntityKind::User, input.created_by_id).into(),
            );
        }
        for item_id in workflow::referenced_items(&input) {
            if !lock_row(&mut tx, "items", item_id, "SHARE").await? {
                let index = input
                    .lines
                    .iter()
                    .position(|line| line.item_id == item_id)
                    .unwrap_or_default();
                return Err(ReferenceError::new(
                    format!("items[{}].itemId", index),
                    EntityKind::Item,
                    item_id,
                )
                .into());
            }
        }

        let (order_id,): (EntityId,) = sqlx::query_as(
            "INSERT INTO orders (payment_method, status, client_id, created_by_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(input.payment_method.as_str())
        .bind(input.status.as_str())
        .bind(input.client_id)
        .bind(input.created_by_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("Failed to create order"))?;

        for line in &input.lines {
            sqlx::query("INSERT INTO order_items (order_id, item_id, quantity) VALUES ($1, $2, $3)")
                .bind(order_id)
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await
                .map_err(storage("Failed to create order line"))?;
        }

        let order = load_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Order, order_id))?;
        commit(tx).await?;
        tracing::debug!(order_id = %order_id, lines = input.lines.len(), "created order");
        Ok(order)
    }

    async fn get_order(&self, id: EntityId) -> DeliveryResult<Option<Order>> {
        let mut conn = self.conn().await?;
        load_order(&mut conn, id).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> DeliveryResult<Vec<Order>> {
        let mut conn = self.conn().await?;
        load_orders(&mut conn, None, filter).await
    }

    async fn update_order(&self, id: EntityId, changes: OrderChanges) -> DeliveryResult<Order> {
        let mut tx = self.begin().await?;
        let current: Option<(String, String)> =
            sqlx::query_as("SELECT status, payment_method FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("Failed to lock order"))?;
        let (status, payment_method) =
            current.ok_or(NotFoundError::new(EntityKind::Order, id))?;
        workflow::check_update(
            parse_wire::<OrderStatus>("orders.status", &status)?,
            parse_wire::<PaymentMethod>("orders.payment_method", &payment_method)?,
            &changes,
        )?;

        sqlx::query(
            "UPDATE orders SET status = COALESCE($2, status), \
             payment_method = COALESCE($3, payment_method) WHERE id = $1",
        )
        .bind(id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.payment_method.map(|p| p.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(storage("Failed to update order"))?;

        let order = load_order(&mut tx, id)
            .await?
            .ok_or_else(|| read_back(EntityKind::Order, id))?;
        commit(tx).await?;
        Ok(order)
    }

    async fn delete_order(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tx = self.begin().await?;
        if !lock_row(&mut tx, "orders", id, "UPDATE").await? {
            return Err(NotFoundError::new(EntityKind::Order, id).into());
        }
        let lines = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete order lines"))?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("Failed to delete order"))?;
        commit(tx).await?;
        tracing::debug!(
            order_id = %id,
            lines = lines.rows_affected(),
            "deleted order and its lines"
        );
        Ok(())
    }
}
