//! In-memory gateway for tests, development and single-process deployments
//!
//! All tables live behind one `RwLock`. Every write takes the write lock
//! once, resolves every reference it depends on, and only then mutates, so
//! composite operations are all-or-nothing and no reader ever observes a
//! half-applied write.

use crate::core::entity::{
    Address, AddressChanges, Category, CategoryChanges, ClientRef, EntityKind, Item,
    ItemChanges, NewAddress, NewCategory, NewItem, NewOrder, NewUser, Order, OrderChanges,
    OrderFilter, OrderLine, OrderStatus, PaymentMethod, Role, User, UserChanges,
    UserCredentials, UserRef,
};
use crate::core::error::{
    ConflictError, DeliveryResult, InternalError, NotFoundError, ReferenceError,
};
use crate::core::id::EntityId;
use crate::core::service::{AddressService, CategoryService, ItemService, OrderService, UserService};
use crate::core::workflow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct UserRow {
    id: EntityId,
    name: String,
    email: String,
    phone: String,
    role: Role,
    password_hash: String,
    address_id: EntityId,
}

#[derive(Debug, Clone)]
struct OrderRow {
    id: EntityId,
    payment_method: PaymentMethod,
    status: OrderStatus,
    client_id: EntityId,
    created_by_id: EntityId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OrderLineRow {
    id: EntityId,
    order_id: EntityId,
    item_id: EntityId,
    quantity: i32,
}

#[derive(Debug, Default)]
struct Tables {
    sequences: HashMap<EntityKind, i64>,
    id_offset: i64,
    categories: BTreeMap<EntityId, Category>,
    addresses: BTreeMap<EntityId, Address>,
    users: BTreeMap<EntityId, UserRow>,
    items: BTreeMap<EntityId, Item>,
    orders: BTreeMap<EntityId, OrderRow>,
    order_lines: BTreeMap<EntityId, OrderLineRow>,
}

impl Tables {
    fn next_id(&mut self, kind: EntityKind) -> EntityId {
        let offset = self.id_offset;
        let counter = self.sequences.entry(kind).or_insert(offset);
        *counter += 1;
        EntityId::new(*counter)
    }

    fn resident_of(&self, address_id: EntityId) -> Option<UserRef> {
        self.users
            .values()
            .find(|u| u.address_id == address_id)
            .map(|u| UserRef {
                id: u.id,
                name: u.name.clone(),
            })
    }

    fn address_view(&self, address: &Address) -> Address {
        Address {
            user: self.resident_of(address.id),
            ..address.clone()
        }
    }

    fn user_view(&self, row: &UserRow) -> User {
        User {
            id: row.id,
            name: row.name.clone(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            role: row.role,
            address_id: row.address_id,
            address: self.addresses.get(&row.address_id).cloned(),
        }
    }

    fn item_view(&self, item: &Item) -> Item {
        Item {
            category: self.categories.get(&item.category_id).cloned(),
            ..item.clone()
        }
    }

    fn order_view(&self, row: &OrderRow) -> DeliveryResult<Order> {
        let client = self
            .users
            .get(&row.client_id)
            .ok_or_else(|| dangling("order client", row.client_id))?;
        let creator = self
            .users
            .get(&row.created_by_id)
            .ok_or_else(|| dangling("order creator", row.created_by_id))?;

        let order_items = self
            .order_lines
            .values()
            .filter(|line| line.order_id == row.id)
            .map(|line| {
                let item = self
                    .items
                    .get(&line.item_id)
                    .ok_or_else(|| dangling("order line item", line.item_id))?;
                Ok(OrderLine {
                    id: line.id,
                    order_id: line.order_id,
                    item_id: line.item_id,
                    quantity: line.quantity,
                    item: item.clone(),
                })
            })
            .collect::<DeliveryResult<Vec<_>>>()?;

        Ok(Order {
            id: row.id,
            payment_method: row.payment_method,
            status: row.status,
            client_id: row.client_id,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            client: ClientRef {
                id: client.id,
                name: client.name.clone(),
                phone: client.phone.clone(),
            },
            created_by: UserRef {
                id: creator.id,
                name: creator.name.clone(),
            },
            order_items,
        })
    }

    fn email_taken(&self, email: &str, except: Option<EntityId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    /// An address belongs to at most one user
    fn address_held_by_other(&self, address_id: EntityId, user_id: EntityId) -> bool {
        self.users
            .values()
            .any(|u| u.address_id == address_id && u.id != user_id)
    }

    fn insert_address(&mut self, input: NewAddress) -> Address {
        let id = self.next_id(EntityKind::Address);
        let address = Address {
            id,
            street: input.street,
            number: input.number,
            district: input.district,
            city: input.city,
            state: input.state,
            zip_code: input.zip_code,
            user: None,
        };
        self.addresses.insert(id, address.clone());
        address
    }
}

fn dangling(what: &str, id: EntityId) -> InternalError {
    InternalError::Storage(format!("{} {} is missing", what, id))
}

/// In-memory implementation of every gateway service
///
/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every id sequence after `offset`
    ///
    /// Handy for exercising ids beyond the 32-bit and 53-bit ranges.
    pub fn with_id_offset(offset: i64) -> Self {
        let tables = Tables {
            id_offset: offset,
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    fn read(&self) -> DeliveryResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| InternalError::Lock(format!("Failed to acquire read lock: {}", e)).into())
    }

    fn write(&self) -> DeliveryResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| InternalError::Lock(format!("Failed to acquire write lock: {}", e)).into())
    }
}

#[async_trait]
impl CategoryService for InMemoryGateway {
    async fn create_category(&self, input: NewCategory) -> DeliveryResult<Category> {
        let mut tables = self.write()?;
        let id = tables.next_id(EntityKind::Category);
        let category = Category {
            id,
            description: input.description,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: EntityId) -> DeliveryResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> DeliveryResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn update_category(
        &self,
        id: EntityId,
        changes: CategoryChanges,
    ) -> DeliveryResult<Category> {
        let mut tables = self.write()?;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::Category, id))?;
        if let Some(description) = changes.description {
            category.description = description;
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&id) {
            return Err(NotFoundError::new(EntityKind::Category, id).into());
        }
        if tables.items.values().any(|item| item.category_id == id) {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Category,
                id,
                dependents: "items",
            }
            .into());
        }
        tables.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AddressService for InMemoryGateway {
    async fn create_address(&self, input: NewAddress) -> DeliveryResult<Address> {
        Ok(self.write()?.insert_address(input))
    }

    async fn get_address(&self, id: EntityId) -> DeliveryResult<Option<Address>> {
        let tables = self.read()?;
        Ok(tables.addresses.get(&id).map(|a| tables.address_view(a)))
    }

    async fn list_addresses(&self) -> DeliveryResult<Vec<Address>> {
        let tables = self.read()?;
        Ok(tables
            .addresses
            .values()
            .map(|a| tables.address_view(a))
            .collect())
    }

    async fn update_address(
        &self,
        id: EntityId,
        changes: AddressChanges,
    ) -> DeliveryResult<Address> {
        let mut tables = self.write()?;
        let address = tables
            .addresses
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::Address, id))?;
        if let Some(street) = changes.street {
            address.street = street;
        }
        if let Some(number) = changes.number {
            address.number = number;
        }
        if let Some(district) = changes.district {
            address.district = district;
        }
        if let Some(city) = changes.city {
            address.city = city;
        }
        if let Some(state) = changes.state {
            address.state = state;
        }
        if let Some(zip_code) = changes.zip_code {
            address.zip_code = zip_code;
        }
        let updated = address.clone();
        Ok(tables.address_view(&updated))
    }

    async fn delete_address(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tables = self.write()?;
        if !tables.addresses.contains_key(&id) {
            return Err(NotFoundError::new(EntityKind::Address, id).into());
        }
        if tables.users.values().any(|u| u.address_id == id) {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Address,
                id,
                dependents: "users",
            }
            .into());
        }
        tables.addresses.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserService for InMemoryGateway {
    async fn create_user_with_address(&self, input: NewUser) -> DeliveryResult<User> {
        let mut tables = self.write()?;
        if tables.email_taken(&input.email, None) {
            return Err(ConflictError::DuplicateEmail { email: input.email }.into());
        }

        let address = tables.insert_address(input.address);
        let id = tables.next_id(EntityKind::User);
        let row = UserRow {
            id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            role: input.role,
            password_hash: input.password_hash,
            address_id: address.id,
        };
        tables.users.insert(id, row.clone());
        tracing::debug!(user_id = %id, address_id = %address.id, "registered user");
        Ok(tables.user_view(&row))
    }

    async fn get_user(&self, id: EntityId) -> DeliveryResult<Option<User>> {
        let tables = self.read()?;
        Ok(tables.users.get(&id).map(|u| tables.user_view(u)))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> DeliveryResult<Option<UserCredentials>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| UserCredentials {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                role: u.role,
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn list_users(&self) -> DeliveryResult<Vec<User>> {
        let tables = self.read()?;
        Ok(tables.users.values().map(|u| tables.user_view(u)).collect())
    }

    async fn update_user(&self, id: EntityId, changes: UserChanges) -> DeliveryResult<User> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&id) {
            return Err(NotFoundError::new(EntityKind::User, id).into());
        }
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(ConflictError::DuplicateEmail {
                    email: email.clone(),
                }
                .into());
            }
        }
        if let Some(address_id) = changes.address_id {
            if !tables.addresses.contains_key(&address_id) {
                return Err(
                    ReferenceError::new("addressId", EntityKind::Address, address_id).into(),
                );
            }
            if tables.address_held_by_other(address_id, id) {
                return Err(ConflictError::AddressInUse { address_id }.into());
            }
        }

        let row = tables
            .users
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::User, id))?;
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(email) = changes.email {
            row.email = email;
        }
        if let Some(phone) = changes.phone {
            row.phone = phone;
        }
        if let Some(role) = changes.role {
            row.role = role;
        }
        if let Some(password_hash) = changes.password_hash {
            row.password_hash = password_hash;
        }
        if let Some(address_id) = changes.address_id {
            row.address_id = address_id;
        }
        let updated = row.clone();
        Ok(tables.user_view(&updated))
    }

    async fn delete_user(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&id) {
            return Err(NotFoundError::new(EntityKind::User, id).into());
        }
        if tables
            .orders
            .values()
            .any(|o| o.client_id == id || o.created_by_id == id)
        {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::User,
                id,
                dependents: "orders",
            }
            .into());
        }
        tables.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ItemService for InMemoryGateway {
    async fn create_item(&self, input: NewItem) -> DeliveryResult<Item> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&input.category_id) {
            return Err(
                ReferenceError::new("categoryId", EntityKind::Category, input.category_id).into(),
            );
        }
        let id = tables.next_id(EntityKind::Item);
        let item = Item {
            id,
            description: input.description,
            unit_price: input.unit_price,
            category_id: input.category_id,
            image: None,
            category: None,
        };
        tables.items.insert(id, item.clone());
        Ok(tables.item_view(&item))
    }

    async fn get_item(&self, id: EntityId) -> DeliveryResult<Option<Item>> {
        let tables = self.read()?;
        Ok(tables.items.get(&id).map(|i| tables.item_view(i)))
    }

    async fn list_items(&self) -> DeliveryResult<Vec<Item>> {
        let tables = self.read()?;
        Ok(tables.items.values().map(|i| tables.item_view(i)).collect())
    }

    async fn update_item(&self, id: EntityId, changes: ItemChanges) -> DeliveryResult<Item> {
        let mut tables = self.write()?;
        if let Some(category_id) = changes.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(
                    ReferenceError::new("categoryId", EntityKind::Category, category_id).into(),
                );
            }
        }
        let item = tables
            .items
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::Item, id))?;
        if let Some(description) = changes.description {
            item.description = description;
        }
        if let Some(unit_price) = changes.unit_price {
            item.unit_price = unit_price;
        }
        if let Some(category_id) = changes.category_id {
            item.category_id = category_id;
        }
        let updated = item.clone();
        Ok(tables.item_view(&updated))
    }

    async fn set_item_image(&self, id: EntityId, image: String) -> DeliveryResult<Item> {
        let mut tables = self.write()?;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::Item, id))?;
        item.image = Some(image);
        let updated = item.clone();
        Ok(tables.item_view(&updated))
    }

    async fn delete_item(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tables = self.write()?;
        if !tables.items.contains_key(&id) {
            return Err(NotFoundError::new(EntityKind::Item, id).into());
        }
        if tables.order_lines.values().any(|line| line.item_id == id) {
            return Err(ConflictError::HasDependents {
                entity: EntityKind::Item,
                id,
                dependents: "order lines",
            }
            .into());
        }
        tables.items.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderService for InMemoryGateway {
    async fn create_order_with_lines(&self, input: NewOrder) -> DeliveryResult<Order> {
        let mut tables = self.write()?;

        // resolve everything before the first insert
        if !tables.users.contains_key(&input.client_id) {
            return Err(ReferenceError::new("clientId", EntityKind::User, input.client_id).into());
        }
        if !tables.users.contains_key(&input.created_by_id) {
            return Err(
                ReferenceError::new("createdById", EntityKind::User, input.created_by_id).into(),
            );
        }
        for (index, line) in input.lines.iter().enumerate() {
            if !tables.items.contains_key(&line.item_id) {
                return Err(ReferenceError::new(
                    format!("items[{}].itemId", index),
                    EntityKind::Item,
                    line.item_id,
                )
                .into());
            }
        }

        let order_id = tables.next_id(EntityKind::Order);
        let row = OrderRow {
            id: order_id,
            payment_method: input.payment_method,
            status: input.status,
            client_id: input.client_id,
            created_by_id: input.created_by_id,
            created_at: Utc::now(),
        };
        tables.orders.insert(order_id, row.clone());
        for line in &input.lines {
            let line_id = tables.next_id(EntityKind::OrderLine);
            tables.order_lines.insert(
                line_id,
                OrderLineRow {
                    id: line_id,
                    order_id,
                    item_id: line.item_id,
                    quantity: line.quantity,
                },
            );
        }
        tracing::debug!(order_id = %order_id, lines = input.lines.len(), "created order");
        tables.order_view(&row)
    }

    async fn get_order(&self, id: EntityId) -> DeliveryResult<Option<Order>> {
        let tables = self.read()?;
        tables.orders.get(&id).map(|o| tables.order_view(o)).transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> DeliveryResult<Vec<Order>> {
        let tables = self.read()?;
        let mut rows: Vec<&OrderRow> = tables
            .orders
            .values()
            .filter(|o| filter.client_id.is_none_or(|client| o.client_id == client))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.into_iter().map(|o| tables.order_view(o)).collect()
    }

    async fn update_order(&self, id: EntityId, changes: OrderChanges) -> DeliveryResult<Order> {
        let mut tables = self.write()?;
        let row = tables
            .orders
            .get_mut(&id)
            .ok_or(NotFoundError::new(EntityKind::Order, id))?;
        workflow::check_update(row.status, row.payment_method, &changes)?;
        if let Some(status) = changes.status {
            row.status = status;
        }
        if let Some(payment_method) = changes.payment_method {
            row.payment_method = payment_method;
        }
        let updated = row.clone();
        tables.order_view(&updated)
    }

    async fn delete_order(&self, id: EntityId) -> DeliveryResult<()> {
        let mut tables = self.write()?;
        if tables.orders.remove(&id).is_none() {
            return Err(NotFoundError::new(EntityKind::Order, id).into());
        }
        tables.order_lines.retain(|_, line| line.order_id != id);
        tracing::debug!(order_id = %id, "deleted order and its lines");
        Ok(())
    }
}
