//! Persistence gateway traits
//!
//! The gateway is the only component that reads or writes entities. It is
//! split per aggregate; [`Gateway`] bundles them so the server can hold a
//! single `Arc<dyn Gateway>` built at startup.
//!
//! Contract shared by every backend:
//! - `get_*` returns `Ok(None)` for a missing row; `update_*` and `delete_*`
//!   return `NotFound`
//! - a payload id that does not resolve is a `Reference` error and nothing
//!   is written
//! - composite operations (`create_user_with_address`,
//!   `create_order_with_lines`, `delete_order`) are all-or-nothing

use crate::core::entity::{
    Address, AddressChanges, Category, CategoryChanges, Item, ItemChanges, NewAddress,
    NewCategory, NewItem, NewOrder, NewUser, Order, OrderChanges, OrderFilter, User,
    UserChanges, UserCredentials,
};
use crate::core::error::DeliveryResult;
use crate::core::id::EntityId;
use async_trait::async_trait;

#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn create_category(&self, input: NewCategory) -> DeliveryResult<Category>;

    async fn get_category(&self, id: EntityId) -> DeliveryResult<Option<Category>>;

    async fn list_categories(&self) -> DeliveryResult<Vec<Category>>;

    async fn update_category(
        &self,
        id: EntityId,
        changes: CategoryChanges,
    ) -> DeliveryResult<Category>;

    /// Fails with a conflict while items belong to the category
    async fn delete_category(&self, id: EntityId) -> DeliveryResult<()>;
}

#[async_trait]
pub trait AddressService: Send + Sync {
    async fn create_address(&self, input: NewAddress) -> DeliveryResult<Address>;

    /// The address with its resident user projected as id and name
    async fn get_address(&self, id: EntityId) -> DeliveryResult<Option<Address>>;

    async fn list_addresses(&self) -> DeliveryResult<Vec<Address>>;

    async fn update_address(&self, id: EntityId, changes: AddressChanges)
    -> DeliveryResult<Address>;

    /// Fails with a conflict while a user lives at the address
    async fn delete_address(&self, id: EntityId) -> DeliveryResult<()>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// Store the address, then the user pointing at it, as one unit
    async fn create_user_with_address(&self, input: NewUser) -> DeliveryResult<User>;

    async fn get_user(&self, id: EntityId) -> DeliveryResult<Option<User>>;

    /// Lookup for login; `email` must already be normalized
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> DeliveryResult<Option<UserCredentials>>;

    async fn list_users(&self) -> DeliveryResult<Vec<User>>;

    async fn update_user(&self, id: EntityId, changes: UserChanges) -> DeliveryResult<User>;

    /// Fails with a conflict while orders reference the user
    async fn delete_user(&self, id: EntityId) -> DeliveryResult<()>;
}

#[async_trait]
pub trait ItemService: Send + Sync {
    async fn create_item(&self, input: NewItem) -> DeliveryResult<Item>;

    async fn get_item(&self, id: EntityId) -> DeliveryResult<Option<Item>>;

    async fn list_items(&self) -> DeliveryResult<Vec<Item>>;

    async fn update_item(&self, id: EntityId, changes: ItemChanges) -> DeliveryResult<Item>;

    /// Record the stored image reference on the item
    async fn set_item_image(&self, id: EntityId, image: String) -> DeliveryResult<Item>;

    /// Fails with a conflict while order lines reference the item
    async fn delete_item(&self, id: EntityId) -> DeliveryResult<()>;
}

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Store the order and all its lines as one unit
    async fn create_order_with_lines(&self, input: NewOrder) -> DeliveryResult<Order>;

    async fn get_order(&self, id: EntityId) -> DeliveryResult<Option<Order>>;

    /// Newest first
    async fn list_orders(&self, filter: OrderFilter) -> DeliveryResult<Vec<Order>>;

    /// Apply status/payment changes under the workflow's transition rules
    async fn update_order(&self, id: EntityId, changes: OrderChanges) -> DeliveryResult<Order>;

    /// Remove the lines, then the order, as one unit
    async fn delete_order(&self, id: EntityId) -> DeliveryResult<()>;
}

/// Every aggregate service behind one handle
pub trait Gateway:
    CategoryService + AddressService + UserService + ItemService + OrderService
{
}

impl<T> Gateway for T where
    T: CategoryService + AddressService + UserService + ItemService + OrderService
{
}
