//! Macro-generated conformance suite for `Gateway` implementations
//!
//! The `gateway_tests!` macro generates a test module that checks a backend
//! against the full gateway contract: CRUD for every record, reference
//! checks, dependent-row protection, the atomic composite writes, the order
//! workflow and concurrent order placement.
//!
//! # Generated Tests
//!
//! ## Catalog
//! - `test_category_crud`: create, read, list, update, delete
//! - `test_category_with_items_cannot_be_deleted`
//! - `test_item_requires_existing_category`
//! - `test_item_image_and_partial_update`
//!
//! ## Users
//! - `test_user_is_created_with_its_address`
//! - `test_duplicate_email_creates_nothing`
//! - `test_credentials_lookup`
//! - `test_user_update_checks_address_and_email`: references, duplicate
//!   email, an address already held by another user
//! - `test_address_in_use_cannot_be_deleted`
//!
//! ## Orders
//! - `test_order_is_created_with_all_lines`
//! - `test_order_with_unknown_item_creates_nothing`
//! - `test_order_listing_is_newest_first_and_filterable`
//! - `test_order_status_moves_forward_only`
//! - `test_payment_is_locked_after_pending`
//! - `test_deleting_an_order_removes_its_lines`
//! - `test_ordered_item_and_client_are_protected`
//! - `test_concurrent_orders`

/// Generate a full `Gateway` conformance test suite.
///
/// `$factory` must evaluate to a fresh, empty gateway. It is re-evaluated
/// for each test. For the concurrency test the gateway must also be
/// `Clone + 'static`.
#[macro_export]
macro_rules! gateway_tests {
    ($factory:expr) => {
        mod gateway_contract_tests {
            use super::*;
            use delivery::core::entity::{
                AddressChanges, CategoryChanges, EntityKind, ItemChanges, NewItem,
                OrderChanges, OrderFilter, OrderStatus, PaymentMethod, Role, UserChanges,
            };
            use delivery::core::error::{DeliveryError, ReferenceError};
            use delivery::core::id::EntityId;
            use delivery::core::service::{
                AddressService, CategoryService, ItemService, OrderService, UserService,
            };

            const MISSING: EntityId = EntityId::new(999_999);

            // ==================================================================
            // Catalog
            // ==================================================================

            #[tokio::test]
            async fn test_category_crud() {
                let gateway = $factory;
                assert!(gateway.list_categories().await.unwrap().is_empty());

                let pizzas = seed_category(&gateway, "Pizzas").await;
                let drinks = seed_category(&gateway, "Drinks").await;
                assert_ne!(pizzas.id, drinks.id);

                let fetched = gateway.get_category(pizzas.id).await.unwrap();
                assert_eq!(fetched, Some(pizzas.clone()));

                let renamed = gateway
                    .update_category(
                        pizzas.id,
                        CategoryChanges {
                            description: Some("Pizzas & Calzones".into()),
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(renamed.description, "Pizzas & Calzones");

                let untouched = gateway
                    .update_category(drinks.id, CategoryChanges::default())
                    .await
                    .unwrap();
                assert_eq!(untouched, drinks);

                gateway.delete_category(drinks.id).await.unwrap();
                assert!(gateway.get_category(drinks.id).await.unwrap().is_none());
                assert_eq!(gateway.list_categories().await.unwrap(), vec![renamed]);

                assert_code(gateway.delete_category(drinks.id).await, "NOT_FOUND");
                assert_code(
                    gateway
                        .update_category(MISSING, CategoryChanges::default())
                        .await,
                    "NOT_FOUND",
                );
            }

            #[tokio::test]
            async fn test_category_with_items_cannot_be_deleted() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Burgers").await;
                let item = seed_item(&gateway, &category, "Cheeseburger", "22.90").await;

                assert_code(gateway.delete_category(category.id).await, "HAS_DEPENDENTS");
                assert!(gateway.get_category(category.id).await.unwrap().is_some());

                gateway.delete_item(item.id).await.unwrap();
                gateway.delete_category(category.id).await.unwrap();
            }

            #[tokio::test]
            async fn test_item_requires_existing_category() {
                let gateway = $factory;
                let result = gateway
                    .create_item(NewItem {
                        description: "Orphan".into(),
                        unit_price: price("1.00"),
                        category_id: MISSING,
                    })
                    .await;
                match result {
                    Err(DeliveryError::Reference(ReferenceError { field, entity, id })) => {
                        assert_eq!(field, "categoryId");
                        assert_eq!(entity, EntityKind::Category);
                        assert_eq!(id, MISSING);
                    }
                    other => panic!("expected a reference error, got {:?}", other),
                }
                assert!(gateway.list_items().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_item_image_and_partial_update() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Desserts").await;
                let other = seed_category(&gateway, "Sweets").await;
                let item = seed_item(&gateway, &category, "Brownie", "9.5").await;
                assert_eq!(item.unit_price, price("9.50"));
                assert_eq!(item.image, None);
                assert_eq!(item.category.as_ref().map(|c| c.id), Some(category.id));

                let with_image = gateway
                    .set_item_image(item.id, "1700000000000-abc.png".into())
                    .await
                    .unwrap();
                assert_eq!(with_image.image.as_deref(), Some("1700000000000-abc.png"));

                let moved = gateway
                    .update_item(
                        item.id,
                        ItemChanges {
                            category_id: Some(other.id),
                            ..ItemChanges::default()
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(moved.category_id, other.id);
                assert_eq!(moved.description, "Brownie");
                assert_eq!(moved.image.as_deref(), Some("1700000000000-abc.png"));

                assert_code(
                    gateway
                        .update_item(
                            item.id,
                            ItemChanges {
                                category_id: Some(MISSING),
                                ..ItemChanges::default()
                            },
                        )
                        .await,
                    "REFERENCE_NOT_FOUND",
                );
                assert_code(
                    gateway.set_item_image(MISSING, "x.png".into()).await,
                    "NOT_FOUND",
                );
            }

            // ==================================================================
            // Users and addresses
            // ==================================================================

            #[tokio::test]
            async fn test_user_is_created_with_its_address() {
                let gateway = $factory;
                let user = seed_user(&gateway, "Ana Souza", Role::Client).await;

                let address = user.address.clone().expect("user view carries its address");
                assert_eq!(address.id, user.address_id);
                assert_eq!(address.street, "Rua Ana Souza");

                let stored = gateway.get_address(user.address_id).await.unwrap().unwrap();
                let resident = stored.user.expect("address view carries its resident");
                assert_eq!(resident.id, user.id);
                assert_eq!(resident.name, "Ana Souza");

                assert_eq!(gateway.get_user(user.id).await.unwrap(), Some(user.clone()));
                assert_eq!(gateway.list_users().await.unwrap().len(), 1);
                assert_eq!(gateway.list_addresses().await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_duplicate_email_creates_nothing() {
                let gateway = $factory;
                seed_user(&gateway, "Ana", Role::Client).await;

                let again = gateway
                    .create_user_with_address(new_user(
                        "Other Ana",
                        "ana@example.com",
                        Role::Client,
                    ))
                    .await;
                assert_code(again, "DUPLICATE_EMAIL");

                assert_eq!(gateway.list_users().await.unwrap().len(), 1);
                assert_eq!(
                    gateway.list_addresses().await.unwrap().len(),
                    1,
                    "the address of a rejected user must not be kept"
                );
            }

            #[tokio::test]
            async fn test_credentials_lookup() {
                let gateway = $factory;
                let user = seed_user(&gateway, "Bruno", Role::Admin).await;

                let credentials = gateway
                    .find_credentials_by_email("bruno@example.com")
                    .await
                    .unwrap()
                    .expect("credentials for a registered email");
                assert_eq!(credentials.id, user.id);
                assert_eq!(credentials.role, Role::Admin);
                assert!(credentials.password_hash.starts_with("$2b$"));

                assert!(
                    gateway
                        .find_credentials_by_email("nobody@example.com")
                        .await
                        .unwrap()
                        .is_none()
                );
            }

            #[tokio::test]
            async fn test_user_update_checks_address_and_email() {
                let gateway = $factory;
                let ana = seed_user(&gateway, "Ana", Role::Client).await;
                let bia = seed_user(&gateway, "Bia", Role::Client).await;

                assert_code(
                    gateway
                        .update_user(
                            ana.id,
                            UserChanges {
                                email: Some("bia@example.com".into()),
                                ..UserChanges::default()
                            },
                        )
                        .await,
                    "DUPLICATE_EMAIL",
                );
                assert_code(
                    gateway
                        .update_user(
                            ana.id,
                            UserChanges {
                                address_id: Some(MISSING),
                                ..UserChanges::default()
                            },
                        )
                        .await,
                    "REFERENCE_NOT_FOUND",
                );

                assert_code(
                    gateway
                        .update_user(
                            ana.id,
                            UserChanges {
                                name: Some("Ana Lima".into()),
                                address_id: Some(bia.address_id),
                                ..UserChanges::default()
                            },
                        )
                        .await,
                    "ADDRESS_IN_USE",
                );
                let bias_address = gateway.get_address(bia.address_id).await.unwrap().unwrap();
                assert_eq!(bias_address.user.map(|u| u.id), Some(bia.id));
                assert_eq!(gateway.get_user(ana.id).await.unwrap().unwrap().name, "Ana");

                let kept = gateway
                    .update_user(
                        ana.id,
                        UserChanges {
                            address_id: Some(ana.address_id),
                            ..UserChanges::default()
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(kept.address_id, ana.address_id);

                let spare = gateway.create_address(new_address("Rua Nova")).await.unwrap();
                let updated = gateway
                    .update_user(
                        ana.id,
                        UserChanges {
                            name: Some("Ana Lima".into()),
                            role: Some(Role::Admin),
                            address_id: Some(spare.id),
                            ..UserChanges::default()
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(updated.name, "Ana Lima");
                assert_eq!(updated.role, Role::Admin);
                assert_eq!(updated.address_id, spare.id);
                assert_eq!(updated.email, "ana@example.com");

                assert_code(
                    gateway.update_user(MISSING, UserChanges::default()).await,
                    "NOT_FOUND",
                );
            }

            #[tokio::test]
            async fn test_address_in_use_cannot_be_deleted() {
                let gateway = $factory;
                let user = seed_user(&gateway, "Caio", Role::Client).await;

                assert_code(gateway.delete_address(user.address_id).await, "HAS_DEPENDENTS");

                let spare = gateway.create_address(new_address("Rua Nova")).await.unwrap();
                assert!(spare.user.is_none());
                let edited = gateway
                    .update_address(
                        spare.id,
                        AddressChanges {
                            number: Some("42A".into()),
                            ..AddressChanges::default()
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(edited.number, "42A");
                assert_eq!(edited.street, "Rua Nova");

                gateway.delete_address(spare.id).await.unwrap();
                assert!(gateway.get_address(spare.id).await.unwrap().is_none());

                gateway.delete_user(user.id).await.unwrap();
                assert!(gateway.get_user(user.id).await.unwrap().is_none());
                assert!(
                    gateway.get_address(user.address_id).await.unwrap().is_some(),
                    "deleting a user keeps the address"
                );
                gateway.delete_address(user.address_id).await.unwrap();
            }

            // ==================================================================
            // Orders
            // ==================================================================

            #[tokio::test]
            async fn test_order_is_created_with_all_lines() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let margherita = seed_item(&gateway, &category, "Margherita", "40.00").await;
                let soda = seed_item(&gateway, &category, "Soda", "6.50").await;
                let client = seed_user(&gateway, "Dani", Role::Client).await;

                let order = seed_order(&gateway, &client, &[(&margherita, 2), (&soda, 3)]).await;
                assert_eq!(order.status, OrderStatus::Pending);
                assert_eq!(order.payment_method, PaymentMethod::Pix);
                assert_eq!(order.client.id, client.id);
                assert_eq!(order.client.phone, client.phone);
                assert_eq!(order.created_by.id, client.id);
                assert_eq!(order.order_items.len(), 2);

                let mut lines: Vec<(EntityId, i32)> = order
                    .order_items
                    .iter()
                    .map(|line| {
                        assert_eq!(line.order_id, order.id);
                        assert_eq!(line.item.id, line.item_id);
                        (line.item_id, line.quantity)
                    })
                    .collect();
                lines.sort();
                let mut expected = vec![(margherita.id, 2), (soda.id, 3)];
                expected.sort();
                assert_eq!(lines, expected);

                let total = delivery::core::workflow::order_total(&order);
                assert_eq!(total, price("99.50"));

                assert_eq!(gateway.get_order(order.id).await.unwrap(), Some(order));
            }

            #[tokio::test]
            async fn test_order_with_unknown_item_creates_nothing() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Calabresa", "38.00").await;
                let client = seed_user(&gateway, "Edu", Role::Client).await;

                let mut input = new_order(&client, &[(&item, 1)]);
                input.lines.push(delivery::core::entity::NewOrderLine {
                    item_id: MISSING,
                    quantity: 1,
                });
                match gateway.create_order_with_lines(input).await {
                    Err(DeliveryError::Reference(ReferenceError { field, .. })) => {
                        assert_eq!(field, "items[1].itemId");
                    }
                    other => panic!("expected a reference error, got {:?}", other),
                }
                assert!(gateway.list_orders(OrderFilter::all()).await.unwrap().is_empty());

                let mut input = new_order(&client, &[(&item, 1)]);
                input.client_id = MISSING;
                assert_code(gateway.create_order_with_lines(input).await, "REFERENCE_NOT_FOUND");
                assert!(gateway.list_orders(OrderFilter::all()).await.unwrap().is_empty());

                // the item is still free to delete: no line was left behind
                gateway.delete_item(item.id).await.unwrap();
            }

            #[tokio::test]
            async fn test_order_listing_is_newest_first_and_filterable() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Portuguesa", "42.00").await;
                let fabi = seed_user(&gateway, "Fabi", Role::Client).await;
                let gabi = seed_user(&gateway, "Gabi", Role::Client).await;

                let first = seed_order(&gateway, &fabi, &[(&item, 1)]).await;
                let second = seed_order(&gateway, &gabi, &[(&item, 2)]).await;
                let third = seed_order(&gateway, &fabi, &[(&item, 3)]).await;

                let all: Vec<EntityId> = gateway
                    .list_orders(OrderFilter::all())
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|o| o.id)
                    .collect();
                assert_eq!(all, vec![third.id, second.id, first.id]);

                let fabis: Vec<EntityId> = gateway
                    .list_orders(OrderFilter::for_client(fabi.id))
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|o| o.id)
                    .collect();
                assert_eq!(fabis, vec![third.id, first.id]);
            }

            #[tokio::test]
            async fn test_order_status_moves_forward_only() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Napolitana", "39.00").await;
                let client = seed_user(&gateway, "Hugo", Role::Client).await;
                let order = seed_order(&gateway, &client, &[(&item, 1)]).await;

                let same = gateway
                    .update_order(
                        order.id,
                        OrderChanges {
                            status: Some(OrderStatus::Pending),
                            payment_method: None,
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(same.status, OrderStatus::Pending);

                let done = gateway
                    .update_order(
                        order.id,
                        OrderChanges {
                            status: Some(OrderStatus::Completed),
                            payment_method: None,
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(done.status, OrderStatus::Completed);

                assert_code(
                    gateway
                        .update_order(
                            order.id,
                            OrderChanges {
                                status: Some(OrderStatus::Cancelled),
                                payment_method: None,
                            },
                        )
                        .await,
                    "INVALID_STATUS_TRANSITION",
                );
                assert_code(
                    gateway
                        .update_order(
                            order.id,
                            OrderChanges {
                                status: Some(OrderStatus::Pending),
                                payment_method: None,
                            },
                        )
                        .await,
                    "INVALID_STATUS_TRANSITION",
                );
                let stored = gateway.get_order(order.id).await.unwrap().unwrap();
                assert_eq!(stored.status, OrderStatus::Completed);

                assert_code(
                    gateway.update_order(MISSING, OrderChanges::default()).await,
                    "NOT_FOUND",
                );
            }

            #[tokio::test]
            async fn test_payment_is_locked_after_pending() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Quatro Queijos", "45.00").await;
                let client = seed_user(&gateway, "Iara", Role::Client).await;
                let order = seed_order(&gateway, &client, &[(&item, 1)]).await;

                let switched = gateway
                    .update_order(
                        order.id,
                        OrderChanges {
                            status: None,
                            payment_method: Some(PaymentMethod::Cash),
                        },
                    )
                    .await
                    .unwrap();
                assert_eq!(switched.payment_method, PaymentMethod::Cash);

                gateway
                    .update_order(
                        order.id,
                        OrderChanges {
                            status: Some(OrderStatus::Cancelled),
                            payment_method: None,
                        },
                    )
                    .await
                    .unwrap();

                assert_code(
                    gateway
                        .update_order(
                            order.id,
                            OrderChanges {
                                status: None,
                                payment_method: Some(PaymentMethod::Credit),
                            },
                        )
                        .await,
                    "PAYMENT_LOCKED",
                );

                // restating the current method is not a change
                gateway
                    .update_order(
                        order.id,
                        OrderChanges {
                            status: None,
                            payment_method: Some(PaymentMethod::Cash),
                        },
                    )
                    .await
                    .unwrap();
            }

            #[tokio::test]
            async fn test_deleting_an_order_removes_its_lines() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Frango", "41.00").await;
                let client = seed_user(&gateway, "João", Role::Client).await;
                let order = seed_order(&gateway, &client, &[(&item, 2)]).await;

                gateway.delete_order(order.id).await.unwrap();
                assert!(gateway.get_order(order.id).await.unwrap().is_none());
                assert_code(gateway.delete_order(order.id).await, "NOT_FOUND");

                // with its lines gone, nothing references the item or the client
                gateway.delete_item(item.id).await.unwrap();
                gateway.delete_user(client.id).await.unwrap();
            }

            #[tokio::test]
            async fn test_ordered_item_and_client_are_protected() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Atum", "43.00").await;
                let client = seed_user(&gateway, "Kaio", Role::Client).await;
                seed_order(&gateway, &client, &[(&item, 1)]).await;

                assert_code(gateway.delete_item(item.id).await, "HAS_DEPENDENTS");
                assert_code(gateway.delete_user(client.id).await, "HAS_DEPENDENTS");
                assert!(gateway.get_item(item.id).await.unwrap().is_some());
                assert!(gateway.get_user(client.id).await.unwrap().is_some());
            }

            #[tokio::test]
            async fn test_concurrent_orders() {
                let gateway = $factory;
                let category = seed_category(&gateway, "Pizzas").await;
                let item = seed_item(&gateway, &category, "Mussarela", "35.00").await;
                let client = seed_user(&gateway, "Lia", Role::Client).await;

                let mut handles = Vec::new();
                for quantity in 1..=8 {
                    let gateway = gateway.clone();
                    let input = new_order(&client, &[(&item, quantity)]);
                    handles.push(tokio::spawn(async move {
                        gateway.create_order_with_lines(input).await
                    }));
                }
                for handle in handles {
                    let order = handle.await.unwrap().unwrap();
                    assert_eq!(order.order_items.len(), 1);
                }

                let orders = gateway.list_orders(OrderFilter::all()).await.unwrap();
                assert_eq!(orders.len(), 8);
                let mut ids: Vec<EntityId> = orders.iter().map(|o| o.id).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), 8);
            }
        }
    };
}
