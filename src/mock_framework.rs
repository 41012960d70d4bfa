//! # Mock Framework
//!
//! Utilities for testing clients and workflows in isolation.
//!
//! Use [`create_mock_client`] or [`create_mock_order_client`] to get a client
//! and the receiving end of its channel, then helpers like [`expect_create`]
//! or [`expect_order_request`] to assert what was sent and to answer it.
//! [`expect_no_request`] checks that a guard stopped a call from going out.

use chrono::{Duration, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Credentials, Entity, ResourceClient, ResourceRequest};
use crate::clients::OrderClient;
use crate::domain::{Account, Role};
use crate::error::ApiError;
use crate::messages::OrderRequest;
use crate::session::{MemoryTokenStore, Session};
use crate::token::TokenCodec;

pub const TEST_SECRET: &str = "mock-framework-secret";

pub type Responder<T> = oneshot::Sender<Result<T, ApiError>>;

/// Creates a mock client and a receiver for asserting requests.
pub fn create_mock_client<T: Entity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub fn create_mock_order_client(buffer_size: usize) -> (OrderClient, mpsc::Receiver<OrderRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (OrderClient::new(sender), receiver)
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, Duration::hours(1)).unwrap()
}

/// A session already signed in as `username` with `role`.
pub fn signed_in_session(username: &str, role: Role) -> Session {
    let account = Account {
        username: username.to_string(),
        name: username.to_string(),
        role,
    };
    let bearer = test_codec().issue(&account, Utc::now()).unwrap();
    let session = Session::new(MemoryTokenStore::default());
    session.login(bearer).unwrap();
    session
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Credentials, T::CreatePayload, Responder<T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create {
            credentials,
            payload,
            respond_to,
        }) => Some((credentials, payload, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Responder<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to, .. }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Query, Responder<Vec<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List {
            query, respond_to, ..
        }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Responder<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
            ..
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

pub async fn expect_order_request(receiver: &mut mpsc::Receiver<OrderRequest>) -> Option<OrderRequest> {
    receiver.recv().await
}

/// True when nothing has been sent on the channel.
pub fn expect_no_request<R>(receiver: &mut mpsc::Receiver<R>) -> bool {
    matches!(receiver.try_recv(), Err(mpsc::error::TryRecvError::Empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MenuClient;
    use crate::domain::{
        MenuItem, MenuQuery, Order, OrderDraft, OrderStatus, SortDirection, StatusFilter,
    };
    use crate::menu_actor::{MenuAction, MenuActionResult};
    use crate::workflow::{CatalogWorkflow, ErrorClass, OrderWorkflow, WorkflowError};
    use std::time::Duration as StdDuration;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            customer_id: "budi".to_string(),
            items: Vec::new(),
            status,
            total_minor: 25_000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mock_menu_client() {
        let (inner, mut receiver) = create_mock_client::<MenuItem>(10);
        let client = MenuClient::new(inner);
        let bearer = signed_in_session("kasir", Role::Kasir).bearer().unwrap();

        let task = tokio::spawn(async move { client.set_stock(&bearer, "menu_1".to_string(), 7).await });

        let (id, action, responder) = expect_action(&mut receiver).await.expect("Expected Action request");
        assert_eq!(id, "menu_1");
        assert_eq!(action, MenuAction::SetStock(7));
        responder.send(Ok(MenuActionResult::Stock(7))).unwrap();

        assert_eq!(task.await.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn test_customer_menu_hides_sold_out_items() {
        let (inner, mut receiver) = create_mock_client::<MenuItem>(10);
        let (auth, _auth_receiver) = {
            let (sender, receiver) = mpsc::channel(1);
            (crate::clients::AuthClient::new(sender), receiver)
        };
        let workflow = CatalogWorkflow::new(
            signed_in_session("budi", Role::Pembeli),
            MenuClient::new(inner),
            auth,
        );

        let task = tokio::spawn(async move { workflow.list_menu().await });
        let (query, responder) = expect_list(&mut receiver).await.expect("Expected List request");
        assert_eq!(query, MenuQuery::InStock);
        let item = |id: &str, stock| MenuItem {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            price_minor: 18_000,
            stock,
            image_ref: String::new(),
            retired: false,
        };
        responder.send(Ok(vec![item("latte", 0), item("mocha", 4)])).unwrap();

        let items = task.await.unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "mocha");
    }

    #[tokio::test]
    async fn test_guards_run_before_any_call() {
        let (client, mut receiver) = create_mock_order_client(10);

        let admin = OrderWorkflow::new(signed_in_session("admin", Role::Admin), client.clone());
        let err = admin
            .list_orders(StatusFilter::All, SortDirection::Descending)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::NoPermission);

        let customer = OrderWorkflow::new(signed_in_session("budi", Role::Pembeli), client.clone());
        let err = customer.submit_order(OrderDraft::new()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Invalid);
        let err = customer
            .submit_order(OrderDraft::new().with("menu_1", 0))
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Invalid);
        let err = customer.advance("order_1", OrderStatus::AwaitingPayment).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::NoPermission);
        let err = customer.cancel("order_1", OrderStatus::Preparing).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Invalid);

        let signed_out = OrderWorkflow::new(Session::new(MemoryTokenStore::default()), client);
        let err = signed_out
            .list_orders(StatusFilter::All, SortDirection::Descending)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::SignIn);

        assert!(expect_no_request(&mut receiver));
    }

    #[tokio::test]
    async fn test_failed_transition_leaves_the_view_untouched() {
        let (client, mut receiver) = create_mock_order_client(10);
        let workflow = OrderWorkflow::new(signed_in_session("kasir", Role::Kasir), client);

        let loader = workflow.clone();
        let task = tokio::spawn(async move {
            loader
                .list_orders(StatusFilter::All, SortDirection::Descending)
                .await
        });
        match expect_order_request(&mut receiver).await {
            Some(OrderRequest::ListOrders { respond_to, .. }) => {
                respond_to
                    .send(Ok(vec![order("order_1", OrderStatus::AwaitingPayment)]))
                    .unwrap();
            }
            other => panic!("unexpected request: {:?}", other),
        }
        task.await.unwrap().unwrap();

        let advancing = workflow.clone();
        let task = tokio::spawn(async move { advancing.advance("order_1", OrderStatus::AwaitingPayment).await });
        match expect_order_request(&mut receiver).await {
            Some(OrderRequest::UpdateStatus {
                id,
                expected,
                status,
                respond_to,
                ..
            }) => {
                assert_eq!(id, "order_1");
                assert_eq!(expected, OrderStatus::AwaitingPayment);
                assert_eq!(status, OrderStatus::Preparing);
                respond_to
                    .send(Err(ApiError::ActorCommunicationError("connection reset".to_string())))
                    .unwrap();
            }
            other => panic!("unexpected request: {:?}", other),
        }

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(workflow.orders()[0].status, OrderStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn test_second_transition_waits_for_the_first() {
        let (client, mut receiver) = create_mock_order_client(10);
        let workflow = OrderWorkflow::new(signed_in_session("kasir", Role::Kasir), client);

        let first = workflow.clone();
        let first_task = tokio::spawn(async move { first.advance("order_1", OrderStatus::AwaitingPayment).await });
        let first_request = expect_order_request(&mut receiver).await;
        assert!(workflow.is_in_flight("order_1"));

        let second = workflow.clone();
        let second_task = tokio::spawn(async move { second.advance("order_1", OrderStatus::AwaitingPayment).await });
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(expect_no_request(&mut receiver));

        match first_request {
            Some(OrderRequest::UpdateStatus { respond_to, .. }) => {
                respond_to.send(Ok(order("order_1", OrderStatus::Preparing))).unwrap();
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert_eq!(first_task.await.unwrap().unwrap().status, OrderStatus::Preparing);

        match expect_order_request(&mut receiver).await {
            Some(OrderRequest::UpdateStatus { id, expected, respond_to, .. }) => {
                respond_to
                    .send(Err(ApiError::StatusMismatch {
                        order_id: id,
                        expected,
                        actual: OrderStatus::Preparing,
                    }))
                    .unwrap();
            }
            other => panic!("unexpected request: {:?}", other),
        }
        let err = second_task.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Conflict {
                order_id: "order_1".to_string(),
                expected: OrderStatus::AwaitingPayment,
                actual: Some(OrderStatus::Preparing),
            }
        );
        assert!(!workflow.is_in_flight("order_1"));
        assert_eq!(workflow.orders()[0].status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_direction_changes_resort_the_cached_orders() {
        let (client, mut receiver) = create_mock_order_client(10);
        let workflow = OrderWorkflow::new(signed_in_session("kasir", Role::Kasir), client);

        let base = Utc::now();
        let at = |id: &str, minutes: i64| Order {
            created_at: base + Duration::minutes(minutes),
            ..order(id, OrderStatus::AwaitingPayment)
        };

        let loader = workflow.clone();
        let task = tokio::spawn(async move {
            loader
                .list_orders(StatusFilter::All, SortDirection::Descending)
                .await
        });
        match expect_order_request(&mut receiver).await {
            Some(OrderRequest::ListOrders { respond_to, .. }) => {
                respond_to
                    .send(Ok(vec![at("order_2", 0), at("order_3", 5), at("order_1", 0)]))
                    .unwrap();
            }
            other => panic!("unexpected request: {:?}", other),
        }
        task.await.unwrap().unwrap();

        let ids = |workflow: &OrderWorkflow| -> Vec<String> {
            workflow.orders().into_iter().map(|order| order.id).collect()
        };
        assert_eq!(workflow.direction(), SortDirection::Descending);
        assert_eq!(ids(&workflow), ["order_3", "order_2", "order_1"]);

        assert_eq!(workflow.toggle_direction(), SortDirection::Ascending);
        assert_eq!(workflow.direction(), SortDirection::Ascending);
        assert_eq!(ids(&workflow), ["order_1", "order_2", "order_3"]);

        workflow.set_direction(SortDirection::Descending);
        assert_eq!(workflow.direction(), SortDirection::Descending);
        assert_eq!(ids(&workflow), ["order_3", "order_2", "order_1"]);
        assert!(expect_no_request(&mut receiver));
    }
}
