use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::clients::OrderClient;
use crate::domain::{Identity, Order, OrderDraft, OrderStatus, SortDirection, StatusFilter};
use crate::error::ApiError;
use crate::order_machine::{AuthorizedTransition, Transition};
use crate::policy::{self, Action, Resource};
use crate::session::Session;
use crate::token::Bearer;

use super::error::WorkflowError;

/// Orders sorted by `(created_at, id)`.
pub fn sort_orders(orders: &mut [Order], direction: SortDirection) {
    orders.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    if direction == SortDirection::Descending {
        orders.reverse();
    }
}

#[derive(Debug, Default)]
struct OrderView {
    orders: Vec<Order>,
    direction: SortDirection,
}

impl OrderView {
    /// Replaces the cached copy with the server's, keeping the sort order.
    fn reconcile(&mut self, order: Order) {
        match self.orders.iter_mut().find(|cached| cached.id == order.id) {
            Some(cached) => *cached = order,
            None => self.orders.push(order),
        }
        sort_orders(&mut self.orders, self.direction);
    }
}

/// Coordinates order views with the Orders API.
///
/// Every operation checks the session and the policy before issuing a call.
/// The local view only ever changes to match an order the server returned,
/// so a failed call leaves what was displayed untouched.
#[derive(Clone)]
pub struct OrderWorkflow {
    session: Session,
    client: OrderClient,
    view: Arc<Mutex<OrderView>>,
    in_flight: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl OrderWorkflow {
    pub fn new(session: Session, client: OrderClient) -> Self {
        Self {
            session,
            client,
            view: Arc::new(Mutex::new(OrderView::default())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn view(&self) -> MutexGuard<'_, OrderView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn signed_in(&self) -> Result<(Identity, Bearer), WorkflowError> {
        Ok(self.session.require(Utc::now())?)
    }

    /// The cached orders in display order.
    pub fn orders(&self) -> Vec<Order> {
        self.view().orders.clone()
    }

    pub fn direction(&self) -> SortDirection {
        self.view().direction
    }

    pub fn set_direction(&self, direction: SortDirection) {
        let mut view = self.view();
        view.direction = direction;
        sort_orders(&mut view.orders, direction);
    }

    pub fn toggle_direction(&self) -> SortDirection {
        let toggled = self.direction().toggled();
        self.set_direction(toggled);
        toggled
    }

    /// Customers get their own orders, cashiers get every order. Nobody else
    /// has an order list, and they are turned away before any call.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: StatusFilter,
        direction: SortDirection,
    ) -> Result<Vec<Order>, WorkflowError> {
        let (identity, bearer) = self.signed_in()?;
        let scope = policy::order_scope(identity.role)?;
        policy::authorize(identity.role, scope.resource(), Action::List)?;

        let mut orders = self.client.list_orders(bearer, filter).await?;
        sort_orders(&mut orders, direction);
        debug!(count = orders.len(), "Orders loaded");

        let mut view = self.view();
        view.direction = direction;
        view.orders = orders.clone();
        Ok(orders)
    }

    /// Fetches one order again and reconciles the cache with it.
    #[instrument(skip(self))]
    pub async fn refresh_order(&self, order_id: &str) -> Result<Option<Order>, WorkflowError> {
        let (identity, bearer) = self.signed_in()?;
        let scope = policy::order_scope(identity.role)?;
        policy::authorize(identity.role, scope.resource(), Action::Read)?;

        let order = self.client.get_order(bearer, order_id.to_string()).await?;
        let mut view = self.view();
        match &order {
            Some(order) => view.reconcile(order.clone()),
            None => view.orders.retain(|cached| cached.id != order_id),
        }
        Ok(order)
    }

    /// Places a customer order. An empty draft or a quantity below one is
    /// rejected without contacting the server.
    #[instrument(skip(self, draft))]
    pub async fn submit_order(&self, draft: OrderDraft) -> Result<Order, WorkflowError> {
        let (identity, bearer) = self.signed_in()?;
        policy::authorize(identity.role, Resource::OwnOrders, Action::Create)?;
        let lines = draft.into_lines().map_err(WorkflowError::Validation)?;

        let order = self.client.create_order(bearer, lines).await?;
        info!(order_id = %order.id, total = order.total_minor, "Order placed");
        self.view().reconcile(order.clone());
        Ok(order)
    }

    pub async fn advance(&self, order_id: &str, expected: OrderStatus) -> Result<Order, WorkflowError> {
        self.apply_transition(order_id, expected, Transition::Advance).await
    }

    pub async fn cancel(&self, order_id: &str, expected: OrderStatus) -> Result<Order, WorkflowError> {
        self.apply_transition(order_id, expected, Transition::Cancel).await
    }

    /// Moves an order on from the status the caller believes it has.
    ///
    /// Requests for the same order are serialized: a second one waits for
    /// the first, and is refused by the server as a conflict when the first
    /// one already moved the order away from `expected`.
    #[instrument(skip(self))]
    pub async fn apply_transition(
        &self,
        order_id: &str,
        expected: OrderStatus,
        transition: Transition,
    ) -> Result<Order, WorkflowError> {
        let (identity, bearer) = self.signed_in()?;
        let authorized = transition.authorize(identity.role)?;
        let target = authorized.apply(expected)?;

        let lock = self.order_lock(order_id);
        let result = {
            let _guard = lock.lock().await;
            self.dispatch(bearer, order_id, expected, target, authorized).await
        };
        self.release_lock(order_id, lock);

        let order = result?;
        info!(status = %order.status, "Transition applied");
        self.view().reconcile(order.clone());
        Ok(order)
    }

    /// True while a transition for `order_id` is being dispatched.
    pub fn is_in_flight(&self, order_id: &str) -> bool {
        let in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight
            .get(order_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    async fn dispatch(
        &self,
        bearer: Bearer,
        order_id: &str,
        expected: OrderStatus,
        target: OrderStatus,
        authorized: AuthorizedTransition,
    ) -> Result<Order, WorkflowError> {
        let id = order_id.to_string();
        let sent = match authorized.transition() {
            Transition::Advance => self.client.update_status(bearer, id, expected, target).await,
            Transition::Cancel => self.client.cancel_order(bearer, id, expected).await,
        };
        sent.map_err(|e| match e {
            ApiError::NotFound(_) => WorkflowError::Conflict {
                order_id: order_id.to_string(),
                expected,
                actual: None,
            },
            other => {
                warn!(error = %other, "Transition failed");
                WorkflowError::from(other)
            }
        })
    }

    fn order_lock(&self, order_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.entry(order_id.to_string()).or_default().clone()
    }

    fn release_lock(&self, order_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map and ours: nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            in_flight.remove(order_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(id: &str, minute: u32) -> Order {
        Order {
            id: id.to_string(),
            customer_id: "c".to_string(),
            items: Vec::new(),
            status: OrderStatus::AwaitingPayment,
            total_minor: 0,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn newest_first_by_default_with_id_as_tie_breaker() {
        let mut orders = vec![order("order_1", 0), order("order_3", 5), order("order_2", 5)];
        sort_orders(&mut orders, SortDirection::default());
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["order_3", "order_2", "order_1"]);

        sort_orders(&mut orders, SortDirection::Ascending);
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["order_1", "order_2", "order_3"]);
    }

    #[test]
    fn reconcile_replaces_in_place_and_keeps_order() {
        let mut view = OrderView::default();
        view.reconcile(order("order_1", 0));
        view.reconcile(order("order_2", 1));

        let mut changed = order("order_1", 0);
        changed.status = OrderStatus::Preparing;
        view.reconcile(changed);

        assert_eq!(view.orders.len(), 2);
        assert_eq!(view.orders[0].id, "order_2");
        assert_eq!(view.orders[1].status, OrderStatus::Preparing);
    }
}
