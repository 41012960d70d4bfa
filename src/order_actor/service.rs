use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::actor_framework::{authenticate_bearer, Credentials, ResourceClient};
use crate::clients::OrderClient;
use crate::domain::{
    normalize_lines, total_minor, Identity, MenuItem, Order, OrderItem, OrderLine, OrderStatus,
    StatusFilter,
};
use crate::error::ApiError;
use crate::menu_actor::{MenuAction, MenuActionResult};
use crate::messages::{send_error, OrderRequest, ServiceResponse};
use crate::policy::{self, Action, OrderScope, Resource};
use crate::token::{Bearer, TokenCodec};

/// The authoritative Orders API.
///
/// Orders are kept here; stock lives with the menu actor and is reserved
/// through it. Requests are handled one at a time, so the expected-status
/// check and the status write of a transition cannot interleave with another
/// request.
pub struct OrderService {
    receiver: mpsc::Receiver<OrderRequest>,
    menu: ResourceClient<MenuItem>,
    codec: Arc<TokenCodec>,
    orders: HashMap<String, Order>,
    next_id: u64,
}

impl OrderService {
    pub fn new(
        buffer_size: usize,
        menu: ResourceClient<MenuItem>,
        codec: Arc<TokenCodec>,
    ) -> (Self, OrderClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            menu,
            codec,
            orders: HashMap::new(),
            next_id: 1,
        };
        (service, OrderClient::new(sender))
    }

    #[instrument(name = "order_service", skip(self))]
    pub async fn run(mut self) {
        info!("OrderService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                OrderRequest::CreateOrder {
                    bearer,
                    lines,
                    respond_to,
                } => {
                    self.handle_create_order(bearer, lines, respond_to).await;
                }
                OrderRequest::GetOrder {
                    bearer,
                    id,
                    respond_to,
                } => {
                    self.handle_get_order(bearer, id, respond_to);
                }
                OrderRequest::ListOrders {
                    bearer,
                    filter,
                    respond_to,
                } => {
                    self.handle_list_orders(bearer, filter, respond_to);
                }
                OrderRequest::UpdateStatus {
                    bearer,
                    id,
                    expected,
                    status,
                    respond_to,
                } => {
                    self.handle_update_status(bearer, id, expected, status, respond_to);
                }
                OrderRequest::CancelOrder {
                    bearer,
                    id,
                    expected,
                    respond_to,
                } => {
                    self.handle_cancel_order(bearer, id, expected, respond_to)
                        .await;
                }
                OrderRequest::Shutdown => {
                    info!("OrderService shutting down");
                    break;
                }
            }
        }

        info!("OrderService stopped");
    }

    fn authorized(
        &self,
        bearer: &Bearer,
        resource: Resource,
        action: Action,
    ) -> Result<Identity, ApiError> {
        let identity = authenticate_bearer(&self.codec, bearer)?;
        policy::authorize(identity.role, resource, action)
            .map_err(|denied| ApiError::Forbidden(denied.to_string()))?;
        Ok(identity)
    }

    fn scoped(&self, bearer: &Bearer, action: Action) -> Result<(Identity, OrderScope), ApiError> {
        let identity = authenticate_bearer(&self.codec, bearer)?;
        let scope = policy::order_scope(identity.role)
            .and_then(|scope| policy::authorize(identity.role, scope.resource(), action).map(|_| scope))
            .map_err(|denied| ApiError::Forbidden(denied.to_string()))?;
        Ok((identity, scope))
    }

    fn visible(order: &Order, identity: &Identity, scope: OrderScope) -> bool {
        match scope {
            OrderScope::All => true,
            OrderScope::Own => order.customer_id == identity.subject,
        }
    }

    /// Validates lines, reserves stock for each and records the order.
    ///
    /// When any line cannot be reserved, the lines already reserved are
    /// released again before replying.
    #[instrument(fields(line_count = lines.len()), skip(self, bearer, lines, respond_to))]
    async fn handle_create_order(
        &mut self,
        bearer: Bearer,
        lines: Vec<OrderLine>,
        respond_to: ServiceResponse<Order, ApiError>,
    ) {
        info!("Processing create_order request");

        let identity = match self.authorized(&bearer, Resource::OwnOrders, Action::Create) {
            Ok(identity) => identity,
            Err(e) => send_error!(respond_to, e),
        };

        let lines = match normalize_lines(lines) {
            Ok(lines) => lines,
            Err(message) => send_error!(respond_to, ApiError::Rejected(message)),
        };

        if let Some(active) = self
            .orders
            .values()
            .find(|order| order.customer_id == identity.subject && !order.status.is_terminal())
        {
            warn!(order_id = %active.id, status = %active.status, "Customer already has an active order");
            send_error!(
                respond_to,
                ApiError::Rejected(format!(
                    "Customer already has an active order with status {}",
                    active.status
                ))
            );
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.reserve(line).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    error!(menu_id = %line.menu_id, error = %e, "Stock reservation failed");
                    self.release(&items).await;
                    send_error!(respond_to, e);
                }
            }
        }

        let Some(total) = total_minor(&items) else {
            warn!("Order total does not fit in minor units");
            self.release(&items).await;
            send_error!(respond_to, ApiError::Rejected("Order total is too large".to_string()));
        };

        let id = format!("order_{}", self.next_id);
        self.next_id += 1;
        let order = Order {
            id: id.clone(),
            customer_id: identity.subject,
            total_minor: total,
            items,
            status: OrderStatus::AwaitingPayment,
            created_at: Utc::now(),
        };
        self.orders.insert(id, order.clone());

        info!(order_id = %order.id, total = order.total_minor, "Order created successfully");
        let _ = respond_to.send(Ok(order));
    }

    async fn reserve(&self, line: &OrderLine) -> Result<OrderItem, ApiError> {
        let menu_item = self
            .menu
            .get(Credentials::Service, line.menu_id.clone())
            .await?
            .ok_or_else(|| ApiError::Rejected(format!("Menu {} not found", line.menu_id)))?;

        let MenuActionResult::Stock(remaining) = self
            .menu
            .perform_action(
                Credentials::Service,
                line.menu_id.clone(),
                MenuAction::Reserve(line.quantity),
            )
            .await?;
        debug!(menu_id = %line.menu_id, remaining, "Stock reserved");

        Ok(OrderItem {
            menu_id: menu_item.id,
            name: menu_item.name,
            unit_price_minor: menu_item.price_minor,
            quantity: line.quantity,
        })
    }

    async fn release(&self, items: &[OrderItem]) {
        for item in items {
            let restored = self
                .menu
                .perform_action(
                    Credentials::Service,
                    item.menu_id.clone(),
                    MenuAction::Restore(item.quantity),
                )
                .await;
            if let Err(e) = restored {
                warn!(menu_id = %item.menu_id, error = %e, "Could not restore stock");
            }
        }
    }

    /// Customers only ever see their own orders; another customer's order
    /// reads as missing rather than forbidden.
    #[instrument(fields(order_id = %id), skip(self, bearer, respond_to))]
    fn handle_get_order(
        &self,
        bearer: Bearer,
        id: String,
        respond_to: ServiceResponse<Option<Order>, ApiError>,
    ) {
        debug!("Processing get_order request");

        let (identity, scope) = match self.scoped(&bearer, Action::Read) {
            Ok(scoped) => scoped,
            Err(e) => send_error!(respond_to, e),
        };

        let order = self
            .orders
            .get(&id)
            .filter(|order| Self::visible(order, &identity, scope))
            .cloned();

        match &order {
            Some(order) => debug!(status = %order.status, "Order found"),
            None => debug!("Order not found"),
        }

        let _ = respond_to.send(Ok(order));
    }

    #[instrument(skip(self, bearer, respond_to))]
    fn handle_list_orders(
        &self,
        bearer: Bearer,
        filter: StatusFilter,
        respond_to: ServiceResponse<Vec<Order>, ApiError>,
    ) {
        debug!("Processing list_orders request");

        let (identity, scope) = match self.scoped(&bearer, Action::List) {
            Ok(scoped) => scoped,
            Err(e) => send_error!(respond_to, e),
        };

        let orders: Vec<Order> = self
            .orders
            .values()
            .filter(|order| Self::visible(order, &identity, scope) && filter.matches(order.status))
            .cloned()
            .collect();

        debug!(count = orders.len(), "Orders listed");
        let _ = respond_to.send(Ok(orders));
    }

    /// Advances an order one step, but only if it is still in `expected`.
    #[instrument(fields(order_id = %id), skip(self, bearer, respond_to))]
    fn handle_update_status(
        &mut self,
        bearer: Bearer,
        id: String,
        expected: OrderStatus,
        status: OrderStatus,
        respond_to: ServiceResponse<Order, ApiError>,
    ) {
        info!("Processing update_status request");

        if let Err(e) = self.authorized(&bearer, Resource::AllOrders, Action::AdvanceStatus) {
            send_error!(respond_to, e);
        }

        let order = match self.orders.get_mut(&id) {
            Some(order) => order,
            None => send_error!(respond_to, ApiError::NotFound(id)),
        };

        if order.status != expected {
            warn!(actual = %order.status, "Status precondition failed");
            send_error!(
                respond_to,
                ApiError::StatusMismatch {
                    order_id: id,
                    expected,
                    actual: order.status,
                }
            );
        }

        if expected.next() != Some(status) {
            send_error!(
                respond_to,
                ApiError::Rejected(format!(
                    "Invalid status transition from {} to {}",
                    expected, status
                ))
            );
        }

        order.status = status;
        info!("Order status updated");
        let _ = respond_to.send(Ok(order.clone()));
    }

    /// Cancels a customer's own order and gives its stock back.
    #[instrument(fields(order_id = %id), skip(self, bearer, respond_to))]
    async fn handle_cancel_order(
        &mut self,
        bearer: Bearer,
        id: String,
        expected: OrderStatus,
        respond_to: ServiceResponse<Order, ApiError>,
    ) {
        info!("Processing cancel_order request");

        let identity = match self.authorized(&bearer, Resource::OwnOrders, Action::Cancel) {
            Ok(identity) => identity,
            Err(e) => send_error!(respond_to, e),
        };

        let order = match self.orders.get_mut(&id) {
            Some(order) if order.customer_id == identity.subject => order,
            _ => send_error!(respond_to, ApiError::NotFound(id)),
        };

        if order.status != expected {
            warn!(actual = %order.status, "Status precondition failed");
            send_error!(
                respond_to,
                ApiError::StatusMismatch {
                    order_id: id,
                    expected,
                    actual: order.status,
                }
            );
        }

        match expected.cancel() {
            Ok(cancelled) => order.status = cancelled,
            Err(e) => send_error!(respond_to, ApiError::Rejected(e.to_string())),
        }

        let order = order.clone();
        self.release(&order.items).await;

        info!("Order cancelled");
        let _ = respond_to.send(Ok(order));
    }
}
