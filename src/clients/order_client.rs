use tokio::sync::mpsc;
use tracing::info;

use crate::domain::{Order, OrderLine, OrderStatus, StatusFilter};
use crate::error::ApiError;
use crate::messages::OrderRequest;
use crate::token::Bearer;

/// Client for the Orders API.
#[derive(Clone)]
pub struct OrderClient {
    sender: mpsc::Sender<OrderRequest>,
}

impl OrderClient {
    pub fn new(sender: mpsc::Sender<OrderRequest>) -> Self {
        Self { sender }
    }

    pub async fn shutdown(&self) -> Result<(), ApiError> {
        info!("Requesting order service shutdown");
        self.sender
            .send(OrderRequest::Shutdown)
            .await
            .map_err(|_| ApiError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(OrderClient => fn create_order(bearer: Bearer, lines: Vec<OrderLine>) -> Order as OrderRequest::CreateOrder);
client_method!(OrderClient => fn get_order(bearer: Bearer, id: String) -> Option<Order> as OrderRequest::GetOrder);
client_method!(OrderClient => fn list_orders(bearer: Bearer, filter: StatusFilter) -> Vec<Order> as OrderRequest::ListOrders);
client_method!(OrderClient => fn update_status(bearer: Bearer, id: String, expected: OrderStatus, status: OrderStatus) -> Order as OrderRequest::UpdateStatus);
client_method!(OrderClient => fn cancel_order(bearer: Bearer, id: String, expected: OrderStatus) -> Order as OrderRequest::CancelOrder);
