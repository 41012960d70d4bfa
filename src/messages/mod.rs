//! Typed request enums for the order and auth services.
//!
//! Each variant carries its parameters plus a oneshot channel for the reply.

use tokio::sync::oneshot;

use crate::domain::{Account, AccountCreate, Order, OrderLine, OrderStatus, StatusFilter};
use crate::error::ApiError;
use crate::token::Bearer;

pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

#[derive(Debug)]
pub enum OrderRequest {
    CreateOrder {
        bearer: Bearer,
        lines: Vec<OrderLine>,
        respond_to: ServiceResponse<Order, ApiError>,
    },
    GetOrder {
        bearer: Bearer,
        id: String,
        respond_to: ServiceResponse<Option<Order>, ApiError>,
    },
    ListOrders {
        bearer: Bearer,
        filter: StatusFilter,
        respond_to: ServiceResponse<Vec<Order>, ApiError>,
    },
    UpdateStatus {
        bearer: Bearer,
        id: String,
        expected: OrderStatus,
        status: OrderStatus,
        respond_to: ServiceResponse<Order, ApiError>,
    },
    CancelOrder {
        bearer: Bearer,
        id: String,
        expected: OrderStatus,
        respond_to: ServiceResponse<Order, ApiError>,
    },
    Shutdown,
}

pub enum AuthRequest {
    Login {
        username: String,
        password: String,
        respond_to: ServiceResponse<Bearer, ApiError>,
    },
    Register {
        account: AccountCreate,
        respond_to: ServiceResponse<Account, ApiError>,
    },
    CreateCashier {
        bearer: Bearer,
        account: AccountCreate,
        respond_to: ServiceResponse<Account, ApiError>,
    },
    ListCashiers {
        bearer: Bearer,
        respond_to: ServiceResponse<Vec<Account>, ApiError>,
    },
    Shutdown,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthRequest::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
            AuthRequest::Register { account, .. } => {
                f.debug_struct("Register").field("account", account).finish_non_exhaustive()
            }
            AuthRequest::CreateCashier { account, .. } => f
                .debug_struct("CreateCashier")
                .field("account", account)
                .finish_non_exhaustive(),
            AuthRequest::ListCashiers { .. } => f.debug_struct("ListCashiers").finish_non_exhaustive(),
            AuthRequest::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Replies with an error and returns from the handler.
macro_rules! send_error {
    ($respond_to:expr, $error:expr) => {{
        let _ = $respond_to.send(Err($error));
        return;
    }};
}

pub(crate) use send_error;
