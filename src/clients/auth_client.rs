use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::domain::{Account, AccountCreate};
use crate::error::ApiError;
use crate::messages::AuthRequest;
use crate::token::Bearer;

/// Client for the Auth API.
#[derive(Clone)]
pub struct AuthClient {
    sender: mpsc::Sender<AuthRequest>,
}

impl AuthClient {
    pub fn new(sender: mpsc::Sender<AuthRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: String, password: String) -> Result<Bearer, ApiError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(AuthRequest::Login {
                username,
                password,
                respond_to,
            })
            .await
            .map_err(|_| ApiError::ActorCommunicationError("Actor closed".to_string()))?;

        response
            .await
            .map_err(|_| ApiError::ActorCommunicationError("Actor dropped".to_string()))?
    }

    pub async fn shutdown(&self) -> Result<(), ApiError> {
        info!("Requesting auth service shutdown");
        self.sender
            .send(AuthRequest::Shutdown)
            .await
            .map_err(|_| ApiError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(AuthClient => fn register(account: AccountCreate) -> Account as AuthRequest::Register);
client_method!(AuthClient => fn create_cashier(bearer: Bearer, account: AccountCreate) -> Account as AuthRequest::CreateCashier);
client_method!(AuthClient => fn list_cashiers(bearer: Bearer) -> Vec<Account> as AuthRequest::ListCashiers);
