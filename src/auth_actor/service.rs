use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::actor_framework::authenticate_bearer;
use crate::clients::AuthClient;
use crate::domain::{Account, AccountCreate, Identity, Role};
use crate::error::ApiError;
use crate::messages::{send_error, AuthRequest, ServiceResponse};
use crate::policy::{self, Action, Resource};
use crate::token::{Bearer, TokenCodec};

use super::lockout::LoginAttempts;
use super::password::Passwords;

struct StoredAccount {
    account: Account,
    password_hash: String,
}

/// The authoritative Auth API: account storage, login and cashier management.
pub struct AuthService {
    receiver: mpsc::Receiver<AuthRequest>,
    codec: Arc<TokenCodec>,
    accounts: HashMap<String, StoredAccount>,
    attempts: LoginAttempts,
    passwords: Passwords,
}

impl AuthService {
    pub fn new(
        buffer_size: usize,
        codec: Arc<TokenCodec>,
        attempts: LoginAttempts,
        passwords: Passwords,
    ) -> (Self, AuthClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            codec,
            accounts: HashMap::new(),
            attempts,
            passwords,
        };
        (service, AuthClient::new(sender))
    }

    /// Adds an account directly, bypassing the endpoint rules. Used to
    /// bootstrap the first administrator before the service starts.
    pub fn seed(&mut self, account: AccountCreate, role: Role) -> Result<Account, ApiError> {
        self.insert(account, role)
    }

    #[instrument(name = "auth_service", skip(self))]
    pub async fn run(mut self) {
        info!("AuthService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                AuthRequest::Login {
                    username,
                    password,
                    respond_to,
                } => {
                    self.handle_login(username, password, respond_to);
                }
                AuthRequest::Register {
                    account,
                    respond_to,
                } => {
                    self.handle_register(account, respond_to);
                }
                AuthRequest::CreateCashier {
                    bearer,
                    account,
                    respond_to,
                } => {
                    self.handle_create_cashier(bearer, account, respond_to);
                }
                AuthRequest::ListCashiers { bearer, respond_to } => {
                    self.handle_list_cashiers(bearer, respond_to);
                }
                AuthRequest::Shutdown => {
                    info!("AuthService shutting down");
                    break;
                }
            }
        }

        info!("AuthService stopped");
    }

    fn insert(&mut self, account: AccountCreate, role: Role) -> Result<Account, ApiError> {
        account.validate().map_err(ApiError::Rejected)?;
        if self.accounts.contains_key(&account.username) {
            return Err(ApiError::Rejected(format!(
                "Username {} is already taken",
                account.username
            )));
        }

        let password_hash = self
            .passwords
            .hash(&account.password)
            .map_err(|e| ApiError::Rejected(e.to_string()))?;
        let stored = StoredAccount {
            password_hash,
            account: Account {
                username: account.username.clone(),
                name: account.name,
                role,
            },
        };
        let created = stored.account.clone();
        self.accounts.insert(account.username, stored);
        Ok(created)
    }

    fn authorized(&self, bearer: &Bearer, action: Action) -> Result<Identity, ApiError> {
        let identity = authenticate_bearer(&self.codec, bearer)?;
        policy::authorize(identity.role, Resource::CashierAccounts, action)
            .map_err(|denied| ApiError::Forbidden(denied.to_string()))?;
        Ok(identity)
    }

    #[instrument(skip(self, password, respond_to))]
    fn handle_login(
        &mut self,
        username: String,
        password: String,
        respond_to: ServiceResponse<Bearer, ApiError>,
    ) {
        debug!("Processing login request");
        let now = Utc::now();

        if self.attempts.is_locked(&username, now) {
            warn!("Login refused while account is locked");
            send_error!(
                respond_to,
                ApiError::Locked("Too many failed attempts, try again later".to_string())
            );
        }

        let verified = match self.accounts.get(&username) {
            Some(stored) if self.passwords.verify(&stored.password_hash, &password) => {
                Some(stored.account.clone())
            }
            Some(_) => None,
            None => {
                self.passwords.simulate_verify(&password);
                None
            }
        };
        let account = match verified {
            Some(account) => account,
            None => {
                self.attempts.failed(&username, now);
                warn!(remaining = self.attempts.remaining(&username), "Login failed");
                send_error!(respond_to, ApiError::Unauthenticated);
            }
        };

        self.attempts.succeeded(&username);
        match self.codec.issue(&account, now) {
            Ok(bearer) => {
                info!(role = %account.role, "Login succeeded");
                let _ = respond_to.send(Ok(bearer));
            }
            Err(e) => send_error!(respond_to, ApiError::Rejected(e.to_string())),
        }
    }

    /// Self-registration always yields a customer account.
    #[instrument(skip(self, respond_to))]
    fn handle_register(&mut self, account: AccountCreate, respond_to: ServiceResponse<Account, ApiError>) {
        info!("Processing register request");
        let result = self.insert(account, Role::Pembeli);
        if let Err(e) = &result {
            warn!(error = %e, "Registration rejected");
        }
        let _ = respond_to.send(result);
    }

    /// Accounts created by an administrator are always cashiers.
    #[instrument(skip(self, bearer, respond_to))]
    fn handle_create_cashier(
        &mut self,
        bearer: Bearer,
        account: AccountCreate,
        respond_to: ServiceResponse<Account, ApiError>,
    ) {
        info!("Processing create_cashier request");
        if let Err(e) = self.authorized(&bearer, Action::Create) {
            send_error!(respond_to, e);
        }
        let _ = respond_to.send(self.insert(account, Role::Kasir));
    }

    #[instrument(skip(self, bearer, respond_to))]
    fn handle_list_cashiers(&self, bearer: Bearer, respond_to: ServiceResponse<Vec<Account>, ApiError>) {
        debug!("Processing list_cashiers request");
        if let Err(e) = self.authorized(&bearer, Action::List) {
            send_error!(respond_to, e);
        }

        let mut cashiers: Vec<Account> = self
            .accounts
            .values()
            .filter(|stored| stored.account.role == Role::Kasir)
            .map(|stored| stored.account.clone())
            .collect();
        cashiers.sort_by(|a, b| a.username.cmp(&b.username));
        let _ = respond_to.send(Ok(cashiers));
    }
}
