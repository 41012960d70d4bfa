use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actor_framework::ResourceActor;
use crate::auth_actor::{AuthService, LoginAttempts, PasswordError, Passwords};
use crate::clients::{AuthClient, MenuClient, OrderClient};
use crate::config::CafeConfig;
use crate::domain::{MenuItem, Role};
use crate::error::ApiError;
use crate::order_actor::OrderService;
use crate::session::Session;
use crate::token::{TokenCodec, TokenError};
use crate::workflow::{CatalogWorkflow, OrderWorkflow};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Token setup failed: {0}")]
    Token(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] ApiError),
    #[error("Actor task failed: {0}")]
    Task(String),
}

/// Starts the Menu, Auth and Orders services and hands out their clients.
pub struct CafeSystem {
    pub menu_client: MenuClient,
    pub auth_client: AuthClient,
    pub order_client: OrderClient,
    handles: Vec<JoinHandle<()>>,
}

impl CafeSystem {
    pub fn new(config: &CafeConfig) -> Result<Self, SystemError> {
        let codec = Arc::new(TokenCodec::new(&config.token_secret, config.token_lifetime())?);

        // 1. Menu API
        let menu_id_counter = Arc::new(AtomicU64::new(1));
        let next_menu_id = move || {
            let id = menu_id_counter.fetch_add(1, Ordering::SeqCst);
            format!("menu_{}", id)
        };
        let (menu_actor, menu_resource_client) =
            ResourceActor::<MenuItem>::new(config.channel_buffer, next_menu_id, codec.clone());
        let menu_client = MenuClient::new(menu_resource_client.clone());
        let menu_handle = tokio::spawn(menu_actor.run());

        // 2. Auth API, seeded with the configured administrator
        let attempts = LoginAttempts::new(config.max_login_attempts, config.lockout());
        let passwords = Passwords::new(config.password_memory_kib, config.password_iterations)?;
        let (mut auth_service, auth_client) =
            AuthService::new(config.channel_buffer, codec.clone(), attempts, passwords);
        let admin = auth_service.seed(config.admin.to_account(), Role::Admin)?;
        info!(username = %admin.username, "Administrator account ready");
        let auth_handle = tokio::spawn(auth_service.run());

        // 3. Orders API, reserving stock through the menu actor
        let (order_service, order_client) =
            OrderService::new(config.channel_buffer, menu_resource_client, codec);
        let order_handle = tokio::spawn(order_service.run());

        Ok(Self {
            menu_client,
            auth_client,
            order_client,
            handles: vec![menu_handle, auth_handle, order_handle],
        })
    }

    pub fn order_workflow(&self, session: Session) -> OrderWorkflow {
        OrderWorkflow::new(session, self.order_client.clone())
    }

    pub fn catalog_workflow(&self, session: Session) -> CatalogWorkflow {
        CatalogWorkflow::new(session, self.menu_client.clone(), self.auth_client.clone())
    }

    /// Stops the services and waits for them.
    ///
    /// The menu actor stops once the last menu client is gone, which includes
    /// the one held by the order service. Workflows handed out earlier must
    /// be dropped first.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        if let Err(e) = self.order_client.shutdown().await {
            error!(error = %e, "Order service already stopped");
        }
        if let Err(e) = self.auth_client.shutdown().await {
            error!(error = %e, "Auth service already stopped");
        }
        drop(self.menu_client);
        drop(self.order_client);
        drop(self.auth_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::Task(format!("{:?}", e)));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
