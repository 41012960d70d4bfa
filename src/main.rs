use tracing::{error, info, Instrument};

use cafe_counter::app_system::{setup_tracing, CafeSystem};
use cafe_counter::config::CafeConfig;
use cafe_counter::domain::{AccountCreate, MenuDraft, OrderDraft, SortDirection, StatusFilter};
use cafe_counter::session::{watch_expiry, MemoryTokenStore, Session};
use cafe_counter::workflow::{register, sign_in, WorkflowError};

async fn signed_in(system: &CafeSystem, username: &str, password: &str) -> Result<Session, WorkflowError> {
    let session = Session::new(MemoryTokenStore::default());
    session.load();
    sign_in(&system.auth_client, &session, username, password).await?;
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = CafeConfig::load().map_err(|e| e.to_string())?;
    setup_tracing(&config.log_filter);

    info!("Starting cafe counter");
    let system = CafeSystem::new(&config).map_err(|e| e.to_string())?;

    // Admin sets up the menu and a cashier
    let span = tracing::info_span!("admin_setup");
    let (latte, croissant) = async {
        let admin = signed_in(&system, &config.admin.username, &config.admin.password).await?;
        let catalog = system.catalog_workflow(admin.clone());
        let latte = catalog.create_menu(MenuDraft::new("Latte", 15_000, 20)).await?;
        let croissant = catalog.create_menu(MenuDraft::new("Croissant", 30_000, 5)).await?;
        catalog
            .create_cashier(AccountCreate::new("kasir", "Kasir", "kasir-password"))
            .await?;
        admin.logout();
        Ok::<_, WorkflowError>((latte, croissant))
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Customer places an order
    let span = tracing::info_span!("customer_order");
    let order = async {
        register(
            &system.auth_client,
            AccountCreate::new("budi", "Budi", "budi-password"),
        )
        .await?;
        let session = signed_in(&system, "budi", "budi-password").await?;
        let expiry = watch_expiry(session.clone(), config.expiry_check_interval());
        let orders = system.order_workflow(session.clone());
        let order = orders
            .submit_order(OrderDraft::new().with(latte.id.clone(), 2).with(croissant.id.clone(), 1))
            .await;
        expiry.abort();
        session.logout();
        order
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    info!(order_id = %order.id, total = order.total_minor, status = %order.status, "Order placed");

    // Cashier prepares the order and hands it over
    let span = tracing::info_span!("cashier_fulfilment");
    let result = async {
        let session = signed_in(&system, "kasir", "kasir-password").await?;
        let orders = system.order_workflow(session.clone());
        orders
            .list_orders(StatusFilter::All, SortDirection::Descending)
            .await?;

        let mut status = order.status;
        while status.next().is_some() {
            status = orders.advance(&order.id, status).await?.status;
            info!(order_id = %order.id, status = %status, "Order advanced");
        }
        session.logout();
        Ok::<_, WorkflowError>(status)
    }
    .instrument(span)
    .await;

    match result {
        Ok(status) => info!(order_id = %order.id, status = %status, "Order fulfilled"),
        Err(e) => error!(error = %e, class = ?e.class(), "Order fulfilment failed"),
    }

    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}
