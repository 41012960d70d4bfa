use chrono::Utc;
use tracing::{info, instrument};

use crate::clients::{AuthClient, MenuClient};
use crate::domain::{
    checked_stock, Account, AccountCreate, Identity, MenuDraft, MenuItem, MenuQuery, Role,
};
use crate::policy::{self, Action, Resource};
use crate::session::Session;
use crate::token::Bearer;

use super::error::WorkflowError;

/// Menu management and cashier administration, guarded by the same policy
/// the APIs enforce.
#[derive(Clone)]
pub struct CatalogWorkflow {
    session: Session,
    menu: MenuClient,
    auth: AuthClient,
}

impl CatalogWorkflow {
    pub fn new(session: Session, menu: MenuClient, auth: AuthClient) -> Self {
        Self {
            session,
            menu,
            auth,
        }
    }

    fn guard(&self, resource: Resource, action: Action) -> Result<(Identity, Bearer), WorkflowError> {
        let (identity, bearer) = self.session.require(Utc::now())?;
        policy::authorize(identity.role, resource, action)?;
        Ok((identity, bearer))
    }

    /// Customers only ever see items that are in stock.
    #[instrument(skip(self))]
    pub async fn list_menu(&self) -> Result<Vec<MenuItem>, WorkflowError> {
        let (identity, bearer) = self.guard(Resource::MenuCatalog, Action::List)?;
        let query = match identity.role {
            Role::Pembeli => MenuQuery::InStock,
            Role::Admin | Role::Kasir => MenuQuery::All,
        };
        let items = self.menu.list_menu(&bearer, query).await?;
        Ok(policy::visible_menu(identity.role, items))
    }

    #[instrument(skip(self))]
    pub async fn create_menu(&self, draft: MenuDraft) -> Result<MenuItem, WorkflowError> {
        let (_, bearer) = self.guard(Resource::MenuCatalog, Action::Create)?;
        let payload = draft.into_create().map_err(WorkflowError::Validation)?;
        let item = self.menu.create_menu(&bearer, payload).await?;
        info!(menu_id = %item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn update_menu(&self, id: &str, draft: MenuDraft) -> Result<MenuItem, WorkflowError> {
        let (_, bearer) = self.guard(Resource::MenuCatalog, Action::Update)?;
        let update = draft.into_update().map_err(WorkflowError::Validation)?;
        Ok(self.menu.update_menu(&bearer, id.to_string(), update).await?)
    }

    /// Cashiers may only touch stock; administrators edit it as part of
    /// updating the item.
    #[instrument(skip(self))]
    pub async fn update_stock(&self, id: &str, stock: i64) -> Result<u32, WorkflowError> {
        let (identity, bearer) = self.session.require(Utc::now())?;
        policy::authorize(identity.role, Resource::MenuCatalog, Action::UpdateStock).or_else(
            |denied| {
                policy::authorize(identity.role, Resource::MenuCatalog, Action::Update)
                    .map_err(|_| denied)
            },
        )?;
        let stock = checked_stock(stock).map_err(WorkflowError::Validation)?;
        Ok(self.menu.set_stock(&bearer, id.to_string(), stock).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_menu(&self, id: &str) -> Result<(), WorkflowError> {
        let (_, bearer) = self.guard(Resource::MenuCatalog, Action::Delete)?;
        self.menu.delete_menu(&bearer, id.to_string()).await?;
        info!(menu_id = %id, "Menu item deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_cashiers(&self) -> Result<Vec<Account>, WorkflowError> {
        let (_, bearer) = self.guard(Resource::CashierAccounts, Action::List)?;
        Ok(self.auth.list_cashiers(bearer).await?)
    }

    #[instrument(skip(self))]
    pub async fn create_cashier(&self, account: AccountCreate) -> Result<Account, WorkflowError> {
        let (_, bearer) = self.guard(Resource::CashierAccounts, Action::Create)?;
        account.validate().map_err(WorkflowError::Validation)?;
        Ok(self.auth.create_cashier(bearer, account).await?)
    }
}
