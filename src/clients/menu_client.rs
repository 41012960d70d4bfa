use tracing::{debug, instrument};

use crate::actor_framework::{Credentials, ResourceClient};
use crate::domain::{MenuCreate, MenuItem, MenuQuery, MenuUpdate};
use crate::error::ApiError;
use crate::menu_actor::{MenuAction, MenuActionResult};
use crate::token::Bearer;

/// Client for the Menu API.
#[derive(Clone)]
pub struct MenuClient {
    inner: ResourceClient<MenuItem>,
}

impl_basic_client!(MenuClient, MenuItem, menu);

impl MenuClient {
    #[instrument(skip(self, bearer))]
    pub async fn list_menu(&self, bearer: &Bearer, query: MenuQuery) -> Result<Vec<MenuItem>, ApiError> {
        debug!("Sending request");
        let mut items = self.inner.list(Credentials::Bearer(bearer.clone()), query).await?;
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    #[instrument(skip(self, bearer))]
    pub async fn create_menu(&self, bearer: &Bearer, payload: MenuCreate) -> Result<MenuItem, ApiError> {
        debug!("Sending request");
        self.inner.create(Credentials::Bearer(bearer.clone()), payload).await
    }

    #[instrument(skip(self, bearer))]
    pub async fn update_menu(&self, bearer: &Bearer, id: String, update: MenuUpdate) -> Result<MenuItem, ApiError> {
        debug!("Sending request");
        self.inner.update(Credentials::Bearer(bearer.clone()), id, update).await
    }

    /// Overwrites the stock count and returns the new level.
    #[instrument(skip(self, bearer))]
    pub async fn set_stock(&self, bearer: &Bearer, id: String, stock: u32) -> Result<u32, ApiError> {
        debug!("Sending request");
        let MenuActionResult::Stock(level) = self
            .inner
            .perform_action(Credentials::Bearer(bearer.clone()), id, MenuAction::SetStock(stock))
            .await?;
        Ok(level)
    }
}
