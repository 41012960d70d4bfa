use tracing::instrument;

use crate::clients::AuthClient;
use crate::domain::{Account, AccountCreate, Identity};
use crate::session::Session;

use super::error::WorkflowError;

/// Logs in and adopts the issued token into the session.
#[instrument(skip(auth, session, password))]
pub async fn sign_in(
    auth: &AuthClient,
    session: &Session,
    username: &str,
    password: &str,
) -> Result<Identity, WorkflowError> {
    let bearer = auth
        .login(username.to_string(), password.to_string())
        .await?;
    Ok(session.login(bearer)?)
}

/// Self-registration; the account is always a customer.
#[instrument(skip(auth))]
pub async fn register(auth: &AuthClient, account: AccountCreate) -> Result<Account, WorkflowError> {
    account.validate().map_err(WorkflowError::Validation)?;
    Ok(auth.register(account).await?)
}
