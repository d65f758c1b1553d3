//! Azure login check.

use super::cli;
use crate::error::{FwError, Result};
use crate::models::Session;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct AzAccount {
    id: String,
    name: String,
    user: Option<AzUser>,
}

#[derive(Deserialize, Debug)]
struct AzUser {
    name: String,
}

impl From<AzAccount> for Session {
    fn from(account: AzAccount) -> Self {
        Session {
            subscription_id: account.id,
            subscription_name: account.name,
            user: account.user.map(|u| u.name).unwrap_or_default(),
        }
    }
}

/// Parse `az account show` output.
pub fn parse_account(json: &str) -> Result<Session> {
    let account: AzAccount = cli::parse_json(json, "az account show")?;
    Ok(account.into())
}

/// Verify there is a usable `az` login and return its default subscription.
///
/// Any failure here is fatal for the run.
pub fn check_session() -> Result<Session> {
    let output = cli::run("az account show --output json")
        .map_err(|e| FwError::Auth(e.to_string()))?;
    let session = parse_account(&output).map_err(|e| FwError::Auth(e.to_string()))?;
    log::info!(
        "Using subscription '{}' ({}) as {}",
        session.subscription_name,
        session.subscription_id,
        session.user
    );
    Ok(session)
}
