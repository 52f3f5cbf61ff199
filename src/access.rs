use serde::Serialize;

use crate::db::Store;
use crate::error::{AppError, Result};

pub const ADMIN_ROLE: &str = "admin";

/// Who is asking. Identity is established upstream; the HTTP layer only
/// forwards the user id it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Background tasks inside this process.
    System,
    User(String),
    Anonymous,
}

impl Caller {
    pub fn from_user_id(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Caller::User(id.to_string()),
            None => Caller::Anonymous,
        }
    }
}

/// Snapshot of the caller's standing, embedded in sync failure records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerState {
    pub authenticated: bool,
    pub admin_user: bool,
}

impl CallerState {
    /// `Unauthorized` without an identity, `Forbidden` without the admin role.
    pub fn ensure_admin(&self) -> Result<()> {
        if !self.authenticated {
            return Err(AppError::Unauthorized);
        }
        if !self.admin_user {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AccessControl {
    store: Store,
}

impl AccessControl {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn caller_is_admin(&self, caller: &Caller) -> Result<bool> {
        match caller {
            Caller::System => Ok(true),
            Caller::Anonymous => Ok(false),
            Caller::User(id) => Ok(self.store.profile_role(id).await?.as_deref() == Some(ADMIN_ROLE)),
        }
    }

    pub async fn describe(&self, caller: &Caller) -> Result<CallerState> {
        Ok(CallerState {
            authenticated: !matches!(caller, Caller::Anonymous),
            admin_user: self.caller_is_admin(caller).await?,
        })
    }

    pub async fn require_admin(&self, caller: &Caller) -> Result<CallerState> {
        let state = self.describe(caller).await?;
        state.ensure_admin()?;
        Ok(state)
    }
}
