use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A user's active connection record for one venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCredential {
    pub id: i64,
    pub user_id: i64,
    pub venue: String,
    /// Identity of the linked account on the venue side
    pub venue_account_id: Option<String>,
}

/// Credential lookup, provided by the external connection-management service.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The user's active credential for a venue; `DeskError::NotFound` when
    /// the user has no active connection there.
    async fn active_credential(&self, user_id: i64, venue: &str) -> Result<ExchangeCredential>;
}
