//! Pipeline Error Taxonomy
//!
//! Every port returns `SyncError` so the orchestrator can tell transient
//! faults (next scheduled run may succeed) from permanent ones that need
//! an operator or a user to act.

use std::fmt;

use thiserror::Error;

/// Result alias used by all ports and use cases.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the tariff synchronization pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network failure, timeout or non-success status from the tariff API.
    #[error("tariff provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The tariff API answered with a body we cannot interpret.
    #[error("tariff provider contract violation: {0}")]
    ProviderContractViolation(String),

    /// Any persistence failure.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// No delegated spreadsheet credential is available.
    #[error("authorization required: visit {login_url} to grant spreadsheet access")]
    Unauthorized {
        /// Endpoint the user must open to authorize.
        login_url: String,
    },

    /// Exchanging or refreshing the OAuth token failed.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The token endpoint could not refresh a still-valid grant; the
    /// credential is kept for the next attempt.
    #[error("token refresh unavailable: {0}")]
    TokenRefreshUnavailable(String),

    /// Benign destination conflict (the sheet already exists).
    #[error("destination {destination}: {message}")]
    DestinationConflict {
        /// Spreadsheet id.
        destination: String,
        /// Message returned by the spreadsheet service.
        message: String,
    },

    /// Non-benign failure talking to a spreadsheet destination.
    #[error("destination {destination} failed: {message}")]
    Destination {
        /// Spreadsheet id.
        destination: String,
        /// Failure description.
        message: String,
    },

    /// One or more destinations failed during a fan-out publish.
    #[error(transparent)]
    Publish(#[from] PublishFailures),
}

impl SyncError {
    /// Whether the next scheduled run may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_)
            | Self::StorageUnavailable(_)
            | Self::TokenRefreshUnavailable(_)
            | Self::Destination { .. } => true,
            Self::Publish(failures) => failures.failures.iter().all(|(_, e)| e.is_transient()),
            Self::ProviderContractViolation(_)
            | Self::Unauthorized { .. }
            | Self::Authorization(_)
            | Self::DestinationConflict { .. } => false,
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::ProviderContractViolation(_) => "provider_contract_violation",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Authorization(_) => "authorization",
            Self::TokenRefreshUnavailable(_) => "token_refresh_unavailable",
            Self::DestinationConflict { .. } => "destination_conflict",
            Self::Destination { .. } => "destination",
            Self::Publish(_) => "publish",
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

/// Aggregate of per-destination failures from one publish fan-out.
#[derive(Debug)]
pub struct PublishFailures {
    /// Number of destinations attempted.
    pub attempted: usize,
    /// Failed destinations with their errors, in configuration order.
    pub failures: Vec<(String, SyncError)>,
}

impl fmt::Display for PublishFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} destinations failed",
            self.failures.len(),
            self.attempted
        )?;
        for (destination, err) in &self.failures {
            write!(f, "; {destination}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PublishFailures {}
