//! Credential Port - Delegated Spreadsheet Authorization
//!
//! The user grants access once through the OAuth consent flow; the
//! resulting token lives in process memory until restart.

use async_trait::async_trait;

use crate::error::SyncResult;

/// Trait for delegated credential holders.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    /// Consent page the `/login` endpoint redirects to.
    fn authorize_url(&self) -> String;

    /// The local endpoint a user must visit to authorize.
    fn login_url(&self) -> String;

    /// Exchange an authorization code for a credential and keep it.
    async fn authorize(&self, code: &str) -> SyncResult<()>;

    /// Whether a credential is held.
    async fn is_authorized(&self) -> bool;

    /// A currently valid bearer token, refreshed if it has expired.
    ///
    /// # Errors
    /// `Unauthorized` when no credential is held or its grant was revoked;
    /// `TokenRefreshUnavailable` when renewal failed for a transient reason
    /// and the credential is still held.
    async fn access_token(&self) -> SyncResult<String>;
}
