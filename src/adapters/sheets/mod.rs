//! Google Sheets Adapters - Spreadsheet Publishing
//!
//! `GoogleOAuth` implements the `CredentialProvider` port with the
//! authorization-code flow; `GoogleSheetsClient` implements the
//! `SpreadsheetService` port on the Sheets v4 REST API.

pub mod client;
pub mod oauth;
pub mod types;

pub use client::GoogleSheetsClient;
pub use oauth::GoogleOAuth;
