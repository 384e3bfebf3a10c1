//! Credential management for the archive server
//!
//! This module resolves the archive host and shared archive key from the
//! configuration and environment, and provides the interactive setup that
//! stores them in a .env file.
//!
//! # Examples
//!
//! ```rust,no_run
//! use paper_kiosk::auth::Credentials;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // PAPER_KIOSK_HOST / PAPER_KIOSK_ARCHIVE_KEY win over the configured values
//! let credentials = Credentials::resolve(Some("https://archive.example/"), None)?;
//! println!("Syncing from {}", credentials.host());
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    get_credential_status, prompt_credentials, save_credentials, setup_credentials,
    show_credential_status, verify_credentials, CredentialStatus, Credentials,
};
