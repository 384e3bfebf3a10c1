//! Paper Kiosk Library
//!
//! Archive synchronization and page navigation engine for a newspaper kiosk
//! reader. Dated, password-protected page archives are fetched from an
//! archive server, unpacked into per-page images and recorded in a
//! persisted catalog that a navigation state machine walks through.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, ErrorKind, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::{env, http};

    #[test]
    fn test_constants_accessible() {
        assert_eq!(env::ARCHIVE_HOST, "PAPER_KIOSK_HOST");
        assert_eq!(env::ARCHIVE_KEY, "PAPER_KIOSK_ARCHIVE_KEY");
        assert!(http::USER_AGENT.starts_with("Paper-Kiosk"));
    }

    #[test]
    fn test_error_types() {
        let auth_error = errors::AuthError::MissingCredentials;
        let app_error = AppError::Auth(auth_error);

        assert_eq!(app_error.category(), "auth");
        assert_eq!(app_error.kind(), ErrorKind::Config);
        assert!(!app_error.is_recoverable());
    }
}
