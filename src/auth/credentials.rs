//! Archive server credentials
//!
//! The kiosk needs two opaque values: the archive host and the shared secret
//! every per-archive password is derived from. Both come from the `[server]`
//! config section, with environment variables taking precedence so a `.env`
//! file written by `auth setup` overrides whatever the config file says.

use std::env;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::app::{ArchiveClient, ClientConfig};
use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult};

/// Resolved archive host and shared secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    archive_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("archive_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Validate and wrap a host and secret
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidHost` if `host` is not an absolute http(s)
    /// URL and `AuthError::EmptyInput` if the secret is empty.
    pub fn new(host: impl Into<String>, archive_key: impl Into<String>) -> AuthResult<Self> {
        let host = host.into().trim().to_string();
        let archive_key = archive_key.into();

        let parsed = Url::parse(&host).map_err(|e| AuthError::InvalidHost {
            host: host.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthError::InvalidHost {
                host,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if archive_key.is_empty() {
            return Err(AuthError::EmptyInput {
                field: "Archive key",
            });
        }

        Ok(Self { host, archive_key })
    }

    /// Resolve credentials from the process environment and config values
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either value is missing
    /// from both sources.
    pub fn resolve(configured_host: Option<&str>, configured_key: Option<&str>) -> AuthResult<Self> {
        Self::resolve_with(configured_host, configured_key, |name| env::var(name).ok())
    }

    /// Resolve credentials using `lookup` for environment variables
    pub fn resolve_with<F>(
        configured_host: Option<&str>,
        configured_key: Option<&str>,
        lookup: F,
    ) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, configured: Option<&str>| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .or_else(|| configured.filter(|v| !v.is_empty()).map(str::to_string))
        };

        let host = pick(env_constants::ARCHIVE_HOST, configured_host);
        let key = pick(env_constants::ARCHIVE_KEY, configured_key);

        match (host, key) {
            (Some(host), Some(key)) => {
                debug!(host = %host, "Resolved archive credentials");
                Self::new(host, key)
            }
            _ => Err(AuthError::MissingCredentials),
        }
    }

    /// Archive host URL
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Shared archive secret
    pub fn archive_key(&self) -> &str {
        &self.archive_key
    }
}

/// Credential status information
#[derive(Debug, Clone)]
pub struct CredentialStatus {
    /// Whether a host is available from the environment or config
    pub host_set: bool,
    /// Whether a shared secret is available from the environment or config
    pub key_set: bool,
    /// Whether a .env file exists in the current directory
    pub dotenv_file_exists: bool,
    /// Whether the host answered the index request (None = not tested)
    pub host_reachable: Option<bool>,
}

impl CredentialStatus {
    /// Check if both values are available
    pub fn has_credentials(&self) -> bool {
        self.host_set && self.key_set
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.has_credentials(), self.host_reachable) {
            (false, _) => "Missing credentials - run 'auth setup' to configure".to_string(),
            (true, None) => "Credentials configured but host not checked".to_string(),
            (true, Some(true)) => "Credentials configured and host reachable".to_string(),
            (true, Some(false)) => "Credentials configured but host unreachable".to_string(),
        }
    }
}

/// Check which credential values are available
pub fn get_credential_status(
    configured_host: Option<&str>,
    configured_key: Option<&str>,
) -> CredentialStatus {
    let available = |name: &str, configured: Option<&str>| {
        env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
            || configured.map(|v| !v.is_empty()).unwrap_or(false)
    };

    CredentialStatus {
        host_set: available(env_constants::ARCHIVE_HOST, configured_host),
        key_set: available(env_constants::ARCHIVE_KEY, configured_key),
        dotenv_file_exists: Path::new(auth::ENV_FILE).exists(),
        host_reachable: None,
    }
}

/// Prompt user for credentials interactively
///
/// The secret is read without echo.
pub fn prompt_credentials() -> AuthResult<(String, String)> {
    print!("Archive host URL: ");
    io::stdout().flush()?;

    let mut host = String::new();
    io::stdin().read_line(&mut host)?;
    let host = host.trim().to_string();

    if host.is_empty() {
        return Err(AuthError::EmptyInput { field: "Host" });
    }

    let archive_key = rpassword::prompt_password("Archive key: ")
        .map_err(|e| AuthError::CredentialStorage(io::Error::new(io::ErrorKind::Other, e)))?;

    // Validates both values before anything is written
    let credentials = Credentials::new(host, archive_key)?;
    Ok((credentials.host, credentials.archive_key))
}

/// Save credentials to a dotenv file with owner-only permissions
///
/// Existing assignments of the two variables are replaced in place; every
/// other line is preserved.
pub fn save_credentials(env_path: &Path, host: &str, archive_key: &str) -> AuthResult<()> {
    let host_line = format!("{}={}", env_constants::ARCHIVE_HOST, host);
    let key_line = format!("{}={}", env_constants::ARCHIVE_KEY, archive_key);
    let host_prefix = format!("{}=", env_constants::ARCHIVE_HOST);
    let key_prefix = format!("{}=", env_constants::ARCHIVE_KEY);

    let mut lines = Vec::new();
    let mut host_found = false;
    let mut key_found = false;

    if env_path.exists() {
        let reader = BufReader::new(File::open(env_path)?);
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();

            if trimmed.starts_with(&host_prefix) {
                lines.push(host_line.clone());
                host_found = true;
            } else if trimmed.starts_with(&key_prefix) {
                lines.push(key_line.clone());
                key_found = true;
            } else {
                lines.push(line);
            }
        }
    }

    if !host_found {
        lines.push(host_line);
    }
    if !key_found {
        lines.push(key_line);
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(env_path)?;

    for line in lines {
        writeln!(file, "{}", line)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(auth::ENV_FILE_PERMISSIONS);
        file.set_permissions(perms)?;
    }

    debug!(path = %env_path.display(), "Saved archive credentials");
    Ok(())
}

/// Check that the archive host answers the index request
///
/// The shared secret cannot be checked without downloading an archive, so
/// only reachability of the host is verified.
pub async fn verify_credentials(
    credentials: &Credentials,
    client_config: &ClientConfig,
) -> AuthResult<bool> {
    let client = match ArchiveClient::new(credentials.host(), client_config, ".") {
        Ok(client) => client,
        Err(e) => {
            println!("Could not create client: {}", e);
            return Ok(false);
        }
    };

    match client.fetch_listing().await {
        Ok(listing) => {
            println!("Host reachable, {} archives published", listing.len());
            Ok(true)
        }
        Err(e) => {
            println!("Host check failed: {}", e);
            Ok(false)
        }
    }
}

/// Interactive credential setup workflow
pub async fn setup_credentials(client_config: &ClientConfig) -> AuthResult<()> {
    println!("Paper Kiosk Credential Setup");
    println!("============================");
    println!();
    println!("Enter the archive host and the shared archive key.");
    println!("They will be stored in a .env file in the current directory.");
    println!();

    let env_path = Path::new(auth::ENV_FILE);
    let (host, archive_key) = prompt_credentials()?;

    println!();
    save_credentials(env_path, &host, &archive_key)?;
    println!("Credentials saved to {}", env_path.display());

    #[cfg(unix)]
    println!("File permissions set to owner-only (600)");

    println!();
    println!("Checking host...");
    let credentials = Credentials::new(host, archive_key)?;
    if verify_credentials(&credentials, client_config).await? {
        println!("Setup complete! You can now run 'sync'.");
    } else {
        println!("Credentials saved, but the host could not be reached.");
        println!("   Run 'auth status --check' once the server is available.");
    }

    Ok(())
}

/// Show current credential status
pub async fn show_credential_status(
    configured_host: Option<&str>,
    configured_key: Option<&str>,
    check_host: bool,
    client_config: &ClientConfig,
) -> AuthResult<()> {
    let mut status = get_credential_status(configured_host, configured_key);

    if check_host && status.has_credentials() {
        let credentials = Credentials::resolve(configured_host, configured_key)?;
        status.host_reachable = Some(verify_credentials(&credentials, client_config).await?);
    }

    let mark = |set: bool| if set { "set" } else { "not set" };

    println!("Paper Kiosk Credential Status");
    println!("=============================");
    println!("Host:        {}", mark(status.host_set));
    println!("Archive key: {}", mark(status.key_set));
    println!(
        ".env file:   {}",
        if status.dotenv_file_exists {
            "present"
        } else {
            "absent"
        }
    );
    println!();
    println!("{}", status.status_message());

    Ok(())
}
