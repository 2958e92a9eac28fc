//! Connection settings for a repository session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SERVER: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4064;
/// Port OMERO.web listens on when no web URL is given.
pub const DEFAULT_WEB_PORT: u16 = 4080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything needed to open a scoped session, except the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Repository server host.
    pub server: String,
    /// Repository server port.
    pub port: u16,
    /// Base URL of the web gateway. Derived from `server` when absent.
    pub web_url: Option<String>,
    /// Administrative account used to log in.
    pub admin_user: String,
    /// Account owning the images.
    pub user: String,
    /// Group the orphan search is scoped to.
    pub group: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ConnectionConfig {
    pub fn new(
        admin_user: impl Into<String>,
        user: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            server: DEFAULT_SERVER.into(),
            port: DEFAULT_PORT,
            web_url: None,
            admin_user: admin_user.into(),
            user: user.into(),
            group: group.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Web gateway base URL without a trailing slash.
    pub fn web_url(&self) -> String {
        match &self.web_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.server, DEFAULT_WEB_PORT),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject settings that cannot produce a session.
    pub fn validate(&self) -> Result<()> {
        for (flag, value) in [
            ("server", &self.server),
            ("sudo", &self.admin_user),
            ("user", &self.user),
            ("group", &self.group),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("--{} must not be empty", flag)));
            }
        }
        if self.port == 0 {
            return Err(Error::Config("--port must be between 1 and 65535".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("--timeout must be at least one second".into()));
        }
        let url = self.web_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "web URL must start with http:// or https:// (got {})",
                url
            )));
        }
        Ok(())
    }
}
