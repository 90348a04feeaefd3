//! CLI configuration

use anyhow::Result;
use bookfair_client::BookfairClient;
use bookfair_client::session::DEFAULT_SKEW_BUFFER_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

/// Portal connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Backend base URL
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Subtracted from every token lifetime before it is stored
    pub skew_buffer_ms: i64,
    /// User agent sent with every request
    pub user_agent: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            skew_buffer_ms: DEFAULT_SKEW_BUFFER_MS,
            user_agent: None,
        }
    }
}

impl PortalConfig {
    /// Load configuration from defaults, a config file and `BOOKFAIR_*`
    /// environment variables, later sources winning.
    ///
    /// An explicitly given file must exist; the default
    /// `<state dir>/config.toml` is optional.
    pub fn load(path: Option<&Path>, state_dir: &Path) -> Result<Self> {
        let defaults = Self::default();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(state_dir.join(CONFIG_FILE)).required(false),
        };

        let settings = config::Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("skew_buffer_ms", defaults.skew_buffer_ms)?
            .add_source(file)
            .add_source(config::Environment::with_prefix("BOOKFAIR").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Build a portal client that keeps its session in `session_path`
    pub fn client(&self, session_path: PathBuf) -> Result<BookfairClient> {
        let mut builder = BookfairClient::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .skew_buffer_ms(self.skew_buffer_ms)
            .session_store(std::sync::Arc::new(
                bookfair_client::FileSessionStore::new(session_path),
            ));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        Ok(builder.build()?)
    }
}

/// Resolve the state directory: explicit flag or `BOOKFAIR_STATE_DIR`, else the
/// platform data directory.
pub fn state_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookfair")
    })
}
