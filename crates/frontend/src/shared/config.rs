//! Client configuration
//!
//! Defaults are embedded as TOML; individual values can be overridden from the
//! page query string, e.g. `index.html?user_id=alice&api_base=http://host:8000`.

use contracts::domain::a001_wellbot_chat::session::AttachmentPolicy;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub api_base: String,
    /// 0 disables the timeout
    #[serde(default)]
    pub request_timeout_ms: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionConfig {
    pub user_id: String,
    #[serde(default)]
    pub user_conditions: Vec<String>,
    #[serde(default = "default_true")]
    pub clear_attachment_on_success: bool,
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    pub fn attachment_policy(&self) -> AttachmentPolicy {
        if self.clear_attachment_on_success {
            AttachmentPolicy::ClearOnSuccess
        } else {
            AttachmentPolicy::Keep
        }
    }
}

/// Query string overrides
#[derive(Debug, Deserialize, Default)]
struct ConfigOverrides {
    api_base: Option<String>,
    user_id: Option<String>,
    timeout_ms: Option<u32>,
}

/// Default configuration embedded in the bundle
pub const DEFAULT_CONFIG: &str = r#"
[server]
api_base = "http://localhost:8000"
request_timeout_ms = 60000

[session]
user_id = "user123"
user_conditions = []
clear_attachment_on_success = true
"#;

/// Build the configuration from a TOML document and a query string (with or without `?`)
pub fn resolve_config(defaults: &str, query: &str) -> anyhow::Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(defaults)?;

    let query = query.trim_start_matches('?');
    if query.is_empty() {
        return Ok(config);
    }

    let overrides: ConfigOverrides = serde_qs::from_str(query)
        .map_err(|e| anyhow::anyhow!("invalid query overrides: {e}"))?;

    if let Some(api_base) = overrides.api_base.filter(|s| !s.trim().is_empty()) {
        config.server.api_base = api_base;
    }
    if let Some(user_id) = overrides.user_id.filter(|s| !s.trim().is_empty()) {
        config.session.user_id = user_id;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.server.request_timeout_ms = timeout_ms;
    }

    Ok(config)
}

/// Load configuration for the running page
///
/// Falls back to the embedded defaults when the query string can't be parsed.
pub fn load_config() -> AppConfig {
    let query = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default();

    match resolve_config(DEFAULT_CONFIG, &query) {
        Ok(config) => {
            log::info!(
                "✅ Config loaded: api_base={}, user_id={}",
                config.server.api_base,
                config.session.user_id
            );
            config
        }
        Err(e) => {
            log::warn!("❌ Failed to apply config overrides ({}), using defaults", e);
            default_config()
        }
    }
}

fn default_config() -> AppConfig {
    // DEFAULT_CONFIG is covered by tests
    toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| AppConfig {
        server: ServerConfig {
            api_base: "http://localhost:8000".to_string(),
            request_timeout_ms: 60000,
        },
        session: SessionConfig {
            user_id: "user123".to_string(),
            user_conditions: Vec::new(),
            clear_attachment_on_success: true,
        },
    })
}
