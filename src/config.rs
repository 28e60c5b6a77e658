use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate: RateConfig,
    /// Which environment variables were set when the config was loaded.
    #[serde(skip)]
    pub env: EnvPresence,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Public URL the webhook is registered under, e.g. "https://bot.example.com"
    #[serde(default)]
    pub base_url: Option<String>,
    /// Looked up with getMe at startup when not set
    #[serde(default)]
    pub bot_username: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateConfig {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Digits after the decimal point in rate replies.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            timeout_secs: default_timeout_secs(),
            decimals: default_decimals(),
        }
    }
}

impl RateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct EnvPresence {
    pub telegram_token: bool,
    pub token: bool,
    pub base_url: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_source_url() -> String {
    "https://www.boc.cn/sourcedb/whpj/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_decimals() -> usize {
    4
}

/// Shows the first 6 and last 4 characters of a secret.
pub fn mask(secret: Option<&str>) -> String {
    match secret {
        None | Some("") => "None".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= 10 {
                return "*".repeat(chars.len());
            }
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

impl Config {
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram.bot_token.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.telegram.base_url.as_deref()
    }

    pub fn masked_token(&self) -> String {
        mask(self.bot_token())
    }

    /// The URL Telegram should deliver updates to, if both token and base URL are known.
    pub fn webhook_url(&self) -> Option<String> {
        let token = self.bot_token()?;
        let base = self.base_url()?;
        Some(format!("{}/webhook/{}", base.trim_end_matches('/'), token))
    }

    /// Load from a TOML file (missing file means defaults), then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else {
            String::new()
        };

        Self::from_sources(&content, |key| std::env::var(key).ok())
            .with_context(|| format!("Invalid configuration ({})", path.display()))
    }

    pub fn from_sources<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config =
            toml::from_str(content).context("Failed to parse config file")?;

        // Blank variables count as unset
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let telegram_token = var("TELEGRAM_TOKEN");
        let token = var("TOKEN");
        let base_url = var("BASE_URL");

        config.env = EnvPresence {
            telegram_token: telegram_token.is_some(),
            token: token.is_some(),
            base_url: base_url.is_some(),
        };

        if let Some(t) = telegram_token.or(token) {
            config.telegram.bot_token = Some(t);
        }
        if let Some(url) = base_url {
            config.telegram.base_url = Some(url);
        }
        if let Some(port) = var("PORT") {
            config.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }

        // An empty token in the file is the same as no token
        if config.bot_token().is_some_and(str::is_empty) {
            config.telegram.bot_token = None;
        }
        if config.base_url().is_some_and(str::is_empty) {
            config.telegram.base_url = None;
        }
        if config
            .telegram
            .bot_username
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            config.telegram.bot_username = None;
        }

        anyhow::ensure!(
            config.rate.timeout_secs > 0,
            "rate.timeout_secs must be at least 1"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(content: &str, vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(content, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = load("", &[]).unwrap();
        assert_eq!(config.bot_token(), None);
        assert_eq!(config.base_url(), None);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rate.timeout_secs, 10);
        assert_eq!(config.rate.decimals, 4);
        assert_eq!(config.env, EnvPresence::default());
    }

    #[test]
    fn test_toml_sections() {
        let content = r#"
[telegram]
bot_token = "123:abc"
base_url = "https://bot.example.com/"

[server]
port = 9000

[rate]
timeout_secs = 3
decimals = 2
"#;
        let config = load(content, &[]).unwrap();
        assert_eq!(config.bot_token(), Some("123:abc"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.rate.timeout(), Duration::from_secs(3));
        assert_eq!(config.rate.decimals, 2);
        assert_eq!(
            config.webhook_url().as_deref(),
            Some("https://bot.example.com/webhook/123:abc")
        );
    }

    #[test]
    fn test_telegram_token_preferred_over_token() {
        let config = load("", &[("TELEGRAM_TOKEN", "primary"), ("TOKEN", "fallback")]).unwrap();
        assert_eq!(config.bot_token(), Some("primary"));
        assert!(config.env.telegram_token);
        assert!(config.env.token);
    }

    #[test]
    fn test_token_fallback() {
        let config = load("", &[("TOKEN", "fallback")]).unwrap();
        assert_eq!(config.bot_token(), Some("fallback"));
        assert!(!config.env.telegram_token);
    }

    #[test]
    fn test_env_overrides_file() {
        let content = "[telegram]\nbot_token = \"from-file\"\n";
        let config = load(content, &[("TOKEN", "from-env"), ("PORT", "8443")]).unwrap();
        assert_eq!(config.bot_token(), Some("from-env"));
        assert_eq!(config.server.port, 8443);
    }

    #[test]
    fn test_blank_env_ignored() {
        let config = load("", &[("BASE_URL", "  "), ("TOKEN", "")]).unwrap();
        assert_eq!(config.base_url(), None);
        assert_eq!(config.bot_token(), None);
        assert!(!config.env.base_url);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(load("", &[("PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load("[rate]\ntimeout_secs = 0\n", &[]).unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs"));
        assert!(load("[rate]\ntimeout_secs = 1\n", &[]).is_ok());
    }

    #[test]
    fn test_bot_username() {
        let config = load("[telegram]\nbot_username = \"fx_bot\"\n", &[]).unwrap();
        assert_eq!(config.telegram.bot_username.as_deref(), Some("fx_bot"));
        let config = load("[telegram]\nbot_username = \"\"\n", &[]).unwrap();
        assert_eq!(config.telegram.bot_username, None);
    }

    #[test]
    fn test_webhook_url_requires_both() {
        let config = load("", &[("TOKEN", "t")]).unwrap();
        assert_eq!(config.webhook_url(), None);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(None), "None");
        assert_eq!(mask(Some("")), "None");
        assert_eq!(mask(Some("short")), "*****");
        assert_eq!(mask(Some("123456789:ABCDEFGHIJ")), "123456...GHIJ");
    }
}
