use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub token: Token,
    pub store: Store,
    #[serde(default)]
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    // TLS is enabled only when both paths are set
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Token {
    pub issuer: String,
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_reuse_threshold_secs")]
    pub reuse_threshold_secs: u64,
}

impl Token {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn reuse_threshold(&self) -> Duration {
        Duration::from_secs(self.reuse_threshold_secs)
    }
}

// secrets stay out of `info!(?settings)`
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("reuse_threshold_secs", &self.reuse_threshold_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "redis" or "memory"
    #[serde(default)]
    pub redis_url: String,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Store {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Account {
    #[serde(default = "default_account_backend")]
    pub backend: String, // "fake"
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Account {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Account {
    fn default() -> Self {
        Account {
            backend: default_account_backend(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_access_ttl_secs() -> u64 {
    15 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_reuse_threshold_secs() -> u64 {
    24 * 60 * 60
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_account_backend() -> String {
    "fake".to_string()
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let token = &self.token;
        if token.access_secret.is_empty() || token.refresh_secret.is_empty() {
            bail!("token.access_secret and token.refresh_secret must be set");
        }
        if token.access_secret == token.refresh_secret {
            bail!("token.access_secret and token.refresh_secret must differ");
        }
        if token.access_ttl_secs == 0 {
            bail!("token.access_ttl_secs must be positive");
        }
        if token.access_ttl_secs >= token.refresh_ttl_secs {
            bail!("token.access_ttl_secs must be shorter than token.refresh_ttl_secs");
        }
        if token.reuse_threshold_secs >= token.refresh_ttl_secs {
            bail!("token.reuse_threshold_secs must be shorter than token.refresh_ttl_secs");
        }
        if self.store.backend == "redis" && self.store.redis_url.is_empty() {
            bail!("store.redis_url is required for the redis backend");
        }
        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http.cert_path and http.key_path must be set together");
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub const ENV_PREFIX: &str = "TOKENWARD";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const BASE: &str = r#"
        [http]
        address = "127.0.0.1:8080"

        [log]
        filter = "info"

        [token]
        issuer = "tokenward"
        access_secret = "a"
        refresh_secret = "r"

        [store]
        backend = "memory"
    "#;

    fn load(extra: &str) -> Result<Settings> {
        let toml = format!("{}\n{}", BASE, extra);
        let settings: Settings = Config::builder()
            .add_source(File::from_str(&toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn defaults_fill_in_lifetimes_and_timeouts() {
        let s = load("").unwrap();
        assert_eq!(s.token.access_ttl(), Duration::from_secs(900));
        assert_eq!(s.token.refresh_ttl(), Duration::from_secs(604800));
        assert_eq!(s.token.reuse_threshold(), Duration::from_secs(86400));
        assert_eq!(s.store.op_timeout(), Duration::from_secs(5));
        assert_eq!(s.account.backend, "fake");
        assert_eq!(s.store.key_prefix, "");
        assert!(s.http.cert_path.is_none());
    }

    #[test]
    fn identical_secrets_are_rejected() {
        let s = load("").unwrap();
        let mut token = s.token;
        token.refresh_secret = token.access_secret.clone();
        let s = Settings { token, ..s };
        assert!(s.validate().is_err());
    }

    #[test]
    fn reuse_threshold_must_be_below_refresh_ttl() {
        let s = load("").unwrap();
        let mut token = s.token;
        token.reuse_threshold_secs = token.refresh_ttl_secs;
        let s = Settings { token, ..s };
        assert!(s.validate().is_err());
    }

    #[test]
    fn redis_backend_needs_url() {
        let mut s = load("").unwrap();
        s.store.backend = "redis".into();
        assert!(s.validate().is_err());
        s.store.redis_url = "redis://127.0.0.1:6379".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let s = load("").unwrap();
        let shown = format!("{:?}", s.token);
        assert!(shown.contains("tokenward"));
        assert!(!shown.contains("access_secret"));
    }
}
