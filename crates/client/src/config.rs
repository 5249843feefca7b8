//! Environment resolution and client configuration.
//!
//! The backend address is decided once, at startup, and carried around as an
//! explicit [`ClientConfig`] value so tests can substitute their own.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};

pub const DEFAULT_LOCAL_URL: &str = "http://localhost:3000";
pub const DEFAULT_PRODUCTION_URL: &str = "https://drivers-back-479x.onrender.com";

/// Resource path of the report collection on the backend.
pub const COLLECTION_PATH: &str = "/drivers";

/// How long a user-visible notice stays up.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);

pub const ENV_HOST: &str = "SHIFTREPORT_HOST";
pub const ENV_LOCAL_URL: &str = "SHIFTREPORT_LOCAL_URL";
pub const ENV_PRODUCTION_URL: &str = "SHIFTREPORT_PRODUCTION_URL";
pub const ENV_API_URL: &str = "SHIFTREPORT_API_URL";
pub const ENV_DATA_DIR: &str = "SHIFTREPORT_DATA_DIR";
pub const ENV_UTC_OFFSET: &str = "SHIFTREPORT_UTC_OFFSET";

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn for_host(hostname: &str) -> Self {
        if is_production_host(hostname) {
            Environment::Production
        } else {
            Environment::Local
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

/// True unless `hostname` is locally addressed.
///
/// Local means: empty, anything mentioning `localhost`, or a loopback or
/// unspecified IP literal (`127.0.0.1`, `127.8.0.1`, `::1`, `0.0.0.0`).
pub fn is_production_host(hostname: &str) -> bool {
    let host = hostname
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();

    if host.is_empty() || host.contains("localhost") {
        return false;
    }

    match host.parse::<IpAddr>() {
        Ok(ip) => !(ip.is_loopback() || ip.is_unspecified()),
        Err(_) => true,
    }
}

/// The two configured backend base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub local_url: String,
    pub production_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            local_url: DEFAULT_LOCAL_URL.to_string(),
            production_url: DEFAULT_PRODUCTION_URL.to_string(),
        }
    }
}

/// Everything the flows need to know about their surroundings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    /// Explicit base URL; wins over the environment's choice.
    pub api_url: Option<String>,
    /// Directory holding the persisted offline queue.
    pub storage_dir: PathBuf,
    /// Offset used for calendar-day filtering and date formatting.
    pub utc_offset: FixedOffset,
    pub notice_ttl: Duration,
}

impl ClientConfig {
    /// Configuration for a client running on `hostname`, with default URLs.
    pub fn for_host(hostname: &str) -> Self {
        Self {
            environment: Environment::for_host(hostname),
            backend: BackendConfig::default(),
            api_url: None,
            storage_dir: default_storage_dir(),
            utc_offset: local_offset(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }

    /// Build the configuration from `SHIFTREPORT_*` environment variables.
    ///
    /// Never fails: unset or unusable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var(ENV_HOST).unwrap_or_else(|| "localhost".to_string());
        let mut config = Self::for_host(&host);

        if let Some(url) = var(ENV_LOCAL_URL) {
            config.backend.local_url = trim_base_url(&url);
        }
        if let Some(url) = var(ENV_PRODUCTION_URL) {
            config.backend.production_url = trim_base_url(&url);
        }
        if let Some(url) = var(ENV_API_URL) {
            config = config.with_api_url(url);
        }
        if let Some(dir) = var(ENV_DATA_DIR) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(raw) = var(ENV_UTC_OFFSET) {
            match parse_utc_offset(&raw) {
                Some(offset) => config.utc_offset = offset,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring unparsable SHIFTREPORT_UTC_OFFSET; using local offset {}",
                    config.utc_offset
                ),
            }
        }

        tracing::info!(
            host = %host,
            environment = config.environment.as_str(),
            backend = config.backend_base_url(),
            storage_dir = %config.storage_dir.display(),
            "client configuration resolved"
        );

        config
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = BackendConfig {
            local_url: trim_base_url(&backend.local_url),
            production_url: trim_base_url(&backend.production_url),
        };
        self
    }

    pub fn with_api_url(mut self, url: impl AsRef<str>) -> Self {
        self.api_url = Some(trim_base_url(url.as_ref()));
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn backend_base_url(&self) -> &str {
        if let Some(url) = &self.api_url {
            return url;
        }
        match self.environment {
            Environment::Local => &self.backend.local_url,
            Environment::Production => &self.backend.production_url,
        }
    }

    /// `{base}/drivers`.
    pub fn collection_endpoint(&self) -> String {
        format!("{}{}", self.backend_base_url(), COLLECTION_PATH)
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// `{os data dir}/shiftreport`, falling back to `~/.local/share/shiftreport`
/// and finally to a relative `.shiftreport` directory.
pub fn default_storage_dir() -> PathBuf {
    let base = dirs::data_dir().or_else(|| {
        dirs::home_dir().map(|mut h| {
            h.push(".local");
            h.push("share");
            h
        })
    });

    match base {
        Some(mut dir) => {
            dir.push("shiftreport");
            dir
        }
        None => PathBuf::from(".shiftreport"),
    }
}

/// Parse `Z`, `+HH`, `+HHMM` or `+HH:MM` (either sign) into an offset.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
