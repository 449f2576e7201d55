use serde::{Deserialize, Serialize};
use shroud_types::{ShroudError, ShroudResult};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::constants::{CONFIG_FILE_NAME, DATA_DIR_NAME, MIN_BODY_BYTES, MIN_SECRET_LEN};
use super::fetch::FetchConfig;
use super::logging::LoggingConfig;
use super::rewrite::RewriteConfig;
use super::security::SecurityConfig;
use super::server::ServerConfig;
use super::types::{LogLevel, SecurityWarning, WarningSeverity};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShroudConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub rewrite: RewriteConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl ShroudConfig {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/etc/shroud"))
            .join(CONFIG_FILE_NAME)
    }

    pub fn load(path: impl AsRef<Path>) -> ShroudResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ShroudError::Config(format!("Failed to read config: {}", e)))?;
            Self::from_toml(&contents)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ShroudResult<Self> {
        toml::from_str(contents)
            .map_err(|e| ShroudError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ShroudResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ShroudError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ShroudError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| ShroudError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("SHROUD_SIGNING_SECRET") {
            self.security.signing_secret = Some(secret);
        }

        if let Some(bind) = lookup("SHROUD_BIND") {
            if let Ok(addr) = bind.parse::<IpAddr>() {
                self.server.bind_address = addr;
                if !addr.is_loopback() {
                    warn!(
                        "Proxy binding to non-localhost address: {}. Ensure proper firewall rules.",
                        bind
                    );
                }
            }
        }

        if let Some(port) = lookup("SHROUD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Some(level) = lookup("SHROUD_LOG_LEVEL") {
            self.logging.level = LogLevel::parse_lenient(&level);
        }

        if lookup("SHROUD_LOG_JSON").is_some() {
            self.logging.json = true;
        }

        if let Some(timeout) = lookup("SHROUD_FETCH_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.fetch.timeout_ms = ms;
            }
        }
    }

    pub fn validate(&self) -> ShroudResult<()> {
        if self.server.port == 0 {
            return Err(ShroudError::Config("Server port cannot be 0".into()));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ShroudError::Config("Request timeout must be at least 1 second".into()));
        }

        if self.fetch.timeout_ms == 0 {
            return Err(ShroudError::Config("Fetch timeout cannot be 0".into()));
        }

        if self.fetch.max_body_bytes < MIN_BODY_BYTES {
            return Err(ShroudError::Config(format!(
                "Max body size must be at least {} bytes",
                MIN_BODY_BYTES
            )));
        }

        for (name, path) in [
            ("proxy_path", &self.rewrite.proxy_path),
            ("image_path", &self.rewrite.image_path),
        ] {
            if !path.starts_with('/') || path.len() < 2 {
                return Err(ShroudError::Config(format!(
                    "rewrite.{} must be an absolute path, got {:?}",
                    name, path
                )));
            }
        }

        if !self.rewrite.image_path.ends_with('/') {
            return Err(ShroudError::Config(
                "rewrite.image_path must end with '/'".into(),
            ));
        }

        if self.rewrite.proxy_path == self.rewrite.image_path {
            return Err(ShroudError::Config(
                "Proxy and image endpoints cannot share a path".into(),
            ));
        }

        if let Some(secret) = self.security.signing_secret.as_deref() {
            if !secret.is_empty() && secret.len() < MIN_SECRET_LEN {
                return Err(ShroudError::Config(format!(
                    "signing_secret must be at least {} bytes",
                    MIN_SECRET_LEN
                )));
            }
        }

        Ok(())
    }

    pub fn check_security_warnings(&self) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        if !self.server.require_signature {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::High,
                message: "Signature checks are disabled. The proxy will fetch any URL it is handed.".into(),
                recommendation: "Set server.require_signature = true.".into(),
            });
        }

        if !self.fetch.block_private_networks {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::High,
                message: "Private network destinations are allowed.".into(),
                recommendation: "Set fetch.block_private_networks = true unless this is a test setup.".into(),
            });
        }

        if !self.is_localhost_only() {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Medium,
                message: format!("Proxy bound to non-localhost address: {}", self.server.bind_address),
                recommendation: "Ensure firewall rules restrict access. Use localhost binding if possible.".into(),
            });
        }

        if !self.security.has_secret() {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Low,
                message: "No signing secret configured; links are only valid until restart.".into(),
                recommendation: "Set SHROUD_SIGNING_SECRET or security.signing_secret.".into(),
            });
        }

        warnings
    }

    pub fn log_security_warnings(&self) {
        let warnings = self.check_security_warnings();
        if warnings.is_empty() {
            info!("Security check passed - no warnings");
            return;
        }

        for warning in &warnings {
            match warning.severity {
                WarningSeverity::High => {
                    warn!("SECURITY: {}", warning.message);
                    warn!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Medium => {
                    warn!("{}", warning.message);
                    info!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Low => {
                    info!("Note: {}", warning.message);
                }
            }
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }

    pub fn is_localhost_only(&self) -> bool {
        self.server.bind_address.is_loopback()
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            listen: self.socket_addr(),
            request_timeout_secs: self.server.request_timeout_secs,
            require_signature: self.server.require_signature,
            fetch_timeout_ms: self.fetch.timeout_ms,
            max_body_bytes: self.fetch.max_body_bytes,
            max_redirects: self.fetch.max_redirects,
            block_private_networks: self.fetch.block_private_networks,
            proxy_path: self.rewrite.proxy_path.clone(),
            image_path: self.rewrite.image_path.clone(),
            removed_elements: self.rewrite.removed_elements.clone(),
            secret_configured: self.security.has_secret(),
            log_level: self.logging.level,
        }
    }
}

#[derive(Debug)]
pub struct RedactedConfig {
    pub listen: SocketAddr,
    pub request_timeout_secs: u64,
    pub require_signature: bool,
    pub fetch_timeout_ms: u64,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    pub block_private_networks: bool,
    pub proxy_path: String,
    pub image_path: String,
    pub removed_elements: Vec<String>,
    pub secret_configured: bool,
    pub log_level: LogLevel,
}

impl std::fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Shroud Configuration")?;
        writeln!(f, "====================")?;
        writeln!(f, "Listen: {}", self.listen)?;
        writeln!(f, "Request timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "Require signature: {}", self.require_signature)?;
        writeln!(f, "Fetch:")?;
        writeln!(f, "  timeout: {}ms", self.fetch_timeout_ms)?;
        writeln!(f, "  max body: {} bytes", self.max_body_bytes)?;
        writeln!(f, "  max redirects: {}", self.max_redirects)?;
        writeln!(
            f,
            "  private networks: {}",
            if self.block_private_networks { "BLOCKED" } else { "ALLOWED" }
        )?;
        writeln!(f, "Endpoints: {} {}", self.proxy_path, self.image_path)?;
        writeln!(f, "Removed elements: {}", self.removed_elements.join(", "))?;
        writeln!(
            f,
            "Signing secret: {}",
            if self.secret_configured { "<configured>" } else { "<ephemeral>" }
        )?;
        writeln!(f, "Log level: {}", self.log_level)?;
        Ok(())
    }
}
