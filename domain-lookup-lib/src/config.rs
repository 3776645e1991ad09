//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DL_*`
//! environment variables, merging them with proper precedence rules, and
//! applying the result to a [`LookupConfig`] and [`ServerRegistry`].

use crate::error::LookupError;
use crate::protocols::ServerRegistry;
use crate::types::{LookupConfig, LookupMode, WhoisServer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest accepted per-attempt timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// mode = "auto"
/// rdap_timeout = "10s"
/// whois_timeout = "8s"
/// cache_ttl = "5m"
/// static_table = false
/// generic_rdap_fallback = true
///
/// [servers.io]
/// rdap = ["https://rdap.identitydigital.services/rdap"]
/// whois = "whois.nic.io:43"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Engine defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Per-TLD server overrides, keyed by TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, ServerOverride>>,
}

/// Default values for the lookup engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Lookup mode: auto, rdap, whois or race
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Per-attempt RDAP budget (e.g. "10s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_timeout: Option<String>,

    /// WHOIS budget (e.g. "10s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_timeout: Option<String>,

    /// Result cache lifetime (e.g. "5m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<String>,

    /// Answer popular domains from the built-in table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_table: Option<bool>,

    /// Append the generic RDAP redirector to every TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_rdap_fallback: Option<bool>,
}

/// Server override for one TLD.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerOverride {
    /// RDAP base URLs in priority order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap: Option<Vec<String>>,

    /// WHOIS server as `host` or `host:port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, LookupError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LookupError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then `~/.domain-lookup.toml`, then `./domain-lookup.toml`;
    /// later files override earlier ones field by field. Files that fail to
    /// load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, LookupError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping configuration file"),
            }
        }

        if self.verbose && !loaded_files.is_empty() {
            for path in &loaded_files {
                info!(path = %path.display(), "using configuration file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./domain-lookup.toml", "./.domain-lookup.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-lookup.toml", "domain-lookup.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-lookup").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    mode: higher_defaults.mode.or(lower_defaults.mode),
                    rdap_timeout: higher_defaults.rdap_timeout.or(lower_defaults.rdap_timeout),
                    whois_timeout: higher_defaults.whois_timeout.or(lower_defaults.whois_timeout),
                    cache_ttl: higher_defaults.cache_ttl.or(lower_defaults.cache_ttl),
                    static_table: higher_defaults.static_table.or(lower_defaults.static_table),
                    generic_rdap_fallback: higher_defaults
                        .generic_rdap_fallback
                        .or(lower_defaults.generic_rdap_fallback),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: match (lower.servers, higher.servers) {
                (Some(mut lower_servers), Some(higher_servers)) => {
                    for (tld, higher_override) in higher_servers {
                        let entry = lower_servers.entry(tld).or_default();
                        if higher_override.rdap.is_some() {
                            entry.rdap = higher_override.rdap;
                        }
                        if higher_override.whois.is_some() {
                            entry.whois = higher_override.whois;
                        }
                    }
                    Some(lower_servers)
                }
                (lower_servers, higher_servers) => higher_servers.or(lower_servers),
            },
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), LookupError> {
        if let Some(defaults) = &config.defaults {
            if let Some(mode) = &defaults.mode {
                mode.parse::<LookupMode>()?;
            }
            if let Some(timeout) = &defaults.rdap_timeout {
                parse_attempt_timeout("rdap_timeout", timeout)?;
            }
            if let Some(timeout) = &defaults.whois_timeout {
                parse_attempt_timeout("whois_timeout", timeout)?;
            }
            if let Some(ttl) = &defaults.cache_ttl {
                parse_duration_setting("cache_ttl", ttl)?;
            }
        }

        if let Some(servers) = &config.servers {
            for (tld, server) in servers {
                validate_server_override(tld, server)?;
            }
        }

        Ok(())
    }
}

fn validate_server_override(tld: &str, server: &ServerOverride) -> Result<(), LookupError> {
    if tld.is_empty() || !tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(LookupError::config(format!(
            "Invalid TLD '{}' in [servers]",
            tld
        )));
    }

    if server.rdap.is_none() && server.whois.is_none() {
        return Err(LookupError::config(format!(
            "[servers.{}] must set 'rdap' or 'whois'",
            tld
        )));
    }

    if let Some(bases) = &server.rdap {
        if bases.is_empty() {
            return Err(LookupError::config(format!(
                "[servers.{}] has an empty 'rdap' list",
                tld
            )));
        }
        for base in bases {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(LookupError::config(format!(
                    "RDAP base '{}' for .{} must be an http(s) URL",
                    base, tld
                )));
            }
        }
    }

    if let Some(whois) = &server.whois {
        WhoisServer::parse(whois)?;
    }

    Ok(())
}

impl FileConfig {
    /// Apply `[defaults]` on top of `config`.
    pub fn apply_to(&self, config: &mut LookupConfig) -> Result<(), LookupError> {
        let Some(defaults) = &self.defaults else {
            return Ok(());
        };

        if let Some(mode) = &defaults.mode {
            config.default_mode = mode.parse()?;
        }
        if let Some(timeout) = &defaults.rdap_timeout {
            config.rdap_timeout = parse_attempt_timeout("rdap_timeout", timeout)?;
        }
        if let Some(timeout) = &defaults.whois_timeout {
            config.whois_timeout = parse_attempt_timeout("whois_timeout", timeout)?;
        }
        if let Some(ttl) = &defaults.cache_ttl {
            config.cache_ttl = parse_duration_setting("cache_ttl", ttl)?;
        }
        if let Some(enabled) = defaults.static_table {
            config.use_static_table = enabled;
        }
        if let Some(enabled) = defaults.generic_rdap_fallback {
            config.generic_rdap_fallback = enabled;
        }
        Ok(())
    }

    /// Built-in server table with `[servers]` overrides applied.
    pub fn build_registry(&self) -> Result<ServerRegistry, LookupError> {
        let mut registry = ServerRegistry::builtin();
        if let Some(servers) = &self.servers {
            for (tld, server) in servers {
                validate_server_override(tld, server)?;
                let whois = server.whois.as_deref().map(WhoisServer::parse).transpose()?;
                registry.apply_override(tld, server.rdap.clone(), whois);
            }
        }
        Ok(registry)
    }
}

/// Configuration values read from `DL_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub mode: Option<LookupMode>,
    pub rdap_timeout: Option<Duration>,
    pub whois_timeout: Option<Duration>,
    pub cache_ttl: Option<Duration>,
    pub static_table: Option<bool>,
    pub config: Option<String>,
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    EnvConfig::from_lookup(verbose, |name| env::var(name).ok())
}

impl EnvConfig {
    /// Read variables through `lookup`, which returns a variable's value
    /// if set.
    pub fn from_lookup<F>(verbose: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        let report = |name: &str, value: &str| {
            if verbose {
                info!("Using {}={}", name, value);
            }
        };

        // DL_MODE - lookup strategy
        if let Some(val) = lookup("DL_MODE") {
            match val.parse::<LookupMode>() {
                Ok(mode) => {
                    env_config.mode = Some(mode);
                    report("DL_MODE", &val);
                }
                Err(_) => warn!("Invalid DL_MODE='{}', use auto, rdap, whois or race", val),
            }
        }

        // DL_RDAP_TIMEOUT / DL_WHOIS_TIMEOUT - per-attempt budgets
        for (name, slot) in [
            ("DL_RDAP_TIMEOUT", &mut env_config.rdap_timeout),
            ("DL_WHOIS_TIMEOUT", &mut env_config.whois_timeout),
        ] {
            if let Some(val) = lookup(name) {
                match parse_attempt_timeout(name, &val) {
                    Ok(timeout) => {
                        *slot = Some(timeout);
                        report(name, &val);
                    }
                    Err(e) => warn!("Ignoring {}: {}", name, e),
                }
            }
        }

        // DL_CACHE_TTL - result cache lifetime
        if let Some(val) = lookup("DL_CACHE_TTL") {
            match parse_duration_setting("DL_CACHE_TTL", &val) {
                Ok(ttl) => {
                    env_config.cache_ttl = Some(ttl);
                    report("DL_CACHE_TTL", &val);
                }
                Err(e) => warn!("Ignoring DL_CACHE_TTL: {}", e),
            }
        }

        // DL_STATIC_TABLE - popular-domain table
        if let Some(val) = lookup("DL_STATIC_TABLE") {
            match parse_bool(&val) {
                Some(enabled) => {
                    env_config.static_table = Some(enabled);
                    report("DL_STATIC_TABLE", &val);
                }
                None => warn!("Invalid DL_STATIC_TABLE='{}', use true/false", val),
            }
        }

        // DL_CONFIG - explicit config file
        if let Some(path) = lookup("DL_CONFIG") {
            if !path.trim().is_empty() {
                report("DL_CONFIG", &path);
                env_config.config = Some(path);
            }
        }

        env_config
    }

    /// Apply the variables that were set on top of `config`.
    pub fn apply_to(&self, config: &mut LookupConfig) {
        if let Some(mode) = self.mode {
            config.default_mode = mode;
        }
        if let Some(timeout) = self.rdap_timeout {
            config.rdap_timeout = timeout;
        }
        if let Some(timeout) = self.whois_timeout {
            config.whois_timeout = timeout;
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache_ttl = ttl;
        }
        if let Some(enabled) = self.static_table {
            config.use_static_table = enabled;
        }
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds. Returns `None` if parsing fails.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }
}

fn parse_duration_setting(name: &str, value: &str) -> Result<Duration, LookupError> {
    parse_timeout_string(value)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            LookupError::config(format!(
                "Invalid {} '{}'. Use format like '5s', '30s', '2m'",
                name, value
            ))
        })
}

/// A per-attempt timeout: a valid duration in `1..=120` seconds.
pub fn parse_attempt_timeout(name: &str, value: &str) -> Result<Duration, LookupError> {
    let timeout = parse_duration_setting(name, value)?;
    if timeout.is_zero() || timeout.as_secs() > MAX_TIMEOUT_SECS {
        return Err(LookupError::config(format!(
            "{} must be between 1s and {}s, got '{}'",
            name, MAX_TIMEOUT_SECS, value
        )));
    }
    Ok(timeout)
}
