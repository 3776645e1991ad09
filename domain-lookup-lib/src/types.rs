//! Core data types for domain registration lookups.
//!
//! This module defines the canonical record every lookup produces, the
//! lookup strategies, per-TLD server mappings and the engine configuration.

use crate::error::{ErrorKind, LookupError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Sentinel emitted for every field the lookup could not determine.
pub const UNKNOWN: &str = "unknown";

/// Default WHOIS TCP port.
pub const WHOIS_PORT: u16 = 43;

/// `User-Agent` sent with every RDAP request.
pub const DEFAULT_USER_AGENT: &str = concat!("domain-lookup/", env!("CARGO_PKG_VERSION"));

/// Normalize a raw field value: trimmed, with empty and sentinel values
/// collapsed to `None`.
pub fn clean_field(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Render an optional field, substituting the sentinel.
pub fn field_or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

mod unknown_sentinel {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(field_or_unknown(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(clean_field(&raw))
    }
}

/// Which path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceProtocol {
    #[serde(rename = "RDAP")]
    Rdap,
    #[serde(rename = "WHOIS")]
    Whois,
    /// Built-in table of popular domains, never live data
    #[serde(rename = "STATIC")]
    Static,
    #[serde(rename = "ERROR")]
    Error,
}

impl fmt::Display for SourceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceProtocol::Rdap => write!(f, "RDAP"),
            SourceProtocol::Whois => write!(f, "WHOIS"),
            SourceProtocol::Static => write!(f, "STATIC"),
            SourceProtocol::Error => write!(f, "ERROR"),
        }
    }
}

/// Ordered set of lowercase name server host names.
///
/// Keeps first-seen order and silently drops duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameServers(Vec<String>);

impl NameServers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a host name; returns `false` if it was empty or already present.
    pub fn insert(&mut self, host: &str) -> bool {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        if host.is_empty() || self.0.contains(&host) {
            return false;
        }
        self.0.push(host);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for NameServers {
    fn from(hosts: Vec<String>) -> Self {
        hosts.iter().map(String::as_str).collect()
    }
}

impl From<NameServers> for Vec<String> {
    fn from(ns: NameServers) -> Self {
        ns.0
    }
}

impl<'a> FromIterator<&'a str> for NameServers {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut ns = NameServers::new();
        for host in iter {
            ns.insert(host);
        }
        ns
    }
}

/// The unified, protocol-agnostic result of a lookup.
///
/// Absent fields are `None` in memory and serialize as `"unknown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Normalized domain name (lowercase, no scheme, `www.` or path)
    pub domain: String,

    /// Which path produced this record
    pub source_protocol: SourceProtocol,

    /// Host or base URL that answered
    pub source_server: String,

    #[serde(with = "unknown_sentinel")]
    pub registrar: Option<String>,

    #[serde(with = "unknown_sentinel")]
    pub registration_date: Option<String>,

    #[serde(with = "unknown_sentinel")]
    pub expiry_date: Option<String>,

    pub name_servers: NameServers,

    #[serde(with = "unknown_sentinel")]
    pub registrant: Option<String>,

    /// Comma-joined status codes
    #[serde(with = "unknown_sentinel")]
    pub status: Option<String>,

    /// Original response text or JSON
    pub raw_payload: String,

    /// Human-readable note on which servers were tried and why
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,

    /// Failure category, only set on error records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorKind>,
}

impl CanonicalRecord {
    /// Create an empty record for a protocol and answering server.
    pub fn new<D: Into<String>, S: Into<String>>(
        domain: D,
        protocol: SourceProtocol,
        server: S,
    ) -> Self {
        Self {
            domain: domain.into().to_lowercase(),
            source_protocol: protocol,
            source_server: server.into(),
            registrar: None,
            registration_date: None,
            expiry_date: None,
            name_servers: NameServers::new(),
            registrant: None,
            status: None,
            raw_payload: String::new(),
            diagnostic: None,
            failure: None,
        }
    }

    /// Create a terminal error record. No registration field is populated.
    pub fn error<D: Into<String>>(domain: D, error: &LookupError) -> Self {
        let mut record = Self::new(domain, SourceProtocol::Error, "");
        record.diagnostic = Some(error.to_string());
        record.failure = Some(error.kind());
        record
    }

    pub fn is_error(&self) -> bool {
        self.source_protocol == SourceProtocol::Error
    }

    /// Append a note to the diagnostic, keeping earlier notes.
    pub fn add_diagnostic<M: AsRef<str>>(&mut self, note: M) {
        let note = note.as_ref();
        if note.is_empty() {
            return;
        }
        self.diagnostic = Some(match self.diagnostic.take() {
            Some(existing) => format!("{}; {}", existing, note),
            None => note.to_string(),
        });
    }
}

/// Lookup strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupMode {
    /// RDAP in priority order, WHOIS when RDAP fails or says nothing
    #[default]
    #[serde(rename = "auto")]
    Auto,

    /// RDAP bases only, in priority order
    #[serde(rename = "rdap")]
    RdapOnly,

    /// Single WHOIS attempt against the TLD's server
    #[serde(rename = "whois")]
    WhoisOnly,

    /// All sources concurrently, first informative answer wins
    #[serde(rename = "race")]
    Race,
}

impl FromStr for LookupMode {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LookupMode::Auto),
            "rdap" => Ok(LookupMode::RdapOnly),
            "whois" => Ok(LookupMode::WhoisOnly),
            "race" => Ok(LookupMode::Race),
            other => Err(LookupError::config(format!(
                "Unknown lookup mode '{}'. Use auto, rdap, whois or race",
                other
            ))),
        }
    }
}

impl fmt::Display for LookupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMode::Auto => write!(f, "auto"),
            LookupMode::RdapOnly => write!(f, "rdap"),
            LookupMode::WhoisOnly => write!(f, "whois"),
            LookupMode::Race => write!(f, "race"),
        }
    }
}

/// A WHOIS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisServer {
    pub host: String,
    pub port: u16,
}

impl WhoisServer {
    /// Server on the standard port 43.
    pub fn new<H: Into<String>>(host: H) -> Self {
        Self {
            host: host.into(),
            port: WHOIS_PORT,
        }
    }

    /// Parse `host` or `host:port`.
    pub fn parse(spec: &str) -> Result<Self, LookupError> {
        let spec = spec.trim();
        let (host, port) = match spec.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                    LookupError::config(format!("Invalid WHOIS port in '{}'", spec))
                })?;
                (host, port)
            }
            None => (spec, WHOIS_PORT),
        };

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(LookupError::config(format!(
                "Invalid WHOIS host in '{}'",
                spec
            )));
        }

        Ok(Self {
            host: host.to_lowercase(),
            port,
        })
    }
}

impl fmt::Display for WhoisServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Per-TLD server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerMapping {
    /// RDAP base URLs in priority order (without the `/domain/` suffix)
    pub rdap_bases: Vec<String>,

    /// The TLD's WHOIS server, if it has one
    pub whois: Option<WhoisServer>,
}

/// Configuration options for the lookup engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Budget for each individual RDAP attempt
    /// Default: 10 seconds
    #[serde(skip)] // Don't serialize Duration directly
    pub rdap_timeout: Duration,

    /// Budget for the WHOIS attempt
    /// Default: 10 seconds
    #[serde(skip)]
    pub whois_timeout: Duration,

    /// How long a cached record stays valid
    /// Default: 5 minutes
    #[serde(skip)]
    pub cache_ttl: Duration,

    /// Mode used when the caller does not choose one
    pub default_mode: LookupMode,

    /// Consult the built-in popular-domain table before live queries
    /// Default: false
    pub use_static_table: bool,

    /// Append the generic `rdap.org` redirector to every TLD's RDAP list
    /// Default: true
    pub generic_rdap_fallback: bool,

    /// `User-Agent` header for RDAP requests
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            rdap_timeout: Duration::from_secs(10),
            whois_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(5 * 60),
            default_mode: LookupMode::Auto,
            use_static_table: false,
            generic_rdap_fallback: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl LookupConfig {
    /// Set the per-attempt RDAP budget.
    pub fn with_rdap_timeout(mut self, timeout: Duration) -> Self {
        self.rdap_timeout = timeout;
        self
    }

    /// Set the WHOIS budget.
    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    /// Set the cache lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_default_mode(mut self, mode: LookupMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Enable or disable the static popular-domain pre-check.
    pub fn with_static_table(mut self, enabled: bool) -> Self {
        self.use_static_table = enabled;
        self
    }

    /// Enable or disable the generic RDAP fallback endpoint.
    pub fn with_generic_rdap_fallback(mut self, enabled: bool) -> Self {
        self.generic_rdap_fallback = enabled;
        self
    }
}
