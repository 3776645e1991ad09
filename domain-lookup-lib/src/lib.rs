//! # Domain Lookup Library
//!
//! Resolve domain registration data over RDAP and WHOIS into one canonical
//! record.
//!
//! Each lookup normalizes the user's input, picks the servers responsible
//! for the domain's TLD, queries them according to a [`LookupMode`] and
//! returns the most informative answer as a [`CanonicalRecord`]. Lookups
//! never fail: network and parse failures come back as records whose
//! `sourceProtocol` is `ERROR`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_lookup_lib::{DomainLookup, LookupMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DomainLookup::new()?;
//!     let record = engine.lookup("example.com", LookupMode::Auto).await;
//!
//!     println!("{} registered by {:?}", record.domain, record.registrar);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP first**: JSON registration data with per-attempt timeouts
//! - **WHOIS fallback**: raw TCP port-43 queries with label-based parsing
//! - **Race mode**: every source at once, first informative answer wins
//! - **Result cache**: short-lived per-domain cache with lazy expiry
//! - **Configurable**: TOML files, `DL_*` environment variables, server overrides

// Re-export main public API types and functions
// This makes them available as domain_lookup_lib::TypeName
pub use cache::{ResultCache, DEFAULT_TTL};
pub use config::{
    load_env_config, parse_attempt_timeout, parse_timeout_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    ServerOverride,
};
pub use error::{ErrorKind, LookupError};
pub use lookup::{DomainLookup, DomainLookupBuilder, EMPTY_INPUT};
pub use popular::{popular_domains, static_record};
pub use protocols::{
    indicates_rate_limited, indicates_unregistered, normalize_rdap, normalize_whois, RdapClient,
    RdapQuery, ServerRegistry, WhoisClient, WhoisQuery, GENERIC_RDAP_BASE,
};
pub use score::{best_index, is_informative, pick_best, score, MAX_SCORE};
pub use types::{
    CanonicalRecord, LookupConfig, LookupMode, NameServers, ServerMapping, SourceProtocol,
    WhoisServer, UNKNOWN,
};
pub use utils::{extract_tld, normalize_domain_input, validate_domain};

// Internal modules - these are not part of the public API
mod cache;
mod concurrent;
mod config;
mod error;
mod lookup;
mod popular;
mod protocols;
mod score;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LookupError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
